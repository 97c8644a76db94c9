use anyhow::Context;
use clap::Parser; // for cli
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use meal_suggest::cache::MealCache;
use meal_suggest::catalog::{InMemoryCatalog, MealCatalog};
use meal_suggest::config::{Args, GeneratorKind};
use meal_suggest::generator::{FakeGenerator, MealGenerator, OllamaGenerator};
use meal_suggest::handlers::router;
use meal_suggest::orchestrator::Orchestrator;
use meal_suggest::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // parse cli arguments
    let args = Args::parse();

    let generator: Arc<dyn MealGenerator> = match args.generator {
        GeneratorKind::Ollama => {
            let ollama = OllamaGenerator::new(reqwest::Client::new(), &args.ollama_url, &args.model);
            tracing::info!(url = %ollama.base_url(), model = %args.model, "Using Ollama generator");
            Arc::new(ollama)
        }
        GeneratorKind::Fake => {
            tracing::info!(delay = ?args.fake_delay(), "Using fake generator");
            Arc::new(FakeGenerator::default().with_delay(args.fake_delay()))
        }
    };

    let catalog: Option<Arc<dyn MealCatalog>> = match &args.catalog {
        Some(path) => {
            let catalog = InMemoryCatalog::from_path(path)
                .with_context(|| format!("loading catalog from {}", path.display()))?;
            if catalog.is_empty() {
                tracing::warn!(path = %path.display(), "Catalog is empty, fallbacks will use the placeholder meal");
            }
            Some(Arc::new(catalog))
        }
        None => {
            tracing::warn!("No --catalog given, fallback requests will return no_match");
            None
        }
    };

    let cache = Arc::new(MealCache::with_system_clock(args.cache_ttl()));
    let config = args.suggest_config();
    let orchestrator = Orchestrator::new(cache, generator, catalog, config.clone());
    let state = Arc::new(AppState::new(orchestrator));

    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!("Gateway running on http://localhost:{}", args.port);
    tracing::info!(
        ttl_secs = args.cache_ttl,
        timeout = ?config.generation_timeout,
        cache_ai_results = config.cache_ai_results,
        catalog_limit = config.catalog_limit,
        "Suggestion settings"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
