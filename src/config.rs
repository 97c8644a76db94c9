use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::DEFAULT_CATALOG_LIMIT;
use crate::orchestrator::SuggestConfig;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Ollama,
    Fake,
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "meal-suggest")]
#[command(about = "Meal suggestion gateway with generation timeout, cache and catalog fallback")]
pub struct Args {
    /// Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Which generator backend to use
    #[arg(long, value_enum, default_value_t = GeneratorKind::Ollama)]
    pub generator: GeneratorKind,

    /// Ollama server url
    #[arg(short, long, default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Model passed to the generator
    #[arg(short, long, default_value = "llama3.1")]
    pub model: String,

    /// JSON file holding the fallback meal catalog
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Cache TTL in seconds
    #[arg(short, long, default_value_t = 24 * 60 * 60)]
    pub cache_ttl: u64,

    /// Milliseconds the fake generator waits before answering
    #[arg(long, default_value_t = 0)]
    pub fake_delay: u64,

    /// Seconds to wait for the generator before falling back
    #[arg(long, default_value_t = 8)]
    pub generation_timeout: u64,

    /// Cache validated AI meals, including ones that arrive after the timeout
    #[arg(long)]
    pub cache_ai_results: bool,

    /// Max catalog rows considered per fallback lookup
    #[arg(long, default_value_t = DEFAULT_CATALOG_LIMIT)]
    pub catalog_limit: usize,
}

impl Args {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn fake_delay(&self) -> Duration {
        Duration::from_millis(self.fake_delay)
    }

    pub fn suggest_config(&self) -> SuggestConfig {
        SuggestConfig {
            generation_timeout: Duration::from_secs(self.generation_timeout),
            cache_ai_results: self.cache_ai_results,
            catalog_limit: self.catalog_limit.max(1),
        }
    }
}
