//! Suggestion pipeline: cache, generation race, catalog fallback, placeholder.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{MealCache, fingerprint};
use crate::catalog::{self, DEFAULT_CATALOG_LIMIT, MealCatalog, placeholder_meal};
use crate::generator::{GenerationError, MealGenerator, build_prompt};
use crate::metrics::{
    CACHE_HITS, CACHE_MISSES, FALLBACKS_SERVED, GENERATION_FAILURES, GENERATION_TIMEOUTS,
    PLACEHOLDERS_SERVED,
};
use crate::models::{CandidateMeal, PreferenceSet, SuggestResponse, badges_for};
use crate::race::{Deadline, with_deadline};
use crate::scaler::scale_meal;
use crate::validator::parse_candidate;

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct SuggestConfig {
    pub generation_timeout: Duration,
    /// Write validated model output to the cache, both from the race and from
    /// attempts that finish after the timeout.
    pub cache_ai_results: bool,
    pub catalog_limit: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            cache_ai_results: false,
            catalog_limit: DEFAULT_CATALOG_LIMIT,
        }
    }
}

// Why the model's answer was not used
enum Miss {
    TimedOut,
    Failed(String),
}

impl Miss {
    fn reason(&self) -> String {
        match self {
            Miss::TimedOut => "meal generation timed out".to_string(),
            Miss::Failed(why) => why.clone(),
        }
    }

    fn timed_out(&self) -> bool {
        matches!(self, Miss::TimedOut)
    }
}

/// Turns preferences into exactly one meal suggestion.
///
/// Cloning is cheap; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct Orchestrator {
    cache: Arc<MealCache>,
    generator: Arc<dyn MealGenerator>,
    catalog: Option<Arc<dyn MealCatalog>>,
    config: SuggestConfig,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<MealCache>,
        generator: Arc<dyn MealGenerator>,
        catalog: Option<Arc<dyn MealCatalog>>,
        config: SuggestConfig,
    ) -> Self {
        Self {
            cache,
            generator,
            catalog,
            config,
        }
    }

    pub fn cache(&self) -> &MealCache {
        &self.cache
    }

    /// Produce a suggestion. Every failure degrades to a lower-fidelity
    /// answer; nothing here returns an error.
    pub async fn suggest(&self, prefs: &PreferenceSet, locale: Option<&str>) -> SuggestResponse {
        let swept = self.cache.sweep();
        if swept > 0 {
            tracing::debug!(swept, "Expired cache entries removed");
        }

        let key = fingerprint(prefs);
        if let Some(entry) = self.cache.get(&key) {
            CACHE_HITS.inc();
            tracing::info!(fingerprint = &key[..12], meal = %entry.meal.id, "Cache HIT");
            return SuggestResponse::cached(entry.meal, entry.badges);
        }
        CACHE_MISSES.inc();

        let prompt = build_prompt(prefs, locale);
        let generator = Arc::clone(&self.generator);
        let attempt = with_deadline(
            async move { generator.generate(&prompt).await },
            self.config.generation_timeout,
        )
        .await;

        let miss = match attempt {
            Deadline::Finished(Ok(Ok(raw))) => match parse_candidate(&raw, prefs) {
                Ok(meal) => {
                    let (meal, badges) = prepare(meal, prefs);
                    tracing::info!(
                        fingerprint = &key[..12],
                        meal = %meal.id,
                        model = self.generator.model_name(),
                        "Serving generated meal"
                    );
                    if self.config.cache_ai_results {
                        self.cache.put(&key, meal.clone(), badges.clone());
                    }
                    return SuggestResponse::generated(meal, badges);
                }
                Err(e) => generation_failed(e),
            },
            Deadline::Finished(Ok(Err(e))) => generation_failed(e),
            Deadline::Finished(Err(e)) => {
                GENERATION_FAILURES.inc();
                tracing::error!(error = %e, "Generation task crashed");
                Miss::Failed("meal generation failed".to_string())
            }
            Deadline::Expired(straggler) => {
                GENERATION_TIMEOUTS.inc();
                tracing::warn!(
                    timeout = ?self.config.generation_timeout,
                    "Generation timed out, continuing in background"
                );
                let this = self.clone();
                let prefs = prefs.clone();
                tokio::spawn(async move {
                    if let Some(result) = straggler.join().await {
                        this.on_background_generation_complete(&key, &prefs, result);
                    }
                });
                Miss::TimedOut
            }
        };

        self.fall_back(prefs, miss).await
    }

    /// Handle a generation attempt that finished after its request was
    /// answered. Returns whether the meal was written to the cache.
    pub fn on_background_generation_complete(
        &self,
        key: &str,
        prefs: &PreferenceSet,
        result: Result<String, GenerationError>,
    ) -> bool {
        let meal = match result.and_then(|raw| parse_candidate(&raw, prefs)) {
            Ok(meal) => meal,
            Err(e) => {
                tracing::info!(error = %e, "Background generation produced nothing usable");
                return false;
            }
        };

        if !self.config.cache_ai_results {
            tracing::debug!(meal = %meal.id, "Background meal discarded, AI result caching is off");
            return false;
        }

        let (meal, badges) = prepare(meal, prefs);
        tracing::info!(meal = %meal.id, "Background meal cached");
        self.cache.put(key, meal, badges);
        true
    }

    async fn fall_back(&self, prefs: &PreferenceSet, miss: Miss) -> SuggestResponse {
        let Some(catalog) = &self.catalog else {
            tracing::error!("No meal catalog configured, cannot fall back");
            return SuggestResponse::no_match(format!(
                "{}; meal catalog is not configured",
                miss.reason()
            ));
        };

        match catalog::lookup(catalog.as_ref(), prefs, self.config.catalog_limit).await {
            Ok(Some(pick)) => {
                FALLBACKS_SERVED.inc();
                tracing::info!(meal = %pick.meal.id, "Serving catalog meal");
                let badges = badges_for(&pick.meal);
                return SuggestResponse::fallback(pick.meal, badges, miss.timed_out())
                    .with_alternatives(pick.alternatives)
                    .with_reason(miss.reason());
            }
            Ok(None) => tracing::warn!("Catalog has no matching meal"),
            Err(e) => tracing::error!(error = %e, "Catalog lookup failed"),
        }

        PLACEHOLDERS_SERVED.inc();
        let (meal, badges) = prepare(placeholder_meal(), prefs);
        SuggestResponse::fallback(meal, badges, miss.timed_out())
            .with_reason(format!("{}; no catalog meal matched", miss.reason()))
    }
}

fn generation_failed(e: GenerationError) -> Miss {
    GENERATION_FAILURES.inc();
    tracing::warn!(error = %e, "Generated meal unusable");
    let reason = match e {
        GenerationError::Rejected(_) => "generated meal did not match the preferences",
        GenerationError::InvalidJson(_) | GenerationError::Schema(_) => {
            "generated meal could not be read"
        }
        GenerationError::RequestFailed(_) | GenerationError::Backend { .. } => {
            "meal generation failed"
        }
    };
    Miss::Failed(reason.to_string())
}

fn prepare(meal: CandidateMeal, prefs: &PreferenceSet) -> (CandidateMeal, Vec<String>) {
    let meal = scale_meal(meal, prefs.serving_size);
    let badges = badges_for(&meal);
    (meal, badges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::catalog::InMemoryCatalog;
    use crate::generator::FakeGenerator;
    use crate::models::SuggestStatus;

    const VALID_MEAL: &str = r#"{
        "id": "gen-1",
        "title": "Quick Pad Thai",
        "description": "Rice noodles with tofu",
        "prepTime": 20,
        "difficulty": "medium",
        "cuisine": "Thai",
        "dietTags": ["vegetarian"],
        "ingredients": [{"name": "rice noodles", "amount": "1/2", "unit": "lb"}],
        "instructions": ["Soak noodles", "Stir fry"],
        "nutritionInfo": {"calories": 600}
    }"#;

    fn orchestrator(generator: FakeGenerator, cache_ai_results: bool) -> Orchestrator {
        let cache = Arc::new(MealCache::new(
            Duration::from_secs(60),
            Arc::new(ManualClock::new()),
        ));
        Orchestrator::new(
            cache,
            Arc::new(generator),
            Some(Arc::new(InMemoryCatalog::default())),
            SuggestConfig {
                cache_ai_results,
                ..SuggestConfig::default()
            },
        )
    }

    #[test]
    fn test_background_completion_respects_policy() {
        let prefs = PreferenceSet::new(30, 4);
        let key = fingerprint(&prefs);

        let off = orchestrator(FakeGenerator::default(), false);
        assert!(!off.on_background_generation_complete(&key, &prefs, Ok(VALID_MEAL.to_string())));
        assert!(off.cache().get(&key).is_none());

        let on = orchestrator(FakeGenerator::default(), true);
        assert!(on.on_background_generation_complete(&key, &prefs, Ok(VALID_MEAL.to_string())));
        let entry = on.cache().get(&key).unwrap();
        assert_eq!(entry.meal.id, "gen-1");
        assert_eq!(entry.meal.ingredients[0].amount, "1");
        assert_eq!(entry.badges, vec!["20 min", "Medium", "Thai"]);
    }

    #[test]
    fn test_background_completion_ignores_bad_results() {
        let prefs = PreferenceSet::new(10, 2);
        let key = fingerprint(&prefs);
        let orch = orchestrator(FakeGenerator::default(), true);

        assert!(!orch.on_background_generation_complete(
            &key,
            &prefs,
            Err(GenerationError::RequestFailed("boom".into()))
        ));
        // 20 minutes is over the 10 minute limit
        assert!(!orch.on_background_generation_complete(&key, &prefs, Ok(VALID_MEAL.to_string())));
        assert!(orch.cache().is_empty());
    }

    #[tokio::test]
    async fn test_empty_catalog_serves_placeholder() {
        let orch = orchestrator(FakeGenerator::failing("down"), false);
        let response = orch.suggest(&PreferenceSet::new(30, 2), None).await;

        assert_eq!(response.status, SuggestStatus::Ok);
        assert_eq!(response.meal.unwrap().id, placeholder_meal().id);
        assert_eq!(response.fallback_used, Some(true));
        assert_eq!(response.ai_generated, Some(false));
        assert_eq!(response.background_generated, Some(false));
        assert!(response.reason.unwrap().contains("meal generation failed"));
    }

    #[tokio::test]
    async fn test_missing_catalog_is_no_match() {
        let orch = Orchestrator::new(
            Arc::new(MealCache::with_system_clock(Duration::from_secs(60))),
            Arc::new(FakeGenerator::with_response("not json")),
            None,
            SuggestConfig::default(),
        );
        let response = orch.suggest(&PreferenceSet::new(30, 2), None).await;
        assert_eq!(response.status, SuggestStatus::NoMatch);
        assert!(response.meal.is_none());
        assert!(response.reason.unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_cache_hit_short_circuits_generation() {
        let orch = orchestrator(FakeGenerator::failing("should not be called"), false);
        let prefs = PreferenceSet::new(30, 2);
        orch.cache()
            .put(&fingerprint(&prefs), placeholder_meal(), vec!["cached".into()]);

        let response = orch.suggest(&prefs, None).await;
        assert_eq!(response.cached_result, Some(true));
        assert_eq!(response.ai_generated, Some(true));
        assert_eq!(response.fallback_used, Some(false));
        assert_eq!(response.badges, Some(vec!["cached".to_string()]));
    }
}
