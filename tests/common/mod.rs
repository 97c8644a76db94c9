#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use meal_suggest::cache::{ManualClock, MealCache};
use meal_suggest::catalog::{InMemoryCatalog, MealCatalog};
use meal_suggest::generator::{GenerationError, MealGenerator};
use meal_suggest::models::{CandidateMeal, Difficulty, Ingredient};
use meal_suggest::orchestrator::{Orchestrator, SuggestConfig};

/// Generator that counts calls and returns a fixed completion after a delay.
pub struct ScriptedGenerator {
    pub calls: AtomicUsize,
    completion: String,
    delay: Duration,
}

impl ScriptedGenerator {
    pub fn new(completion: impl Into<String>, delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            completion: completion.into(),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MealGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.completion.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn generated_meal_json(cuisine: &str, prep_time: u32) -> String {
    serde_json::json!({
        "id": format!("gen-{}-{}", cuisine.to_lowercase(), prep_time),
        "title": format!("{} special", cuisine),
        "description": "Model output",
        "prepTime": prep_time,
        "difficulty": "easy",
        "cuisine": cuisine,
        "dietTags": ["vegetarian"],
        "ingredients": [
            {"name": "pasta", "amount": "1 cup", "unit": ""},
            {"name": "parmesan", "amount": "1/4", "unit": "cup"}
        ],
        "instructions": ["Cook", "Serve"],
        "nutritionInfo": {"calories": 500, "protein": 20, "carbs": 60, "fat": 15}
    })
    .to_string()
}

pub fn catalog_meal(id: &str, cuisine: &str, prep_time: u32) -> CandidateMeal {
    CandidateMeal {
        id: id.to_string(),
        title: format!("Catalog {}", id),
        description: "From the catalog".to_string(),
        prep_time,
        difficulty: Difficulty::Easy,
        cuisine: cuisine.to_string(),
        diet_tags: vec!["vegetarian".to_string()],
        ingredients: vec![
            Ingredient {
                name: "penne".to_string(),
                amount: "1 cup".to_string(),
                unit: String::new(),
            },
            Ingredient {
                name: "tomato sauce".to_string(),
                amount: "1/2".to_string(),
                unit: "cup".to_string(),
            },
            Ingredient {
                name: "basil".to_string(),
                amount: "to taste".to_string(),
                unit: String::new(),
            },
        ],
        instructions: vec!["Boil".to_string(), "Sauce".to_string()],
        nutrition_info: None,
        image_url: None,
    }
}

pub fn italian_catalog() -> Arc<dyn MealCatalog> {
    Arc::new(InMemoryCatalog::new(vec![
        catalog_meal("quick-penne", "Italian", 15),
        catalog_meal("slow-ragu", "Italian", 90),
        catalog_meal("quick-tacos", "Mexican", 15),
    ]))
}

pub fn build(
    generator: Arc<dyn MealGenerator>,
    catalog: Option<Arc<dyn MealCatalog>>,
    cache_ai_results: bool,
) -> Orchestrator {
    let cache = Arc::new(MealCache::new(
        Duration::from_secs(24 * 60 * 60),
        Arc::new(ManualClock::new()),
    ));
    Orchestrator::new(
        cache,
        generator,
        catalog,
        SuggestConfig {
            cache_ai_results,
            ..SuggestConfig::default()
        },
    )
}
