//! Fallback meal catalog.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::models::{CandidateMeal, Difficulty, Ingredient, NutritionInfo, PreferenceSet};
use crate::scaler::scale_meal;

/// Rows fetched per fallback query. Larger values add variety at the cost of
/// a wider scan.
pub const DEFAULT_CATALOG_LIMIT: usize = 25;

const MAX_ALTERNATIVES: usize = 3;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog query failed: {0}")]
    Query(String),
}

/// Filter set a catalog query must honor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub max_prep_time: u32,
    pub cuisines: BTreeSet<String>,
    pub difficulty: Option<Difficulty>,
    pub diet_tags: BTreeSet<String>,
    pub exclude_ids: BTreeSet<String>,
    pub excluded_ingredients: BTreeSet<String>,
    pub limit: usize,
}

impl CatalogQuery {
    pub fn from_preferences(prefs: &PreferenceSet, limit: usize) -> Self {
        Self {
            max_prep_time: prefs.max_cooking_time,
            cuisines: prefs.cuisine_preferences.clone(),
            difficulty: prefs.difficulty,
            diet_tags: prefs.dietary_restrictions.clone(),
            exclude_ids: prefs.recent_meal_ids.iter().cloned().collect(),
            excluded_ingredients: prefs.excluded_ingredients.clone(),
            limit,
        }
    }

    pub fn matches(&self, meal: &CandidateMeal) -> bool {
        if meal.prep_time > self.max_prep_time || self.exclude_ids.contains(&meal.id) {
            return false;
        }
        if !self.cuisines.is_empty() && !self.cuisines.contains(&meal.cuisine.trim().to_lowercase()) {
            return false;
        }
        if self.difficulty.is_some_and(|d| d != meal.difficulty) {
            return false;
        }
        if !self.diet_tags.is_empty()
            && !meal
                .diet_tags
                .iter()
                .any(|tag| self.diet_tags.contains(&tag.trim().to_lowercase()))
        {
            return false;
        }
        !meal.ingredients.iter().any(|ingredient| {
            let name = ingredient.name.to_lowercase();
            self.excluded_ingredients
                .iter()
                .any(|excluded| name.contains(excluded.as_str()))
        })
    }
}

/// Filtered read access to the stored meal catalog.
#[async_trait]
pub trait MealCatalog: Send + Sync {
    /// Return at most `query.limit` meals matching every filter.
    async fn find(&self, query: &CatalogQuery) -> Result<Vec<CandidateMeal>, CatalogError>;
}

/// Catalog held in memory, optionally loaded from a JSON array on disk.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    meals: Vec<CandidateMeal>,
}

impl InMemoryCatalog {
    pub fn new(meals: Vec<CandidateMeal>) -> Self {
        Self { meals }
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path)?;
        let meals: Vec<CandidateMeal> = serde_json::from_str(&data)?;
        tracing::info!(path = %path.display(), meals = meals.len(), "Catalog loaded");
        Ok(Self::new(meals))
    }

    pub fn len(&self) -> usize {
        self.meals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }
}

#[async_trait]
impl MealCatalog for InMemoryCatalog {
    async fn find(&self, query: &CatalogQuery) -> Result<Vec<CandidateMeal>, CatalogError> {
        Ok(self
            .meals
            .iter()
            .filter(|meal| query.matches(meal))
            .take(query.limit)
            .cloned()
            .collect())
    }
}

/// A meal chosen from the catalog plus a few other titles that also matched.
#[derive(Debug, Clone)]
pub struct CatalogPick {
    pub meal: CandidateMeal,
    pub alternatives: Vec<String>,
}

/// Query the catalog and pick one matching meal at random, scaled for the
/// requested serving size.
pub async fn lookup(
    catalog: &dyn MealCatalog,
    prefs: &PreferenceSet,
    limit: usize,
) -> Result<Option<CatalogPick>, CatalogError> {
    let query = CatalogQuery::from_preferences(prefs, limit);
    let mut rows = catalog.find(&query).await?;
    // Enforce the contract even if a backend ignores part of the filter
    rows.retain(|meal| query.matches(meal));
    rows.truncate(limit);

    rows.shuffle(&mut rand::thread_rng());
    let mut rows = rows.into_iter();
    let Some(meal) = rows.next() else {
        return Ok(None);
    };

    Ok(Some(CatalogPick {
        meal: scale_meal(meal, prefs.serving_size),
        alternatives: rows.take(MAX_ALTERNATIVES).map(|m| m.title).collect(),
    }))
}

/// Meal served when neither the model nor the catalog produced anything.
pub fn placeholder_meal() -> CandidateMeal {
    let ingredient = |name: &str, amount: &str, unit: &str| Ingredient {
        name: name.to_string(),
        amount: amount.to_string(),
        unit: unit.to_string(),
    };

    CandidateMeal {
        id: "placeholder-vegetable-rice-bowl".to_string(),
        title: "Simple Vegetable Rice Bowl".to_string(),
        description: "Steamed rice topped with sautéed seasonal vegetables and a squeeze of lime."
            .to_string(),
        prep_time: 20,
        difficulty: Difficulty::Easy,
        cuisine: "International".to_string(),
        diet_tags: vec![
            "vegan".to_string(),
            "vegetarian".to_string(),
            "gluten-free".to_string(),
            "dairy-free".to_string(),
        ],
        ingredients: vec![
            ingredient("rice", "1", "cup"),
            ingredient("mixed vegetables", "2", "cups"),
            ingredient("vegetable oil", "1", "tbsp"),
            ingredient("lime", "1/2", ""),
            ingredient("salt", "to taste", ""),
        ],
        instructions: vec![
            "Cook the rice according to the package directions.".to_string(),
            "Sauté the vegetables in oil over medium-high heat until tender.".to_string(),
            "Season with salt, spoon over the rice and finish with lime juice.".to_string(),
        ],
        nutrition_info: Some(NutritionInfo {
            calories: 420,
            protein: 9,
            carbs: 78,
            fat: 8,
        }),
        image_url: None,
    }
}
