use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

// Difficulty tier shared by requests, generated meals and the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    // Capitalized form used for badges
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Meal-period hint sent by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum MealPeriod {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealPeriod::Breakfast => "breakfast",
            MealPeriod::Lunch => "lunch",
            MealPeriod::Dinner => "dinner",
        }
    }
}

impl TryFrom<String> for MealPeriod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealPeriod::Breakfast),
            "lunch" => Ok(MealPeriod::Lunch),
            "dinner" => Ok(MealPeriod::Dinner),
            other => Err(format!("unknown time of day '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: String,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionInfo {
    #[serde(default)]
    pub calories: u32,
    #[serde(default)]
    pub protein: u32,
    #[serde(default)]
    pub carbs: u32,
    #[serde(default)]
    pub fat: u32,
}

/// A recipe as returned to the caller.
///
/// Stored and generated meals assume a baseline of two servings; amounts are
/// rescaled with [`crate::scaler::scale_meal`] before they leave the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMeal {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub description: String,
    pub prep_time: u32,
    pub difficulty: Difficulty,
    pub cuisine: String,
    #[serde(default)]
    pub diet_tags: Vec<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_info: Option<NutritionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

// Inbound request body for POST /api/suggest
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub time_of_day: Option<MealPeriod>,
    pub preferences: PreferencePayload,
    #[serde(default)]
    pub recent_meal_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencePayload {
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub cuisine_preferences: Vec<String>,
    pub max_cooking_time: u32,
    #[serde(default)]
    pub difficulty_preference: Option<String>,
    #[serde(default)]
    pub excluded_ingredients: Option<Vec<String>>,
    pub serving_size: u32,
}

/// Constraints for a single suggestion request.
///
/// Set-valued fields are trimmed, lower-cased and de-duplicated on
/// construction, so two requests that differ only in tag order or case build
/// equal sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceSet {
    pub dietary_restrictions: BTreeSet<String>,
    pub cuisine_preferences: BTreeSet<String>,
    pub max_cooking_time: u32,
    pub difficulty: Option<Difficulty>,
    pub excluded_ingredients: BTreeSet<String>,
    pub serving_size: u32,
    pub meal_period: Option<MealPeriod>,
    pub recent_meal_ids: Vec<String>,
}

pub(crate) fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl PreferenceSet {
    pub fn new(max_cooking_time: u32, serving_size: u32) -> Self {
        Self {
            dietary_restrictions: BTreeSet::new(),
            cuisine_preferences: BTreeSet::new(),
            max_cooking_time,
            difficulty: None,
            excluded_ingredients: BTreeSet::new(),
            serving_size,
            meal_period: None,
            recent_meal_ids: Vec::new(),
        }
    }

    pub fn with_diets<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.dietary_restrictions = normalize_tags(tags);
        self
    }

    pub fn with_cuisines<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.cuisine_preferences = normalize_tags(tags);
        self
    }

    pub fn with_excluded<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.excluded_ingredients = normalize_tags(names);
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_meal_period(mut self, period: MealPeriod) -> Self {
        self.meal_period = Some(period);
        self
    }

    pub fn with_recent<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        self.recent_meal_ids = ids.iter().map(|id| id.as_ref().to_string()).collect();
        self
    }
}

impl SuggestRequest {
    /// Split the request into the preference set and the optional locale.
    pub fn into_preferences(self) -> Result<(PreferenceSet, Option<String>), AppError> {
        let prefs = self.preferences;
        if prefs.serving_size == 0 {
            return Err(AppError::InvalidRequest(
                "servingSize must be at least 1".to_string(),
            ));
        }

        let difficulty = match prefs.difficulty_preference.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<Difficulty>().map_err(AppError::InvalidRequest)?),
        };

        let set = PreferenceSet {
            dietary_restrictions: normalize_tags(&prefs.dietary_restrictions),
            cuisine_preferences: normalize_tags(&prefs.cuisine_preferences),
            max_cooking_time: prefs.max_cooking_time,
            difficulty,
            excluded_ingredients: normalize_tags(prefs.excluded_ingredients.unwrap_or_default()),
            serving_size: prefs.serving_size,
            meal_period: self.time_of_day,
            recent_meal_ids: self.recent_meal_ids.unwrap_or_default(),
        };

        let locale = self.locale.filter(|l| !l.trim().is_empty());
        Ok((set, locale))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestStatus {
    Ok,
    NoMatch,
}

/// Outcome of one suggestion request, serialized as the response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponse {
    pub status: SuggestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal: Option<CandidateMeal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_generated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_used: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_result: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_generated: Option<bool>,
}

impl SuggestResponse {
    pub fn generated(meal: CandidateMeal, badges: Vec<String>) -> Self {
        Self::served(meal, badges, true, false, false, false)
    }

    pub fn cached(meal: CandidateMeal, badges: Vec<String>) -> Self {
        Self::served(meal, badges, true, false, true, false)
    }

    pub fn fallback(meal: CandidateMeal, badges: Vec<String>, timed_out: bool) -> Self {
        Self::served(meal, badges, false, true, false, timed_out)
    }

    pub fn no_match(reason: impl Into<String>) -> Self {
        Self {
            status: SuggestStatus::NoMatch,
            meal: None,
            badges: None,
            alternatives: None,
            reason: Some(reason.into()),
            ai_generated: None,
            fallback_used: None,
            cached_result: None,
            background_generated: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<String>) -> Self {
        if !alternatives.is_empty() {
            self.alternatives = Some(alternatives);
        }
        self
    }

    fn served(
        meal: CandidateMeal,
        badges: Vec<String>,
        ai_generated: bool,
        fallback_used: bool,
        cached_result: bool,
        background_generated: bool,
    ) -> Self {
        Self {
            status: SuggestStatus::Ok,
            meal: Some(meal),
            badges: Some(badges),
            alternatives: None,
            reason: None,
            ai_generated: Some(ai_generated),
            fallback_used: Some(fallback_used),
            cached_result: Some(cached_result),
            background_generated: Some(background_generated),
        }
    }
}

/// Short display tags for a meal: prep time, difficulty, cuisine.
pub fn badges_for(meal: &CandidateMeal) -> Vec<String> {
    let mut badges = vec![
        format!("{} min", meal.prep_time),
        meal.difficulty.label().to_string(),
    ];
    if !meal.cuisine.trim().is_empty() {
        badges.push(meal.cuisine.clone());
    }
    badges
}
