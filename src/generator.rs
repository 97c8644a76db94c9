//! Generative model clients.
//!
//! The orchestrator only sees the [`MealGenerator`] trait: a prompt goes in,
//! free-form text comes out. Turning that text into a meal is the validator's
//! job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::PreferenceSet;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Model backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Completion is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Generated meal rejected: {}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error("Generated meal does not match the meal schema: {0}")]
    Schema(String),
}

#[async_trait]
pub trait MealGenerator: Send + Sync {
    /// Send a prompt to the model and return its raw text completion.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

// Ollama API request format
#[derive(Deserialize, Serialize, Clone)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(default)]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

// Ollama API response format
#[derive(Deserialize, Serialize, Clone)]
struct GenerateResponse {
    #[serde(default)]
    model: String,
    response: String,
}

/// Generator backed by an Ollama server's `/api/generate` endpoint.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str) -> Self {
        // add http:// if not present
        let base_url = if base_url.starts_with("http") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", base_url.trim_end_matches('/'))
        };
        Self {
            client,
            base_url,
            model: model.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MealGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: Some("json".to_string()),
        };

        let res = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let body = res
            .json::<GenerateResponse>()
            .await
            .map_err(|e| GenerationError::RequestFailed(format!("Parse Error: {}", e)))?;
        tracing::debug!(model = %body.model, chars = body.response.len(), "Completion received");
        Ok(body.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Generator that returns a canned completion, for offline runs and tests.
#[derive(Debug, Clone)]
pub struct FakeGenerator {
    response: Result<String, String>,
    delay: Duration,
}

impl FakeGenerator {
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Ok(response.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self::with_response(SAMPLE_COMPLETION)
    }
}

#[async_trait]
impl MealGenerator for FakeGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response
            .clone()
            .map_err(GenerationError::RequestFailed)
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

const SAMPLE_COMPLETION: &str = r#"```json
{
  "title": "Lemon Herb Chickpea Salad",
  "description": "A bright, no-cook salad of chickpeas, cucumber and herbs.",
  "prepTime": 15,
  "difficulty": "easy",
  "cuisine": "Mediterranean",
  "dietTags": ["vegan", "vegetarian", "gluten-free", "dairy-free"],
  "ingredients": [
    {"name": "chickpeas", "amount": "1 1/2", "unit": "cups"},
    {"name": "cucumber", "amount": "1", "unit": ""},
    {"name": "parsley", "amount": "1/4", "unit": "cup"},
    {"name": "lemon juice", "amount": "2", "unit": "tbsp"},
    {"name": "salt", "amount": "to taste", "unit": ""}
  ],
  "instructions": [
    "Rinse and drain the chickpeas.",
    "Dice the cucumber and chop the parsley.",
    "Toss everything with lemon juice and salt."
  ],
  "nutritionInfo": {"calories": 310, "protein": 13, "carbs": 45, "fat": 8}
}
```"#;

/// Build the completion prompt for a preference set.
///
/// The model is asked for amounts for two servings; scaling happens after
/// validation.
pub fn build_prompt(prefs: &PreferenceSet, locale: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a recipe assistant. Suggest exactly one recipe that satisfies the constraints below.\n\nConstraints:\n",
    );

    prompt.push_str(&format!(
        "- Total preparation time: at most {} minutes\n",
        prefs.max_cooking_time
    ));
    if let Some(difficulty) = prefs.difficulty {
        prompt.push_str(&format!("- Difficulty: {}\n", difficulty));
    }
    if !prefs.cuisine_preferences.is_empty() {
        prompt.push_str(&format!("- Cuisine: one of {}\n", join(&prefs.cuisine_preferences)));
    }
    if !prefs.dietary_restrictions.is_empty() {
        prompt.push_str(&format!(
            "- Diet: must satisfy at least one of {} and list it in dietTags\n",
            join(&prefs.dietary_restrictions)
        ));
    }
    if !prefs.excluded_ingredients.is_empty() {
        prompt.push_str(&format!("- Never use: {}\n", join(&prefs.excluded_ingredients)));
    }
    if let Some(period) = prefs.meal_period {
        prompt.push_str(&format!("- Meal: {}\n", period.as_str()));
    }
    if let Some(locale) = locale {
        prompt.push_str(&format!("- Write the text for locale {}\n", locale));
    }

    prompt.push_str(
        "\nGive ingredient amounts for 2 servings.\n\
         Respond with a single JSON object and nothing else, using exactly these fields:\n\
         {\"title\": string, \"description\": string, \"prepTime\": integer minutes, \
         \"difficulty\": \"easy\"|\"medium\"|\"hard\", \"cuisine\": string, \"dietTags\": [string], \
         \"ingredients\": [{\"name\": string, \"amount\": string, \"unit\": string}], \
         \"instructions\": [string], \
         \"nutritionInfo\": {\"calories\": integer, \"protein\": integer, \"carbs\": integer, \"fat\": integer}}\n",
    );
    prompt
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
