//! Checks for untrusted meal JSON coming back from the generator.
//!
//! Model output is handled as a `serde_json::Value` until every structural and
//! preference check has run; only then is it decoded into [`CandidateMeal`].

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::generator::GenerationError;
use crate::models::{CandidateMeal, Difficulty, PreferenceSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub violations: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    fn fail(&mut self, reason: impl Into<String>) {
        self.violations.push(reason.into());
    }
}

/// Run every check against a candidate and collect all violations.
pub fn validate(candidate: &Value, prefs: &PreferenceSet) -> ValidationResult {
    let mut result = ValidationResult::default();

    let Some(obj) = candidate.as_object() else {
        result.fail("candidate is not a JSON object");
        return result;
    };

    check_structure(obj, &mut result);

    if let Some(prep_time) = obj.get("prepTime").and_then(Value::as_f64) {
        if prep_time > f64::from(prefs.max_cooking_time) {
            result.fail(format!(
                "prepTime {} exceeds maximum of {} minutes",
                prep_time, prefs.max_cooking_time
            ));
        }
    }

    if let Some(wanted) = prefs.difficulty {
        let actual = obj
            .get("difficulty")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Difficulty>().ok());
        if actual != Some(wanted) {
            result.fail(format!("difficulty does not match preference '{}'", wanted));
        }
    }

    if !prefs.cuisine_preferences.is_empty() {
        let cuisine = obj
            .get("cuisine")
            .and_then(Value::as_str)
            .map(|c| c.trim().to_lowercase())
            .unwrap_or_default();
        if !prefs.cuisine_preferences.contains(&cuisine) {
            result.fail(format!("cuisine '{}' is not among the preferred cuisines", cuisine));
        }
    }

    if !prefs.dietary_restrictions.is_empty() {
        let satisfied = string_items(obj.get("dietTags"))
            .any(|tag| prefs.dietary_restrictions.contains(&tag.trim().to_lowercase()));
        if !satisfied {
            result.fail("diet tags do not satisfy any dietary restriction");
        }
    }

    if !prefs.excluded_ingredients.is_empty() {
        let names = obj
            .get("ingredients")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|i| i.get("name").and_then(Value::as_str));
        for name in names {
            if let Some(excluded) = excluded_match(name, prefs) {
                result.fail(format!("ingredient '{}' matches excluded '{}'", name, excluded));
            }
        }
    }

    result
}

/// Returns the excluded entry an ingredient name collides with, if any.
///
/// Matching is symmetric: "peanut" excludes "peanut butter", and "pine nuts"
/// excludes an ingredient simply called "nuts".
pub fn excluded_match<'a>(name: &str, prefs: &'a PreferenceSet) -> Option<&'a str> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    prefs
        .excluded_ingredients
        .iter()
        .find(|excluded| name.contains(excluded.as_str()) || excluded.contains(&name))
        .map(String::as_str)
}

fn check_structure(obj: &Map<String, Value>, result: &mut ValidationResult) {
    if !is_non_empty_str(obj.get("title")) {
        result.fail("missing or empty title");
    }
    if !obj.get("description").is_some_and(Value::is_string) {
        result.fail("missing description");
    }
    if !obj.get("prepTime").is_some_and(|v| v.as_f64().is_some_and(|n| n >= 0.0)) {
        result.fail("prepTime must be a non-negative number");
    }
    let difficulty_ok = obj
        .get("difficulty")
        .and_then(Value::as_str)
        .is_some_and(|s| s.parse::<Difficulty>().is_ok());
    if !difficulty_ok {
        result.fail("difficulty must be one of easy, medium, hard");
    }
    if !is_non_empty_str(obj.get("cuisine")) {
        result.fail("missing or empty cuisine");
    }
    match obj.get("dietTags").and_then(Value::as_array) {
        Some(tags) if tags.iter().all(Value::is_string) => {}
        _ => result.fail("dietTags must be a list of strings"),
    }

    match obj.get("ingredients").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => {
            for (i, item) in items.iter().enumerate() {
                if !is_ingredient(item) {
                    result.fail(format!("ingredient {} must have name, amount and unit", i + 1));
                }
            }
        }
        _ => result.fail("ingredients must be a non-empty list"),
    }

    match obj.get("instructions").and_then(Value::as_array) {
        Some(steps) if !steps.is_empty() && steps.iter().all(Value::is_string) => {}
        _ => result.fail("instructions must be a non-empty list of strings"),
    }

    if !obj.get("nutritionInfo").is_some_and(Value::is_object) {
        result.fail("nutritionInfo must be an object");
    }
}

fn is_ingredient(item: &Value) -> bool {
    let Some(fields) = item.as_object() else {
        return false;
    };
    is_non_empty_str(fields.get("name"))
        && fields
            .get("amount")
            .is_some_and(|a| a.is_string() || a.is_number())
        && fields.get("unit").is_some_and(Value::is_string)
}

fn is_non_empty_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn string_items(value: Option<&Value>) -> impl Iterator<Item = &str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Strip markdown fences and surrounding prose from a completion.
pub fn extract_json(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(fenced) = text.strip_prefix("```") {
        // Drop the info string ("json") on the opening fence line. A one-line
        // fence keeps it; the brace scan below skips it.
        text = fenced.split_once('\n').map(|(_, body)| body).unwrap_or(fenced);
        text = text.trim_end();
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Turn a raw completion into a validated meal.
pub fn parse_candidate(raw: &str, prefs: &PreferenceSet) -> Result<CandidateMeal, GenerationError> {
    let mut value: Value = serde_json::from_str(extract_json(raw))
        .map_err(|e| GenerationError::InvalidJson(e.to_string()))?;

    let report = validate(&value, prefs);
    if !report.is_valid() {
        return Err(GenerationError::Rejected(report.violations));
    }

    normalize(&mut value);
    let mut meal: CandidateMeal =
        serde_json::from_value(value).map_err(|e| GenerationError::Schema(e.to_string()))?;
    if meal.id.trim().is_empty() {
        meal.id = format!("ai-{}", Uuid::new_v4());
    }
    Ok(meal)
}

// Coerce loose numeric shapes the validator accepts into the typed form
fn normalize(value: &mut Value) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };

    match obj.get("id").cloned() {
        Some(Value::String(_)) | None => {}
        Some(id @ Value::Number(_)) => {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
        // null or nested ids are treated as absent and replaced later
        Some(_) => {
            obj.remove("id");
        }
    }
    round_number(obj.get_mut("prepTime"));

    if let Some(items) = obj.get_mut("ingredients").and_then(Value::as_array_mut) {
        for item in items {
            if let Some(amount) = item.get_mut("amount") {
                if amount.is_number() {
                    *amount = Value::String(amount.to_string());
                }
            }
        }
    }

    if let Some(nutrition) = obj.get_mut("nutritionInfo").and_then(Value::as_object_mut) {
        nutrition.retain(|_, v| v.is_number());
        for v in nutrition.values_mut() {
            round_number(Some(v));
        }
    }
}

fn round_number(value: Option<&mut Value>) {
    let Some(v) = value else {
        return;
    };
    if v.is_f64() {
        let n = v.as_f64().unwrap_or_default();
        *v = Value::from(n.max(0.0).round() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn italian_pasta(prep_time: u32) -> Value {
        json!({
            "title": "Spaghetti Aglio e Olio",
            "description": "Garlic and olive oil pasta",
            "prepTime": prep_time,
            "difficulty": "easy",
            "cuisine": "Italian",
            "dietTags": ["vegetarian", "vegan"],
            "ingredients": [
                {"name": "spaghetti", "amount": "200", "unit": "g"},
                {"name": "garlic", "amount": 3, "unit": "cloves"},
                {"name": "olive oil", "amount": "1/4", "unit": "cup"}
            ],
            "instructions": ["Boil pasta", "Fry garlic", "Toss"],
            "nutritionInfo": {"calories": 520, "protein": 14.4, "carbs": 80, "fat": 18}
        })
    }

    #[test]
    fn test_valid_candidate_passes() {
        let prefs = PreferenceSet::new(20, 2)
            .with_cuisines(&["italian"])
            .with_diets(&["vegan", "keto"])
            .with_difficulty(Difficulty::Easy);
        let result = validate(&italian_pasta(15), &prefs);
        assert!(result.is_valid(), "{:?}", result.violations);
    }

    #[test]
    fn test_all_violations_are_reported() {
        let prefs = PreferenceSet::new(20, 2).with_cuisines(&["Mexican"]);
        let result = validate(&italian_pasta(25), &prefs);

        assert!(!result.is_valid());
        assert_eq!(result.violations.len(), 2);
        assert!(result.violations[0].contains("prepTime"));
        assert!(result.violations[1].contains("cuisine"));
    }

    #[test]
    fn test_structural_gaps() {
        let candidate = json!({
            "title": "",
            "prepTime": "ten",
            "difficulty": "impossible",
            "cuisine": "Thai",
            "ingredients": [],
            "instructions": ["Stir", 4]
        });
        let result = validate(&candidate, &PreferenceSet::new(60, 2));
        let joined = result.violations.join("; ");
        for needle in [
            "title",
            "description",
            "prepTime",
            "difficulty",
            "dietTags",
            "ingredients",
            "instructions",
            "nutritionInfo",
        ] {
            assert!(joined.contains(needle), "missing {needle}: {joined}");
        }
    }

    #[test]
    fn test_non_object_candidate() {
        let result = validate(&json!(["not", "a", "meal"]), &PreferenceSet::new(60, 2));
        assert_eq!(result.violations, vec!["candidate is not a JSON object"]);
    }

    #[test]
    fn test_difficulty_and_diet_mismatch() {
        let prefs = PreferenceSet::new(60, 2)
            .with_difficulty(Difficulty::Hard)
            .with_diets(&["keto"]);
        let result = validate(&italian_pasta(15), &prefs);
        assert_eq!(result.violations.len(), 2);
    }

    #[test]
    fn test_excluded_ingredients_match_both_ways() {
        let prefs = PreferenceSet::new(60, 2).with_excluded(&["GARLIC", "extra virgin olive oil"]);
        let result = validate(&italian_pasta(15), &prefs);
        assert_eq!(result.violations.len(), 2, "{:?}", result.violations);

        assert_eq!(excluded_match("Peanut Butter", &PreferenceSet::new(1, 1).with_excluded(&["peanut"])), Some("peanut"));
        assert_eq!(excluded_match("nuts", &PreferenceSet::new(1, 1).with_excluded(&["pine nuts"])), Some("pine nuts"));
        assert_eq!(excluded_match("", &PreferenceSet::new(1, 1).with_excluded(&["salt"])), None);
    }

    #[test]
    fn test_extract_json_strips_fences_and_prose() {
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("```\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(extract_json("```{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(extract_json("```json {\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(extract_json("Here you go: {\"a\": 1} enjoy!"), "{\"a\": 1}");
        assert_eq!(extract_json("no json here"), "no json here");
    }

    #[test]
    fn test_parse_candidate_normalizes_and_assigns_id() {
        let raw = format!("```json\n{}\n```", italian_pasta(15));
        let meal = parse_candidate(&raw, &PreferenceSet::new(20, 2)).unwrap();

        assert!(meal.id.starts_with("ai-"));
        assert_eq!(meal.ingredients[1].amount, "3");
        assert_eq!(meal.nutrition_info.unwrap().protein, 14);
        assert_eq!(meal.difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_one_line_fenced_completion_parses() {
        let raw = format!("```json {}```", italian_pasta(15));
        let meal = parse_candidate(&raw, &PreferenceSet::new(20, 2)).unwrap();
        assert_eq!(meal.title, "Spaghetti Aglio e Olio");
    }

    #[test]
    fn test_null_or_nested_id_gets_generated_id() {
        for id in [Value::Null, json!({"value": 7}), json!(["x"])] {
            let mut candidate = italian_pasta(15);
            candidate["id"] = id;
            let meal = parse_candidate(&candidate.to_string(), &PreferenceSet::new(20, 2)).unwrap();
            assert!(meal.id.starts_with("ai-"), "{}", meal.id);
        }

        let mut numbered = italian_pasta(15);
        numbered["id"] = json!(42);
        let meal = parse_candidate(&numbered.to_string(), &PreferenceSet::new(20, 2)).unwrap();
        assert_eq!(meal.id, "42");
    }

    #[test]
    fn test_non_string_diet_tags_are_a_violation() {
        let mut candidate = italian_pasta(15);
        candidate["dietTags"] = json!(["vegan", 3, null]);

        let result = validate(&candidate, &PreferenceSet::new(20, 2));
        assert_eq!(result.violations, vec!["dietTags must be a list of strings"]);
        assert!(matches!(
            parse_candidate(&candidate.to_string(), &PreferenceSet::new(20, 2)),
            Err(GenerationError::Rejected(_))
        ));
    }

    #[test]
    fn test_parse_candidate_errors() {
        let prefs = PreferenceSet::new(20, 2);
        assert!(matches!(
            parse_candidate("I cannot help with that", &prefs),
            Err(GenerationError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_candidate(&italian_pasta(45).to_string(), &prefs),
            Err(GenerationError::Rejected(reasons)) if reasons.len() == 1
        ));
    }
}
