//! Ingredient amount scaling.
//!
//! Amounts are display strings ("1 1/2", "2 cups", "to taste"). Scaling parses
//! the leading quantity, multiplies it, and snaps the result back onto the
//! fractions people actually measure with, so a doubled "1/3 cup" reads
//! "3/4 cup" rather than "0.67 cup".

use crate::models::CandidateMeal;

/// Serving count assumed by stored and generated recipes.
pub const BASELINE_SERVINGS: u32 = 2;

// Written forms recognized verbatim, longest first so "1 1/2" wins over "1"
const FRACTIONS: &[(&str, f64)] = &[
    ("2 1/2", 2.5),
    ("1 3/4", 1.75),
    ("1 2/3", 5.0 / 3.0),
    ("1 1/2", 1.5),
    ("1 1/3", 4.0 / 3.0),
    ("1 1/4", 1.25),
    ("1/8", 0.125),
    ("1/4", 0.25),
    ("1/3", 1.0 / 3.0),
    ("1/2", 0.5),
    ("2/3", 2.0 / 3.0),
    ("3/4", 0.75),
    ("⅛", 0.125),
    ("¼", 0.25),
    ("⅓", 1.0 / 3.0),
    ("½", 0.5),
    ("⅔", 2.0 / 3.0),
    ("¾", 0.75),
];

// Upper band edge (exclusive) and the label values below it snap to
const BANDS: &[(f64, &str)] = &[
    (0.1875, "1/8"),
    (0.375, "1/4"),
    (0.625, "1/2"),
    (0.875, "3/4"),
    (1.125, "1"),
    (1.375, "1 1/4"),
    (1.625, "1 1/2"),
    (1.875, "1 3/4"),
];

const PINCH_BELOW: f64 = 0.125;
const WHOLE_NUMBERS_FROM: f64 = 10.0;

/// Scale a display amount by `factor`.
///
/// Anything without a recognizable leading quantity ("to taste", "a handful")
/// is returned unchanged, as are zero quantities. Text after the quantity is
/// kept verbatim.
pub fn scale(amount: &str, factor: f64) -> String {
    let trimmed = amount.trim();

    if let Some(range) = scale_range(trimmed, factor) {
        return range;
    }

    match leading_quantity(trimmed) {
        Some((value, rest)) if value > 0.0 && factor > 0.0 => {
            format!("{}{}", quantize(value * factor), rest)
        }
        _ => amount.to_string(),
    }
}

/// Rescale every ingredient of a baseline meal for `serving_size` people.
pub fn scale_meal(mut meal: CandidateMeal, serving_size: u32) -> CandidateMeal {
    let factor = f64::from(serving_size) / f64::from(BASELINE_SERVINGS);
    for ingredient in &mut meal.ingredients {
        ingredient.amount = scale(&ingredient.amount, factor);
    }
    meal
}

// "1-2" or "1/2-1": scale each end when both are plain quantities
fn scale_range(amount: &str, factor: f64) -> Option<String> {
    let (low, high) = amount.split_once('-')?;
    let (low_value, low_rest) = leading_quantity(low.trim())?;
    let (high_value, high_rest) = leading_quantity(high.trim())?;
    if !low_rest.is_empty() || low_value <= 0.0 || high_value <= 0.0 || factor <= 0.0 {
        return None;
    }
    Some(format!(
        "{}-{}{}",
        quantize(low_value * factor),
        quantize(high_value * factor),
        high_rest
    ))
}

// Returns the numeric value and the untouched remainder of the string
fn leading_quantity(amount: &str) -> Option<(f64, &str)> {
    for (form, value) in FRACTIONS {
        if let Some(rest) = amount.strip_prefix(form) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return Some((*value, rest));
            }
        }
    }

    if let Some(parsed) = written_fraction(amount) {
        return Some(parsed);
    }

    let end = amount
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(amount.len());
    let number: f64 = amount[..end].parse().ok()?;
    Some((number, &amount[end..]))
}

// Fractions outside the table, e.g. "3/8" or "2 3/8"
fn written_fraction(amount: &str) -> Option<(f64, &str)> {
    let end = amount
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '/' || *c == ' '))
        .map(|(i, _)| i)
        .unwrap_or(amount.len());
    let head = amount[..end].trim_end();
    let rest = &amount[head.len()..];

    let (whole, fraction) = match head.split_once(' ') {
        Some((whole, fraction)) => (whole.parse::<f64>().ok()?, fraction),
        None => (0.0, head),
    };
    let (numerator, denominator) = fraction.split_once('/')?;
    let numerator: f64 = numerator.parse().ok()?;
    let denominator: f64 = denominator.parse().ok()?;
    if denominator == 0.0 {
        return None;
    }
    Some((whole + numerator / denominator, rest))
}

fn quantize(value: f64) -> String {
    if value < PINCH_BELOW {
        return "pinch".to_string();
    }
    if let Some((_, label)) = BANDS.iter().find(|(upper, _)| value < *upper) {
        return (*label).to_string();
    }
    if value < WHOLE_NUMBERS_FROM {
        return mixed_quarters((value * 4.0).round() as u64);
    }
    format!("{}", value.round() as u64)
}

fn mixed_quarters(quarters: u64) -> String {
    let whole = quarters / 4;
    match quarters % 4 {
        0 => format!("{}", whole),
        1 => format!("{} 1/4", whole),
        2 => format!("{} 1/2", whole),
        _ => format!("{} 3/4", whole),
    }
}
