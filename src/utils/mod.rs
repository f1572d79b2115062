use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// Parse a JSON number or numeric string; `None` for null. Non-finite values are rejected.
fn value_to_f64<E: de::Error>(value: Option<Value>) -> Result<Option<f64>, E> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| E::custom(format!("number out of range: {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| E::custom(format!("not a finite number: '{}'", s))),
        Some(Value::Bool(b)) => Ok(Some(if b { 1.0 } else { 0.0 })),
        Some(other) => Err(E::custom(format!("expected a number, got {}", other))),
    }
}

/// Lenient f64: numbers, numeric strings, null → 0.0
pub fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value_to_f64(value)?.unwrap_or(0.0))
}

/// Lenient optional f64: null stays `None`
pub fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    value_to_f64(value)
}

fn f64_to_u32<E: de::Error>(value: f64) -> Result<u32, E> {
    if value.is_finite() && value >= 0.0 && value <= u32::MAX as f64 && value.fract() == 0.0 {
        Ok(value as u32)
    } else {
        Err(E::custom(format!("expected a non-negative integer, got {}", value)))
    }
}

/// Lenient u32: null → 0
pub fn de_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value_to_f64(value)? {
        Some(v) => f64_to_u32(v),
        None => Ok(0),
    }
}

/// Lenient optional u32: null stays `None`
pub fn de_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    value_to_f64(value)?.map(f64_to_u32).transpose()
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a price held in tenths for display (55 → "5.5")
pub fn format_price(tenths: u32) -> String {
    format!("{:.1}", tenths as f64 / 10.0)
}

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Weight for a played gameweek: later rounds weigh progressively more
pub fn recency_weight(round: u32, last_round: u32) -> f64 {
    if last_round == 0 {
        return 1.0;
    }
    1.0 + round as f64 / last_round as f64
}

/// Weight for an upcoming fixture: the nearer to the next gameweek, the heavier
pub fn proximity_weight(event: u32, next_event: u32) -> f64 {
    let distance = (event as i64 - next_event as i64).max(1);
    1.0 + 1.0 / distance as f64
}

/// Pad or truncate for fixed-width table columns
pub fn fit(text: &str, width: usize) -> String {
    let truncated: String = text.chars().take(width).collect();
    format!("{:<width$}", truncated, width = width)
}

/// Jaro-Winkler similarity below this is not a name match
pub const NAME_MATCH_THRESHOLD: f64 = 0.9;

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Index of the closest name at or above the match threshold; exact matches win outright.
pub fn best_name_match<'a, I>(query: &str, names: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let query = normalize_name(query);
    let mut best: Option<(usize, f64)> = None;

    for (i, name) in names.into_iter().enumerate() {
        let score = strsim::jaro_winkler(&query, &normalize_name(name));
        if score >= NAME_MATCH_THRESHOLD && best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
        if score == 1.0 {
            break;
        }
    }

    best.map(|(i, _)| i)
}
