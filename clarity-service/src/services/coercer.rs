//! Best-effort recovery of a JSON object from model output.
//!
//! Models asked for JSON still wrap it in markdown fences or add a sentence
//! before and after. Extraction order:
//! - a fenced block (```` ```json ```` or bare ```` ``` ````) whose body is `{ ... }`
//! - otherwise the span from the first `{` to the last `}`

use crate::models::PartialContent;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

fn fenced_block() -> &'static Regex {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    FENCED.get_or_init(|| {
        Regex::new(r"(?s)```(?i:json)?[ \t]*\r?\n?\s*(\{.*?\})\s*```")
            .expect("fenced block pattern is valid")
    })
}

/// Extract the first JSON object in `raw`, if any.
pub fn extract_json_object(raw: Option<&str>) -> Option<Map<String, Value>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(body) = fenced_block().captures(raw).and_then(|c| c.get(1)) {
        match serde_json::from_str::<Value>(body.as_str()) {
            Ok(Value::Object(map)) => return Some(map),
            Ok(_) => tracing::debug!("Fenced block is not a JSON object, scanning for braces"),
            Err(e) => {
                tracing::debug!(error = %e, "Fenced block is not valid JSON, scanning for braces")
            }
        }
    }

    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => (start, end),
        _ => {
            tracing::debug!(len = raw.len(), "No JSON object found in completion");
            return None;
        }
    };

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            tracing::warn!("Completion braces did not enclose a JSON object");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse JSON from completion");
            None
        }
    }
}

/// Recover clarity content fields from a completion.
///
/// Fields that are missing, of the wrong type, or empty stay unset. Non-text
/// items inside a list are skipped.
pub fn coerce_json(raw: Option<&str>) -> Option<PartialContent> {
    let map = extract_json_object(raw)?;

    Some(PartialContent {
        summary: text_field(&map, "summary"),
        feelings: list_field(&map, "feelings"),
        action_plan: list_field(&map, "actionPlan"),
        reflection_prompts: list_field(&map, "reflectionPrompts"),
    })
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn list_field(map: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let items: Vec<String> = map
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect();

    (!items.is_empty()).then_some(items)
}
