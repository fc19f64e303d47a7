use crate::models::ClarityEntry;
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::Value;
use service_core::error::AppError;

pub const PROMPT_REQUIRED: &str = "Prompt is required";
pub const GENERATION_FAILED: &str = "Failed to generate diagnosis";

/// `POST /api/diagnosis` with `{ "prompt": "..." }`.
///
/// A missing or falsy `prompt` (null, `""`, `false`, `0`) is a 400 and never
/// reaches the generator. A body that is not a JSON object, or any other
/// non-string `prompt`, is a 500. Generation itself cannot fail.
pub async fn create_diagnosis(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ClarityEntry>, AppError> {
    let prompt = parse_prompt(&body)?;

    let outcome = state.generator.try_generate(&prompt).await;
    if let Some(reason) = outcome.fallback_reason() {
        tracing::debug!(reason = %reason, "Responding with fallback entry");
    }

    Ok(Json(outcome.into_entry()))
}

/// `OPTIONS /api/diagnosis`. CORS headers are added by middleware.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

fn parse_prompt(body: &[u8]) -> Result<String, AppError> {
    let request: Value = serde_json::from_slice(body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse diagnosis request body");
        AppError::InternalError(anyhow::anyhow!(GENERATION_FAILED))
    })?;

    let Value::Object(mut fields) = request else {
        tracing::error!("Diagnosis request body is not a JSON object");
        return Err(AppError::InternalError(anyhow::anyhow!(GENERATION_FAILED)));
    };

    match fields.remove("prompt") {
        Some(Value::String(prompt)) if !prompt.is_empty() => Ok(prompt),
        None => Err(AppError::BadRequest(anyhow::anyhow!(PROMPT_REQUIRED))),
        Some(value) if is_falsy(&value) => {
            Err(AppError::BadRequest(anyhow::anyhow!(PROMPT_REQUIRED)))
        }
        Some(other) => {
            tracing::error!(kind = json_kind(&other), "Diagnosis prompt is not a string");
            Err(AppError::InternalError(anyhow::anyhow!(GENERATION_FAILED)))
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(result: Result<String, AppError>) -> Option<&'static str> {
        match result {
            Ok(_) => None,
            Err(AppError::BadRequest(_)) => Some("bad_request"),
            Err(AppError::InternalError(_)) => Some("internal"),
            Err(_) => Some("other"),
        }
    }

    #[test]
    fn prompt_is_extracted() {
        assert_eq!(parse_prompt(br#"{"prompt":"hello"}"#).unwrap(), "hello");
    }

    #[test]
    fn extra_fields_are_ignored() {
        assert_eq!(
            parse_prompt(br#"{"prompt":"hi","mood":"tired"}"#).unwrap(),
            "hi"
        );
    }

    #[test]
    fn missing_or_falsy_prompt_is_bad_request() {
        for body in [
            r#"{}"#,
            r#"{"prompt":""}"#,
            r#"{"prompt":null}"#,
            r#"{"prompt":false}"#,
            r#"{"prompt":0}"#,
            r#"{"prompt":0.0}"#,
        ] {
            assert_eq!(
                status_of(parse_prompt(body.as_bytes())),
                Some("bad_request"),
                "body {body}"
            );
        }
    }

    #[test]
    fn unparseable_body_is_internal_error() {
        for body in [
            "",
            "not json",
            "[]",
            "\"prompt\"",
            r#"{"prompt":42}"#,
            r#"{"prompt":true}"#,
            r#"{"prompt":["a"]}"#,
            r#"{"prompt":{}}"#,
        ] {
            assert_eq!(
                status_of(parse_prompt(body.as_bytes())),
                Some("internal"),
                "body {body:?}"
            );
        }
    }
}
