//! Diagnosis endpoint tests, driven through the router with a scripted provider.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
};
use clarity_service::models::fallback::fallback_content;
use clarity_service::services::providers::mock::Script;
use clarity_service::services::ClarityGenerator;
use clarity_service::startup::{build_router, AppState};
use common::{scripted, test_config, TestApp, ALLOWED_ORIGIN, SECOND_ORIGIN};
use serde_json::Value;
use tower::ServiceExt;

const FULL_COMPLETION: &str = r#"{
  "summary": "Work and family are pulling you in different directions.",
  "feelings": ["Stretched thin", "Guilty"],
  "actionPlan": ["List this week's commitments", "Drop one of them"],
  "reflectionPrompts": ["What would rest look like?"]
}"#;

async fn send(generator: ClarityGenerator, request: Request<Body>) -> Response {
    build_router(AppState::new(test_config(), generator))
        .oneshot(request)
        .await
        .expect("router is infallible")
}

fn post(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/diagnosis")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_entry_shape(body: &Value, prompt: &str) {
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(body["prompt"], prompt);
    assert!(body["summary"].as_str().is_some_and(|s| !s.is_empty()));
    for key in ["feelings", "actionPlan", "reflectionPrompts"] {
        assert!(
            body[key].as_array().is_some_and(|a| !a.is_empty()),
            "{key} should be a non-empty list"
        );
    }
    assert!(chrono::DateTime::parse_from_rfc3339(body["createdAt"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn live_completion_is_returned_as_entry() {
    let (generator, provider) = scripted(Script::Completion(Some(FULL_COMPLETION.to_string())));

    let response = send(generator, post(r#"{"prompt":"I have no time for anything"}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_entry_shape(&body, "I have no time for anything");
    assert_eq!(
        body["summary"],
        "Work and family are pulling you in different directions."
    );
    assert_eq!(body["feelings"], serde_json::json!(["Stretched thin", "Guilty"]));
    assert_eq!(provider.calls(), 1);
    assert!(provider
        .last_prompt()
        .unwrap()
        .ends_with("I have no time for anything"));
}

#[tokio::test]
async fn missing_prompt_is_rejected_without_calling_upstream() {
    let (generator, provider) = scripted(Script::Completion(Some(FULL_COMPLETION.to_string())));

    for body in [
        r#"{}"#,
        r#"{"prompt":""}"#,
        r#"{"prompt":null}"#,
        r#"{"prompt":false}"#,
        r#"{"prompt":0}"#,
    ] {
        let response = send(generator.clone(), post(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "Prompt is required" })
        );
    }

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn malformed_body_is_generic_500() {
    let (generator, provider) = scripted(Script::Completion(None));

    let response = send(generator, post("{not json")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "Failed to generate diagnosis" })
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn upstream_failure_still_returns_complete_entry() {
    let (generator, _) = scripted(Script::ApiError(503));

    let response = send(generator, post(r#"{"prompt":"everything is too loud"}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_entry_shape(&body, "everything is too loud");
    assert_eq!(body["summary"], fallback_content().summary);
}

#[tokio::test]
async fn prose_completion_falls_back_per_entry() {
    let (generator, _) = scripted(Script::Completion(Some(
        "I'm sorry, I can't help with that.".to_string(),
    )));

    let response = send(generator, post(r#"{"prompt":"help"}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["actionPlan"], serde_json::json!(fallback_content().action_plan));
}

#[tokio::test]
async fn partial_completion_is_filled_from_fallback() {
    let (generator, _) = scripted(Script::Completion(Some(
        "```json\n{\"summary\": \"Only this\"}\n```".to_string(),
    )));

    let response = send(generator, post(r#"{"prompt":"hm"}"#)).await;
    let body = json_body(response).await;

    assert_eq!(body["summary"], "Only this");
    assert_eq!(body["feelings"], serde_json::json!(fallback_content().feelings));
    assert_eq!(
        body["reflectionPrompts"],
        serde_json::json!(fallback_content().reflection_prompts)
    );
}

#[tokio::test]
async fn preflight_echoes_allowed_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/diagnosis")
        .header(header::ORIGIN, SECOND_ORIGIN)
        .body(Body::empty())
        .unwrap();

    let response = send(ClarityGenerator::new(None), request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], SECOND_ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, Authorization"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn unknown_origin_gets_default_origin_without_credentials() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/diagnosis")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();

    let response = send(ClarityGenerator::new(None), request).await;
    let headers = response.headers();

    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED_ORIGIN);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
}

#[tokio::test]
async fn error_responses_carry_cors_headers() {
    let mut request = post(r#"{}"#);
    request
        .headers_mut()
        .insert(header::ORIGIN, ALLOWED_ORIGIN.parse().unwrap());

    let response = send(ClarityGenerator::new(None), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGIN
    );
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let mut request = post(r#"{"prompt":"hi"}"#);
    request
        .headers_mut()
        .insert("x-request-id", "req-123".parse().unwrap());

    let response = send(ClarityGenerator::new(None), request).await;
    let headers = response.headers();

    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}

#[tokio::test]
async fn concurrent_requests_get_distinct_ids() {
    let app = TestApp::spawn(ClarityGenerator::new(None)).await;

    let responses = futures::future::join_all(
        (0..5).map(|i| {
            let app = &app;
            async move { app.post_diagnosis(&format!(r#"{{"prompt":"worry {i}"}}"#)).await }
        }),
    )
    .await;

    let mut ids = Vec::new();
    for response in responses {
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        ids.push(body["id"].as_str().unwrap().to_string());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}
