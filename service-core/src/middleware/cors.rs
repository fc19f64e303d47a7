//! Origin allow-list CORS.
//!
//! `tower_http::cors::CorsLayer` omits `Access-Control-Allow-Origin` for
//! origins it does not allow. Browser clients of the clarity endpoint expect
//! the header on every response, so this middleware always writes one: the
//! caller's origin when it is allow-listed (with credentials), otherwise the
//! default origin (without credentials).

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed_origins: Vec<String>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
}

impl OriginPolicy {
    /// Build a policy from an allow-list. The first entry is the default
    /// origin written for requests from anywhere else.
    ///
    /// Entries that are not valid header values are dropped with a warning.
    pub fn new(allowed_origins: Vec<String>) -> Self {
        let allowed_origins = allowed_origins
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| {
                let valid = !o.is_empty() && HeaderValue::from_str(o).is_ok();
                if !valid {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                }
                valid
            })
            .collect();

        Self {
            allowed_origins,
            allow_methods: HeaderValue::from_static("POST, OPTIONS"),
            allow_headers: HeaderValue::from_static("Content-Type, Authorization"),
            max_age: HeaderValue::from_static("86400"),
        }
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn default_origin(&self) -> Option<&str> {
        self.allowed_origins.first().map(String::as_str)
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }

    /// Write the CORS headers for a request carrying `origin`.
    pub fn apply(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        let echoed = origin.filter(|o| self.is_allowed(o));

        match echoed.or(self.default_origin()) {
            Some(value) => {
                if let Ok(value) = HeaderValue::from_str(value) {
                    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                }
            }
            None => {
                headers.remove(header::ACCESS_CONTROL_ALLOW_ORIGIN);
            }
        }

        if echoed.is_some() {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        } else {
            headers.remove(header::ACCESS_CONTROL_ALLOW_CREDENTIALS);
        }

        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

pub async fn cors_middleware(
    State(policy): State<Arc<OriginPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let mut response = next.run(req).await;
    policy.apply(origin.as_deref(), response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> OriginPolicy {
        OriginPolicy::new(vec![
            "https://clarity.example.com".to_string(),
            "http://localhost:3000/".to_string(),
        ])
    }

    #[test]
    fn allow_listed_origin_is_echoed_with_credentials() {
        let mut headers = HeaderMap::new();
        policy().apply(Some("http://localhost:3000"), &mut headers);

        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }

    #[test]
    fn unknown_origin_gets_default_without_credentials() {
        let mut headers = HeaderMap::new();
        policy().apply(Some("https://evil.example.net"), &mut headers);

        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://clarity.example.com"
        );
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[test]
    fn missing_origin_gets_default() {
        let mut headers = HeaderMap::new();
        policy().apply(None, &mut headers);

        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://clarity.example.com"
        );
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[test]
    fn vary_origin_is_written_for_every_caller() {
        for origin in [Some("http://localhost:3000"), Some("https://evil.example.net"), None] {
            let mut headers = HeaderMap::new();
            headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
            policy().apply(origin, &mut headers);

            let vary: Vec<&str> = headers
                .get_all(header::VARY)
                .iter()
                .map(|v| v.to_str().unwrap())
                .collect();
            assert_eq!(vary, ["Accept-Encoding", "Origin"], "origin {origin:?}");
        }
    }

    #[test]
    fn origin_match_is_exact() {
        let policy = policy();
        assert!(!policy.is_allowed("https://clarity.example.com.evil.net"));
        assert!(!policy.is_allowed("HTTPS://CLARITY.EXAMPLE.COM"));
        assert!(policy.is_allowed("https://clarity.example.com"));
    }

    #[test]
    fn invalid_entries_are_dropped() {
        let policy = OriginPolicy::new(vec!["".to_string(), "bad\norigin".to_string()]);
        assert!(policy.allowed_origins().is_empty());
        assert_eq!(policy.default_origin(), None);

        let mut headers = HeaderMap::new();
        policy.apply(Some("http://localhost:3000"), &mut headers);
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, Authorization");
    }
}
