//! Report client: a prompt in, a [`ClarityReport`] out.
//!
//! With an API base URL configured the client calls a deployed clarity
//! endpoint; otherwise it generates in-process.

use super::generator::ClarityGenerator;
use crate::config::ClientSettings;
use crate::handlers::DIAGNOSIS_PATH;
use crate::models::fallback::FALLBACK_REPORT;
use crate::models::{ClarityEntry, ClarityReport};
use reqwest::Client;
use serde_json::json;
use service_core::observability::TracedClientExt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReportError {
    /// The endpoint answered with a non-success status.
    #[error("Clarity API error {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("Failed to reach clarity API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected clarity API response: {0}")]
    Decode(String),
}

enum Mode {
    Remote { client: Client, endpoint: String },
    Local(ClarityGenerator),
}

pub struct ReportClient {
    mode: Mode,
}

impl ReportClient {
    /// Call the endpoint under `base_url`, e.g. `https://clarity.example.com`.
    pub fn remote(base_url: &str) -> Self {
        Self {
            mode: Mode::Remote {
                client: Client::new(),
                endpoint: format!("{}{}", base_url.trim_end_matches('/'), DIAGNOSIS_PATH),
            },
        }
    }

    pub fn local(generator: ClarityGenerator) -> Self {
        Self {
            mode: Mode::Local(generator),
        }
    }

    /// Remote when `settings.api_base_url` is set, otherwise local with `generator`.
    pub fn from_settings(settings: &ClientSettings, generator: ClarityGenerator) -> Self {
        match settings.api_base_url.as_deref() {
            Some(base_url) => Self::remote(base_url),
            None => Self::local(generator),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.mode, Mode::Remote { .. })
    }

    pub async fn generate_report(&self, prompt: &str) -> Result<ClarityReport, ReportError> {
        let entry = match &self.mode {
            Mode::Remote { client, endpoint } => fetch_entry(client, endpoint, prompt).await?,
            Mode::Local(generator) => generator.generate(prompt).await,
        };

        Ok(ClarityReport::from_entry(entry, FALLBACK_REPORT))
    }
}

async fn fetch_entry(
    client: &Client,
    endpoint: &str,
    prompt: &str,
) -> Result<ClarityEntry, ReportError> {
    let request_id = Uuid::new_v4().to_string();
    tracing::debug!(%endpoint, %request_id, "Requesting clarity entry");

    let response = client
        .traced_post(endpoint)
        .json(&json!({ "prompt": prompt }))
        .send_with_request_id(&request_id)
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), %request_id, "Clarity API returned an error");
        return Err(ReportError::Endpoint {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| ReportError::Decode(e.to_string()))
}
