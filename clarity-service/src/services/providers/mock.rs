//! Scripted provider for tests and local runs without network access.

use super::{FinishReason, GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What the scripted provider answers with.
#[derive(Debug, Clone)]
pub enum Script {
    /// Return this completion text (`None` = no text part).
    Completion(Option<String>),
    /// Fail with an upstream error of this status.
    ApiError(u16),
    /// Fail at the transport level.
    NetworkError,
}

/// Replays a fixed [`Script`] and records what it was asked.
pub struct ScriptedTextProvider {
    script: Script,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedTextProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl TextProvider for ScriptedTextProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        match &self.script {
            Script::Completion(text) => Ok(ProviderResponse {
                text: text.clone(),
                input_tokens: prompt.len() as i32 / 4,
                output_tokens: text.as_ref().map_or(0, |t| t.len() as i32 / 4),
                finish_reason: FinishReason::Complete,
            }),
            Script::ApiError(status) => Err(ProviderError::Api {
                status: *status,
                body: "scripted failure".to_string(),
            }),
            Script::NetworkError => Err(ProviderError::Network(
                "scripted connection reset".to_string(),
            )),
        }
    }
}
