//! Prompt-to-entry generation.
//!
//! [`ClarityGenerator::generate`] always returns a complete entry. Every
//! failure is absorbed by serving the fallback record, field by field when
//! the model answered partially. [`ClarityGenerator::try_generate`] exposes
//! which path was taken.

use super::coercer::coerce_json;
use super::metrics::record_generation;
use super::providers::gemini::{GeminiConfig, GeminiTextProvider};
use super::providers::{GenerationParams, ProviderError, TextProvider};
use crate::config::GeminiSettings;
use crate::models::fallback::fallback_content;
use crate::models::{ClarityContent, ClarityEntry};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.9;

const PREAMBLE: &str = "You are Clarity, a calm and compassionate reflection coach. \
The user will describe what is on their mind. Respond with a single JSON object and \
nothing else, using exactly these keys:
- \"summary\": two or three sentences that reflect back what the user is going through
- \"feelings\": an array of 3 to 6 short descriptions of feelings the user may be experiencing
- \"actionPlan\": an array of 4 to 6 concrete, ordered steps the user can take
- \"reflectionPrompts\": an array of 3 or 4 open questions for the user to journal on

Tone: warm, plain, and encouraging. Do not diagnose medical or mental health conditions, \
do not lecture, and keep every item to one sentence.

User's message:
";

/// Why an entry was built from the fallback record.
#[derive(Debug)]
pub enum FallbackReason {
    /// No API key is configured.
    MissingCredential,
    /// The upstream call failed.
    Upstream(ProviderError),
    /// The upstream answered without any text.
    EmptyCompletion,
    /// The completion held no JSON object.
    Unparseable,
}

impl FallbackReason {
    pub fn label(&self) -> &'static str {
        match self {
            FallbackReason::MissingCredential => "missing_credential",
            FallbackReason::Upstream(_) => "upstream_error",
            FallbackReason::EmptyCompletion => "empty_completion",
            FallbackReason::Unparseable => "unparseable",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::MissingCredential => write!(f, "no upstream credential configured"),
            FallbackReason::Upstream(e) => write!(f, "upstream error: {}", e),
            FallbackReason::EmptyCompletion => write!(f, "upstream returned an empty completion"),
            FallbackReason::Unparseable => write!(f, "completion contained no JSON object"),
        }
    }
}

/// How an entry was produced.
#[derive(Debug)]
pub enum GenerationOutcome {
    /// Built from a parsed completion (possibly merged with fallback fields).
    Live(ClarityEntry),
    /// Built entirely from the fallback record.
    Fallback {
        entry: ClarityEntry,
        reason: FallbackReason,
    },
}

impl GenerationOutcome {
    pub fn entry(&self) -> &ClarityEntry {
        match self {
            GenerationOutcome::Live(entry) => entry,
            GenerationOutcome::Fallback { entry, .. } => entry,
        }
    }

    pub fn into_entry(self) -> ClarityEntry {
        match self {
            GenerationOutcome::Live(entry) => entry,
            GenerationOutcome::Fallback { entry, .. } => entry,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            GenerationOutcome::Live(_) => None,
            GenerationOutcome::Fallback { reason, .. } => Some(reason),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            GenerationOutcome::Live(_) => "live",
            GenerationOutcome::Fallback { reason, .. } => reason.label(),
        }
    }
}

/// Turns prompts into clarity entries.
#[derive(Clone)]
pub struct ClarityGenerator {
    provider: Option<Arc<dyn TextProvider>>,
    fallback: Arc<ClarityContent>,
}

impl ClarityGenerator {
    /// `provider == None` serves every request from the fallback record.
    pub fn new(provider: Option<Arc<dyn TextProvider>>) -> Self {
        Self {
            provider,
            fallback: Arc::new(fallback_content()),
        }
    }

    /// Use Gemini when an API key is configured, fallback-only otherwise.
    pub fn from_settings(settings: &GeminiSettings) -> Self {
        let provider = GeminiConfig::from_settings(settings).map(|config| {
            tracing::info!(model = %config.model, "Initialized Gemini text provider");
            Arc::new(GeminiTextProvider::new(config)) as Arc<dyn TextProvider>
        });
        Self::new(provider)
    }

    pub fn is_live(&self) -> bool {
        self.provider.is_some()
    }

    pub fn fallback(&self) -> &ClarityContent {
        &self.fallback
    }

    /// Generate an entry, never failing.
    pub async fn generate(&self, prompt: &str) -> ClarityEntry {
        self.try_generate(prompt).await.into_entry()
    }

    /// Generate an entry and report whether the fallback record was used.
    #[tracing::instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn try_generate(&self, prompt: &str) -> GenerationOutcome {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        let outcome = match self.generate_content(prompt).await {
            Ok(content) => {
                GenerationOutcome::Live(ClarityEntry::new(id, prompt, content, created_at))
            }
            Err(reason) => GenerationOutcome::Fallback {
                entry: ClarityEntry::new(id, prompt, (*self.fallback).clone(), created_at),
                reason,
            },
        };

        record_generation(outcome.label());
        outcome
    }

    async fn generate_content(&self, prompt: &str) -> Result<ClarityContent, FallbackReason> {
        let Some(provider) = self.provider.as_ref() else {
            tracing::info!("No upstream credential configured, serving fallback entry");
            return Err(FallbackReason::MissingCredential);
        };

        let params = GenerationParams {
            temperature: Some(TEMPERATURE),
            top_p: Some(TOP_P),
            response_mime_type: Some("application/json".to_string()),
        };

        let response = provider
            .generate(&build_prompt(prompt), &params)
            .await
            .map_err(|e| {
                tracing::warn!(
                    provider = provider.name(),
                    error = %e,
                    kind = e.kind(),
                    "Upstream generation failed, serving fallback entry"
                );
                FallbackReason::Upstream(e)
            })?;

        let text = response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                tracing::warn!(
                    provider = provider.name(),
                    finish_reason = ?response.finish_reason,
                    "Upstream returned an empty completion, serving fallback entry"
                );
                FallbackReason::EmptyCompletion
            })?;

        let partial = coerce_json(Some(&text)).ok_or_else(|| {
            tracing::warn!(
                provider = provider.name(),
                completion_len = text.len(),
                "Could not parse completion, serving fallback entry"
            );
            FallbackReason::Unparseable
        })?;

        tracing::debug!(
            provider = provider.name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            has_summary = partial.summary.is_some(),
            has_feelings = partial.feelings.is_some(),
            has_action_plan = partial.action_plan.is_some(),
            has_reflection_prompts = partial.reflection_prompts.is_some(),
            "Generated clarity content"
        );

        Ok(partial.merge_over(&self.fallback))
    }
}

/// The full prompt sent upstream: fixed instructions, then the user's text.
pub fn build_prompt(prompt: &str) -> String {
    format!("{PREAMBLE}{prompt}")
}
