//! The clarity entry and the shapes derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four generated content fields, without identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarityContent {
    pub summary: String,
    pub feelings: Vec<String>,
    pub action_plan: Vec<String>,
    pub reflection_prompts: Vec<String>,
}

/// Content fields as recovered from a model completion. Any of them may be
/// missing; [`PartialContent::merge_over`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialContent {
    pub summary: Option<String>,
    pub feelings: Option<Vec<String>>,
    pub action_plan: Option<Vec<String>>,
    pub reflection_prompts: Option<Vec<String>>,
}

impl PartialContent {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.feelings.is_none()
            && self.action_plan.is_none()
            && self.reflection_prompts.is_none()
    }

    /// Take each present field, and the fallback's value for each absent one.
    pub fn merge_over(self, fallback: &ClarityContent) -> ClarityContent {
        ClarityContent {
            summary: self.summary.unwrap_or_else(|| fallback.summary.clone()),
            feelings: self.feelings.unwrap_or_else(|| fallback.feelings.clone()),
            action_plan: self
                .action_plan
                .unwrap_or_else(|| fallback.action_plan.clone()),
            reflection_prompts: self
                .reflection_prompts
                .unwrap_or_else(|| fallback.reflection_prompts.clone()),
        }
    }
}

/// A single generated response to a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarityEntry {
    pub id: Uuid,
    pub prompt: String,
    #[serde(flatten)]
    pub content: ClarityContent,
    pub created_at: DateTime<Utc>,
}

impl ClarityEntry {
    pub fn new(
        id: Uuid,
        prompt: impl Into<String>,
        content: ClarityContent,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            content,
            created_at,
        }
    }

    pub fn summary(&self) -> &str {
        &self.content.summary
    }
}

/// A clarity entry plus the `report` text shown to end users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarityReport {
    #[serde(flatten)]
    pub entry: ClarityEntry,
    pub report: String,
}

impl ClarityReport {
    /// The report is the summary, or `canned` when the summary is empty.
    pub fn from_entry(entry: ClarityEntry, canned: &str) -> Self {
        let report = if entry.summary().is_empty() {
            canned.to_string()
        } else {
            entry.summary().to_string()
        };
        Self { entry, report }
    }
}
