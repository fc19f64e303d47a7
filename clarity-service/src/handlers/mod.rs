//! HTTP handlers for the clarity service.

pub mod diagnosis;
pub mod health;

/// Route of the prompt-to-entry endpoint.
pub const DIAGNOSIS_PATH: &str = "/api/diagnosis";
