//! Domain models for the clarity service.

pub mod entry;
pub mod fallback;

pub use entry::{ClarityContent, ClarityEntry, ClarityReport, PartialContent};
