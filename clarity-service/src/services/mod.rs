pub mod coercer;
pub mod generator;
pub mod metrics;
pub mod providers;
pub mod report;

pub use generator::{ClarityGenerator, FallbackReason, GenerationOutcome};
pub use metrics::{get_metrics, init_metrics};
pub use report::{ReportClient, ReportError};
