//! Analysis run orchestration: the run state machine, progress reporting,
//! share-of-voice aggregation, and the submit/poll/result service.

pub mod aggregate;
pub mod error;
pub mod flatten;
pub mod orchestrator;
pub mod service;
pub mod stages;
pub mod store;

pub use aggregate::{aggregate, percentage, recompute_results, Aggregates, ExposureSignal};
pub use error::PipelineError;
pub use flatten::flatten_sections;
pub use orchestrator::{Orchestrator, OrchestratorConfig, ProgressEvent, MAX_EXTRACT_CONCURRENCY};
pub use service::{RunProgress, RunReader, RunReport, RunService, SubmittedRun};
pub use stages::{Crawler, Extractor};
pub use store::{PgRunStore, RunStore};
