// Record pipeline: stages, the update reducer, orchestration and job storage

pub mod orchestrator;
pub mod processing;
pub mod storage;
pub mod update;

pub use orchestrator::{JobSummary, StageFailure, ValidationPipeline};
pub use update::{DirectoryDecision, RecordUpdate};
