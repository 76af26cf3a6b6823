// Pipeline processing: the four per-record stages, run in this order

pub mod enrich;
pub mod validate;
pub mod quality_gate;
pub mod directory;

use async_trait::async_trait;

use crate::domain::ProviderRecord;
use crate::pipeline::update::RecordUpdate;

pub use directory::DirectoryStage;
pub use enrich::EnrichmentStage;
pub use quality_gate::{QualityGateConfig, QualityGateStage};
pub use validate::ValidationStage;

/// One step of the per-record pipeline.
///
/// A stage reads the current view of a record and describes the changes it
/// wants as a [`RecordUpdate`]; it never mutates the record itself.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, record: &ProviderRecord) -> anyhow::Result<RecordUpdate>;
}
