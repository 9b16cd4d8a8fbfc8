//! Run orchestration: resolves the (district, date) universe, drives each
//! unit through fetch, extract and write, and checkpoints every outcome.

mod orchestrator;
mod plan;
mod summary;

pub use orchestrator::RunOrchestrator;
pub use plan::RunPlan;
pub use summary::{FailedUnit, RunSummary};
