//! Storage layer: per-district checkpoint partitions and pesi output artifacts.

mod atomic;
mod error;

pub mod checkpoint;
pub mod output;

pub use atomic::safe_component;
pub use checkpoint::{
    CheckpointEntry, CheckpointPartition, CheckpointStore, ScannedPartition, UnitStatus,
};
pub use error::StoreError;
pub use output::OutputWriter;
