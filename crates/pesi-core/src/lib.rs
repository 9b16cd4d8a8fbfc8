pub mod calendar;
pub mod config;
pub mod error;
pub mod record;
pub mod registry;
pub mod text;

pub use calendar::BsDate;
pub use config::{RunConfig, RunMode};
pub use error::CoreError;
pub use record::{CaseRecord, WorkUnit};
pub use registry::{District, DistrictRegistry};
