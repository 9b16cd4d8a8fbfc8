//! Run configuration shared by the runner and the CLI.

use std::path::PathBuf;
use std::time::Duration;

use crate::CoreError;

/// Trailing window used by debug runs.
pub const DEBUG_WINDOW_SIZE: u32 = 5;

pub const DEFAULT_BASE_URL: &str = "https://supremecourt.gov.np/court";
pub const DEFAULT_REGISTRY: &str = "data/district_courts.json";
pub const DEFAULT_OUTPUT_ROOT: &str = "output";
pub const DEFAULT_CHECKPOINT_ROOT: &str = "output/court-cases/.checkpoints";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Production,
    /// One district, [`DEBUG_WINDOW_SIZE`] trailing days.
    Debug,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    /// Number of trailing days requested per district.
    pub window_size: u32,
    /// Days between today and the newest requested date.
    pub offset_days: u32,
    pub registry_path: PathBuf,
    pub base_url: String,
    pub output_root: PathBuf,
    pub checkpoint_root: PathBuf,
    pub request_timeout: Duration,
    /// Districts processed in parallel. Dates within a district never are.
    pub concurrency: usize,
    /// Restrict the run to these district codes; empty means all.
    pub districts: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Production,
            window_size: 30,
            offset_days: 2,
            registry_path: PathBuf::from(DEFAULT_REGISTRY),
            base_url: DEFAULT_BASE_URL.to_string(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            checkpoint_root: PathBuf::from(DEFAULT_CHECKPOINT_ROOT),
            request_timeout: Duration::from_secs(30),
            concurrency: 1,
            districts: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Window size after applying the run mode.
    pub fn effective_window(&self) -> u32 {
        match self.mode {
            RunMode::Production => self.window_size,
            RunMode::Debug => self.window_size.min(DEBUG_WINDOW_SIZE),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.window_size == 0 {
            return Err(CoreError::Config("window size must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(CoreError::Config("concurrency must be at least 1".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(CoreError::Config("request timeout must be non-zero".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(CoreError::Config("base url must not be empty".into()));
        }
        Ok(())
    }
}
