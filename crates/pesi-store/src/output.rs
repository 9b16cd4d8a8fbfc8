//! Per-district pesi artifacts.
//!
//! Layout: `{output_root}/court-cases/{code}_{name}/{yyyy-mm-dd}.json`, one
//! pretty-printed JSON array of [`CaseRecord`]s per (district, date). A
//! retried unit replaces its artifact wholesale, so records never duplicate.

use std::fs;
use std::path::{Path, PathBuf};

use pesi_core::{BsDate, CaseRecord, District};
use tracing::info;

use crate::StoreError;
use crate::atomic::{safe_component, write_atomic};

pub const COURT_CASES_DIR: &str = "court-cases";

#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    /// Writer rooted at `{output_root}/court-cases`.
    pub fn new(output_root: impl AsRef<Path>) -> Self {
        Self {
            root: output_root.as_ref().join(COURT_CASES_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn district_dir(&self, district: &District) -> PathBuf {
        self.root.join(safe_component(&district.output_dir_name()))
    }

    pub fn artifact_path(&self, district: &District, date: &BsDate) -> PathBuf {
        self.district_dir(district).join(format!("{date}.json"))
    }

    /// Write (or replace) the artifact for `district` on `date`.
    ///
    /// An empty `records` slice still produces a file containing `[]`: a
    /// listing with no cases is a result, not an absence.
    pub fn write(
        &self,
        district: &District,
        date: &BsDate,
        records: &[CaseRecord],
    ) -> Result<PathBuf, StoreError> {
        let path = self.artifact_path(district, date);
        let json = serde_json::to_vec_pretty(records)?;
        write_atomic(&path, &json)?;
        info!(
            district = %district.code,
            date = %date,
            records = records.len(),
            path = %path.display(),
            "wrote pesi artifact"
        );
        Ok(path)
    }

    /// Read back an artifact, or `None` if it was never written.
    pub fn read(
        &self,
        district: &District,
        date: &BsDate,
    ) -> Result<Option<Vec<CaseRecord>>, StoreError> {
        let path = self.artifact_path(district, date);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}
