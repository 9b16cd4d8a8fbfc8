//! Durable per-district record of which work units are done.
//!
//! Each district owns one partition file, `{root}/{code}.json`, holding one
//! entry per date that reached a terminal state. Partitions are loaded and
//! saved independently, so districts never contend for a shared lock; a
//! district's partition must only be written by the task driving that
//! district.
//!
//! Status transitions are one-way for successes: once a date is
//! `Completed` or `NotFoundAtSource`, later records for it are ignored.
//! `Failed` entries stay eligible for retry and are replaced by whatever the
//! retry produces.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pesi_core::calendar::now_rfc3339;
use pesi_core::{BsDate, WorkUnit};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::StoreError;
use crate::atomic::{safe_component, write_atomic};

/// Terminal outcome of a work unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    Completed,
    NotFoundAtSource,
    Failed(String),
}

impl UnitStatus {
    /// Completed and NotFoundAtSource are never retried.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Completed | Self::NotFoundAtSource)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StatusKind {
    Completed,
    NotFoundAtSource,
    Failed,
}

/// One persisted checkpoint line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub date: BsDate,
    status: StatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    /// RFC 3339 timestamp of when the entry was last written.
    pub recorded_at: String,
}

impl CheckpointEntry {
    fn new(date: BsDate, status: &UnitStatus) -> Self {
        let (status, detail) = match status {
            UnitStatus::Completed => (StatusKind::Completed, None),
            UnitStatus::NotFoundAtSource => (StatusKind::NotFoundAtSource, None),
            UnitStatus::Failed(reason) => (StatusKind::Failed, Some(reason.clone())),
        };
        Self {
            date,
            status,
            detail,
            recorded_at: now_rfc3339(),
        }
    }

    pub fn status(&self) -> UnitStatus {
        match self.status {
            StatusKind::Completed => UnitStatus::Completed,
            StatusKind::NotFoundAtSource => UnitStatus::NotFoundAtSource,
            StatusKind::Failed => UnitStatus::Failed(self.detail.clone().unwrap_or_default()),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PartitionFile {
    district_code: String,
    entries: Vec<CheckpointEntry>,
}

/// The checkpoint partition of a single district.
#[derive(Debug)]
pub struct CheckpointPartition {
    path: PathBuf,
    district_code: String,
    entries: BTreeMap<BsDate, CheckpointEntry>,
}

impl CheckpointPartition {
    /// Load the partition at `path`, or start an empty one if the file does
    /// not exist yet.
    fn load(path: PathBuf, district_code: &str) -> Result<Self, StoreError> {
        let entries = match fs::read(&path) {
            Ok(bytes) => {
                let file: PartitionFile =
                    serde_json::from_slice(&bytes).map_err(|source| {
                        StoreError::CorruptPartition {
                            path: path.clone(),
                            source,
                        }
                    })?;
                if file.district_code != district_code {
                    return Err(StoreError::PartitionMismatch {
                        path,
                        expected: district_code.to_string(),
                        found: file.district_code,
                    });
                }
                file.entries.into_iter().map(|e| (e.date, e)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        Ok(Self {
            path,
            district_code: district_code.to_string(),
            entries,
        })
    }

    pub fn district_code(&self) -> &str {
        &self.district_code
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if `date` is Completed or NotFoundAtSource.
    pub fn is_done(&self, date: &BsDate) -> bool {
        self.entries
            .get(date)
            .is_some_and(|e| e.status().is_done())
    }

    pub fn get(&self, date: &BsDate) -> Option<&CheckpointEntry> {
        self.entries.get(date)
    }

    /// Dates from `dates` that still need work, in input order.
    pub fn pending(&self, dates: &[BsDate]) -> Vec<BsDate> {
        dates.iter().filter(|d| !self.is_done(d)).copied().collect()
    }

    /// Record a terminal status for `date` and persist the partition.
    ///
    /// Returns `false` without touching disk when the entry is already done
    /// or already holds exactly this status.
    pub fn record(&mut self, date: BsDate, status: UnitStatus) -> Result<bool, StoreError> {
        if let Some(existing) = self.entries.get(&date) {
            let current = existing.status();
            if current.is_done() || current == status {
                debug!(
                    district = %self.district_code,
                    date = %date,
                    ?current,
                    "checkpoint already recorded"
                );
                return Ok(false);
            }
        }

        self.entries.insert(date, CheckpointEntry::new(date, &status));
        self.save()?;
        Ok(true)
    }

    /// All entries, oldest date first.
    pub fn entries(&self) -> impl Iterator<Item = &CheckpointEntry> {
        self.entries.values()
    }

    /// Entries currently marked Failed.
    pub fn failed(&self) -> impl Iterator<Item = &CheckpointEntry> {
        self.entries
            .values()
            .filter(|e| e.status == StatusKind::Failed)
    }

    fn save(&self) -> Result<(), StoreError> {
        let file = PartitionFile {
            district_code: self.district_code.clone(),
            entries: self.entries.values().cloned().collect(),
        };
        let json = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.path, &json)
    }
}

/// Root of all checkpoint partitions.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    /// Open (creating if needed) the checkpoint directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_path(&self, district_code: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", safe_component(district_code)))
    }

    /// Load one district's partition.
    pub fn partition(&self, district_code: &str) -> Result<CheckpointPartition, StoreError> {
        CheckpointPartition::load(self.partition_path(district_code), district_code)
    }

    pub fn is_done(&self, unit: &WorkUnit) -> Result<bool, StoreError> {
        Ok(self.partition(&unit.district_code)?.is_done(&unit.date))
    }

    pub fn record(&self, unit: &WorkUnit, status: UnitStatus) -> Result<bool, StoreError> {
        self.partition(&unit.district_code)?.record(unit.date, status)
    }

    /// Units that still need work, in input order.
    ///
    /// Each distinct district's partition is read once.
    pub fn pending(&self, units: &[WorkUnit]) -> Result<Vec<WorkUnit>, StoreError> {
        let mut partitions: BTreeMap<&str, CheckpointPartition> = BTreeMap::new();
        let mut pending = Vec::with_capacity(units.len());
        for unit in units {
            let code = unit.district_code.as_str();
            if !partitions.contains_key(code) {
                partitions.insert(code, self.partition(code)?);
            }
            if !partitions[code].is_done(&unit.date) {
                pending.push(unit.clone());
            }
        }
        Ok(pending)
    }

    /// Every partition file on disk, ordered by file name.
    ///
    /// A file that cannot be read or parsed is returned as an `Err` entry
    /// beside the others; only failing to list the directory is fatal.
    pub fn partitions(&self) -> Result<Vec<ScannedPartition>, StoreError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))? {
            let path = entry.map_err(|e| StoreError::io(&self.root, e))?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let partition = self.load_file(&path);
                if let Err(e) = &partition {
                    warn!(partition = %name, error = %e, "skipping unreadable checkpoint partition");
                }
                ScannedPartition { name, partition }
            })
            .collect())
    }

    fn load_file(&self, path: &Path) -> Result<CheckpointPartition, StoreError> {
        let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let file: PartitionFile =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::CorruptPartition {
                path: path.to_path_buf(),
                source,
            })?;
        self.partition(&file.district_code)
    }
}

/// One partition file found by [`CheckpointStore::partitions`].
#[derive(Debug)]
pub struct ScannedPartition {
    /// File stem, which is the district code for well-formed files.
    pub name: String,
    pub partition: Result<CheckpointPartition, StoreError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bs(s: &str) -> BsDate {
        s.parse().unwrap()
    }

    fn make_store() -> (tempfile::TempDir, CheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("checkpoints")).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_partition_has_nothing_done() {
        let (_dir, store) = make_store();
        let part = store.partition("01").unwrap();
        assert!(!part.is_done(&bs("2081-01-01")));
        assert_eq!(part.entries().count(), 0);
        assert!(!part.path().exists());
    }

    #[test]
    fn completed_and_not_found_are_done_failed_is_not() {
        let (_dir, store) = make_store();
        let mut part = store.partition("01").unwrap();
        part.record(bs("2081-01-01"), UnitStatus::Completed).unwrap();
        part.record(bs("2081-01-02"), UnitStatus::NotFoundAtSource)
            .unwrap();
        part.record(bs("2081-01-03"), UnitStatus::Failed("timeout".into()))
            .unwrap();

        assert!(part.is_done(&bs("2081-01-01")));
        assert!(part.is_done(&bs("2081-01-02")));
        assert!(!part.is_done(&bs("2081-01-03")));
        assert_eq!(part.failed().count(), 1);
    }

    #[test]
    fn survives_reopen() {
        let (_dir, store) = make_store();
        let mut part = store.partition("01").unwrap();
        part.record(bs("2081-01-01"), UnitStatus::Completed).unwrap();
        part.record(bs("2081-01-02"), UnitStatus::Failed("HTTP 503".into()))
            .unwrap();
        drop(part);

        let reopened = store.partition("01").unwrap();
        assert!(reopened.is_done(&bs("2081-01-01")));
        assert_eq!(
            reopened.get(&bs("2081-01-02")).unwrap().status(),
            UnitStatus::Failed("HTTP 503".into())
        );
    }

    #[test]
    fn done_entries_are_never_overwritten() {
        let (_dir, store) = make_store();
        let mut part = store.partition("01").unwrap();
        assert!(part.record(bs("2081-01-01"), UnitStatus::Completed).unwrap());
        let recorded_at = part.get(&bs("2081-01-01")).unwrap().recorded_at.clone();

        assert!(!part
            .record(bs("2081-01-01"), UnitStatus::Failed("late failure".into()))
            .unwrap());
        assert!(!part
            .record(bs("2081-01-01"), UnitStatus::NotFoundAtSource)
            .unwrap());

        let entry = part.get(&bs("2081-01-01")).unwrap();
        assert_eq!(entry.status(), UnitStatus::Completed);
        assert_eq!(entry.recorded_at, recorded_at);
    }

    #[test]
    fn recording_same_status_twice_is_a_noop() {
        let (_dir, store) = make_store();
        let mut part = store.partition("01").unwrap();
        let failed = UnitStatus::Failed("timeout".into());
        assert!(part.record(bs("2081-01-01"), failed.clone()).unwrap());
        assert!(!part.record(bs("2081-01-01"), failed).unwrap());
    }

    #[test]
    fn failed_entry_can_be_upgraded() {
        let (_dir, store) = make_store();
        let mut part = store.partition("01").unwrap();
        part.record(bs("2081-01-01"), UnitStatus::Failed("timeout".into()))
            .unwrap();
        assert!(part.record(bs("2081-01-01"), UnitStatus::Completed).unwrap());
        assert!(part.is_done(&bs("2081-01-01")));
        assert_eq!(part.failed().count(), 0);
    }

    #[test]
    fn pending_preserves_input_order() {
        let (_dir, store) = make_store();
        store
            .record(&WorkUnit::new("01", bs("2081-01-02")), UnitStatus::Completed)
            .unwrap();
        store
            .record(
                &WorkUnit::new("02", bs("2081-01-01")),
                UnitStatus::Failed("x".into()),
            )
            .unwrap();

        let units = vec![
            WorkUnit::new("01", bs("2081-01-03")),
            WorkUnit::new("01", bs("2081-01-02")),
            WorkUnit::new("02", bs("2081-01-01")),
            WorkUnit::new("01", bs("2081-01-01")),
        ];
        let pending = store.pending(&units).unwrap();
        assert_eq!(
            pending,
            vec![units[0].clone(), units[2].clone(), units[3].clone()]
        );
    }

    #[test]
    fn store_level_is_done_reads_partition() {
        let (_dir, store) = make_store();
        let unit = WorkUnit::new("01", bs("2081-01-01"));
        assert!(!store.is_done(&unit).unwrap());
        store.record(&unit, UnitStatus::NotFoundAtSource).unwrap();
        assert!(store.is_done(&unit).unwrap());
    }

    #[test]
    fn partitions_are_independent_files() {
        let (_dir, store) = make_store();
        store
            .record(&WorkUnit::new("01", bs("2081-01-01")), UnitStatus::Completed)
            .unwrap();
        store
            .record(&WorkUnit::new("02", bs("2081-01-01")), UnitStatus::Completed)
            .unwrap();

        assert!(store.root().join("01.json").exists());
        assert!(store.root().join("02.json").exists());

        let codes: Vec<String> = store
            .partitions()
            .unwrap()
            .into_iter()
            .map(|p| p.partition.unwrap().district_code().to_string())
            .collect();
        assert_eq!(codes, vec!["01", "02"]);
    }

    #[test]
    fn corrupt_file_does_not_hide_other_partitions() {
        let (_dir, store) = make_store();
        store
            .record(&WorkUnit::new("01", bs("2081-01-01")), UnitStatus::Completed)
            .unwrap();
        store
            .record(&WorkUnit::new("03", bs("2081-01-01")), UnitStatus::Completed)
            .unwrap();
        fs::write(store.root().join("02.json"), b"{ truncated").unwrap();

        let scanned = store.partitions().unwrap();
        let names: Vec<&str> = scanned.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["01", "02", "03"]);
        assert!(scanned[0].partition.is_ok());
        assert!(matches!(
            scanned[1].partition,
            Err(StoreError::CorruptPartition { .. })
        ));
        assert!(scanned[2].partition.is_ok());
    }

    #[test]
    fn corrupt_partition_is_reported() {
        let (_dir, store) = make_store();
        fs::write(store.root().join("01.json"), b"{ not json").unwrap();
        let err = store.partition("01").unwrap_err();
        assert!(matches!(err, StoreError::CorruptPartition { .. }));
    }

    #[test]
    fn partition_for_other_district_is_rejected() {
        let (_dir, store) = make_store();
        store
            .record(&WorkUnit::new("01", bs("2081-01-01")), UnitStatus::Completed)
            .unwrap();
        fs::copy(store.root().join("01.json"), store.root().join("02.json")).unwrap();
        let err = store.partition("02").unwrap_err();
        assert!(matches!(err, StoreError::PartitionMismatch { .. }));
    }

    #[test]
    fn on_disk_format() {
        let (_dir, store) = make_store();
        store
            .record(
                &WorkUnit::new("01", bs("2081-01-01")),
                UnitStatus::Failed("server returned 503".into()),
            )
            .unwrap();
        let raw = fs::read_to_string(store.root().join("01.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["district_code"], "01");
        let entry = &value["entries"][0];
        assert_eq!(entry["date"], "2081-01-01");
        assert_eq!(entry["status"], "failed");
        assert_eq!(entry["detail"], "server returned 503");
        assert!(entry["recorded_at"].is_string());
    }
}
