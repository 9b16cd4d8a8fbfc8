//! Drives every work unit through fetch, extract, write and checkpoint.
//!
//! Per unit:
//!
//! ```text
//! Pending ─ done in checkpoint ──────────────────────────────▶ skipped
//!    │
//!    ▼
//! bench list ─ TransportError ───────────────────────────────▶ Failed
//!    ├──────── NotFound, or no benches listed ───────────────▶ NotFoundAtSource
//!    ├──────── ExtractError ─────────────────────────────────▶ Failed
//!    ▼
//! cause list per bench ─ TransportError / ExtractError ──────▶ Failed
//!    ▼
//! write all benches' cases ─ WriteError ─────────────────────▶ Failed
//!    ▼
//! artifact on disk ──────────────────────────────────────────▶ Completed
//! ```
//!
//! A unit is Completed only when every bench's cause list was fetched and
//! parsed. The checkpoint entry is recorded only after the unit's outcome is
//! final, so a unit is never marked Completed before its artifact exists.

use futures::StreamExt;
use pesi_core::{BsDate, District};
use pesi_fetch::{FetchOutcome, PageSource, RecordExtractor};
use pesi_store::{CheckpointStore, OutputWriter, UnitStatus};
use tracing::{debug, error, info, warn};

use crate::RunSummary;

/// Composes a page source, extractor, checkpoint store and output writer.
pub struct RunOrchestrator<S> {
    source: S,
    extractor: RecordExtractor,
    checkpoints: CheckpointStore,
    output: OutputWriter,
    concurrency: usize,
}

impl<S: PageSource> RunOrchestrator<S> {
    pub fn new(
        source: S,
        extractor: RecordExtractor,
        checkpoints: CheckpointStore,
        output: OutputWriter,
    ) -> Self {
        Self {
            source,
            extractor,
            checkpoints,
            output,
            concurrency: 1,
        }
    }

    /// Number of districts processed at once. Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Process every (district, date) pair not already done.
    ///
    /// Per-unit failures never abort the run. Failures in the summary are in
    /// district order, then date order as given.
    pub async fn run(&self, districts: &[District], dates: &[BsDate]) -> RunSummary {
        info!(
            districts = districts.len(),
            days = dates.len(),
            concurrency = self.concurrency,
            "starting run"
        );

        let mut partials: Vec<(usize, RunSummary)> =
            futures::stream::iter(districts.iter().enumerate())
                .map(|(idx, district)| async move {
                    (idx, self.run_district(district, dates).await)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        partials.sort_by_key(|(idx, _)| *idx);

        let mut summary = RunSummary::default();
        for (_, partial) in partials {
            summary.merge(partial);
        }

        info!(
            completed = summary.completed,
            not_found = summary.not_found,
            failed = summary.failed,
            skipped = summary.skipped,
            "run finished"
        );
        summary
    }

    /// Dates within one district run sequentially; this task is the only
    /// writer of the district's partition and output directory.
    async fn run_district(&self, district: &District, dates: &[BsDate]) -> RunSummary {
        let mut summary = RunSummary::default();

        let mut partition = match self.checkpoints.partition(&district.code) {
            Ok(p) => p,
            Err(e) => {
                error!(district = %district.code, error = %e, "checkpoint partition unavailable");
                let reason = format!("checkpoint unavailable: {e}");
                for date in dates {
                    summary.fail(district, *date, reason.clone());
                }
                return summary;
            }
        };

        let pending = partition.pending(dates);
        summary.skipped = dates.len() - pending.len();
        if summary.skipped > 0 {
            debug!(
                district = %district.code,
                skipped = summary.skipped,
                "skipping units already done"
            );
        }

        for date in pending {
            let status = self.process_unit(district, &date).await;
            match partition.record(date, status.clone()) {
                Ok(_) => summary.tally(district, date, status),
                Err(e) => {
                    error!(
                        district = %district.code,
                        date = %date,
                        error = %e,
                        "failed to record checkpoint"
                    );
                    summary.fail(district, date, format!("checkpoint write failed: {e}"));
                }
            }
        }
        summary
    }

    async fn process_unit(&self, district: &District, date: &BsDate) -> UnitStatus {
        let listing = match self.source.fetch(district, date).await {
            FetchOutcome::Found(body) => body,
            FetchOutcome::NotFound => {
                info!(district = %district.code, date = %date, "no pesi at source");
                return UnitStatus::NotFoundAtSource;
            }
            FetchOutcome::TransportError(detail) => {
                warn!(district = %district.code, date = %date, reason = %detail, "fetch failed");
                return UnitStatus::Failed(detail);
            }
        };

        let benches = match self.extractor.benches(&listing) {
            Ok(benches) => benches,
            Err(e) => {
                warn!(district = %district.code, date = %date, reason = %e, "bench list unreadable");
                return UnitStatus::Failed(format!("bench list: {e}"));
            }
        };
        if benches.is_empty() {
            info!(district = %district.code, date = %date, "bench list has no benches");
            return UnitStatus::NotFoundAtSource;
        }

        let mut records = Vec::new();
        for bench in &benches {
            let page = match self.source.fetch_bench(district, date, bench).await {
                FetchOutcome::Found(body) => body,
                FetchOutcome::NotFound => {
                    debug!(
                        district = %district.code,
                        date = %date,
                        bench = %bench.id,
                        "bench has no cases"
                    );
                    continue;
                }
                FetchOutcome::TransportError(detail) => {
                    warn!(
                        district = %district.code,
                        date = %date,
                        bench = %bench.id,
                        reason = %detail,
                        "cause list fetch failed"
                    );
                    return UnitStatus::Failed(format!("bench {}: {detail}", bench.id));
                }
            };
            match self.extractor.extract(&district.code, date, bench, &page) {
                Ok(cases) => records.extend(cases),
                Err(e) => {
                    warn!(
                        district = %district.code,
                        date = %date,
                        bench = %bench.id,
                        reason = %e,
                        "extraction failed"
                    );
                    return UnitStatus::Failed(format!("bench {}: {e}", bench.id));
                }
            }
        }

        match self.output.write(district, date, &records) {
            Ok(_) => {
                info!(
                    district = %district.code,
                    date = %date,
                    benches = benches.len(),
                    records = records.len(),
                    "unit completed"
                );
                UnitStatus::Completed
            }
            Err(e) => {
                warn!(district = %district.code, date = %date, reason = %e, "write failed");
                UnitStatus::Failed(format!("write failed: {e}"))
            }
        }
    }
}
