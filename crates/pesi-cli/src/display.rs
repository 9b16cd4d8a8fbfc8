//! Terminal rendering for run summaries and checkpoint status.

use std::fmt::{self, Write};

use pesi_runner::{RunPlan, RunSummary};
use pesi_store::{CheckpointPartition, ScannedPartition, UnitStatus};

// ── Run summary ──

/// Print the end-of-run report.
pub fn print_summary(plan: &RunPlan, summary: &RunSummary) -> fmt::Result {
    let mut out = String::new();
    write_summary(&mut out, plan, summary)?;
    print!("{out}");
    Ok(())
}

pub fn write_summary<W: Write>(out: &mut W, plan: &RunPlan, summary: &RunSummary) -> fmt::Result {
    writeln!(out, "=== pesi run ===")?;
    let range = match (plan.dates.last(), plan.dates.first()) {
        (Some(oldest), Some(newest)) => format!("{oldest} .. {newest}"),
        _ => "(none)".to_string(),
    };
    writeln!(out, "  {:<14} {}", "districts", plan.districts.len())?;
    writeln!(out, "  {:<14} {}", "dates", range)?;
    writeln!(out, "  {:<14} {}", "units", plan.len())?;
    write!(out, "{summary}")
}

// ── Checkpoint status ──

/// Print one line per partition, plus failed entries when `show_failed`.
pub fn print_status(partitions: &[ScannedPartition], show_failed: bool) -> fmt::Result {
    let mut out = String::new();
    write_status(&mut out, partitions, show_failed)?;
    print!("{out}");
    Ok(())
}

/// Unreadable partitions get a row of their own and do not stop the listing.
pub fn write_status<W: Write>(
    out: &mut W,
    partitions: &[ScannedPartition],
    show_failed: bool,
) -> fmt::Result {
    if partitions.is_empty() {
        return writeln!(out, "no checkpoints recorded");
    }

    writeln!(
        out,
        "{:<8} {:>9} {:>9} {:>6}  {}",
        "district", "completed", "not found", "failed", "latest"
    )?;
    for scanned in partitions {
        match &scanned.partition {
            Ok(p) => write_partition(out, p, show_failed)?,
            Err(e) => writeln!(out, "{:<8} unreadable: {e}", scanned.name)?,
        }
    }
    Ok(())
}

fn write_partition<W: Write>(
    out: &mut W,
    p: &CheckpointPartition,
    show_failed: bool,
) -> fmt::Result {
    let (mut completed, mut not_found, mut failed) = (0usize, 0usize, 0usize);
    for e in p.entries() {
        match e.status() {
            UnitStatus::Completed => completed += 1,
            UnitStatus::NotFoundAtSource => not_found += 1,
            UnitStatus::Failed(_) => failed += 1,
        }
    }
    let latest = p
        .entries()
        .last()
        .map(|e| e.date.to_string())
        .unwrap_or_else(|| "-".to_string());
    writeln!(
        out,
        "{:<8} {:>9} {:>9} {:>6}  {}",
        p.district_code(),
        completed,
        not_found,
        failed,
        latest
    )?;

    if show_failed {
        for e in p.failed() {
            if let UnitStatus::Failed(reason) = e.status() {
                writeln!(out, "    {}  {}  ({})", e.date, reason, e.recorded_at)?;
            }
        }
    }
    Ok(())
}
