//! End-of-run tallies.

use std::fmt;

use pesi_core::{BsDate, District};
use pesi_store::UnitStatus;

/// A unit that ended the run as Failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUnit {
    pub district_code: String,
    pub district_name: String,
    pub date: BsDate,
    pub reason: String,
}

/// Counts of unit outcomes for one run. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Units already done in an earlier run and not attempted.
    pub skipped: usize,
    pub failures: Vec<FailedUnit>,
}

impl RunSummary {
    pub(crate) fn tally(&mut self, district: &District, date: BsDate, status: UnitStatus) {
        match status {
            UnitStatus::Completed => self.completed += 1,
            UnitStatus::NotFoundAtSource => self.not_found += 1,
            UnitStatus::Failed(reason) => self.fail(district, date, reason),
        }
    }

    pub(crate) fn fail(&mut self, district: &District, date: BsDate, reason: String) {
        self.failed += 1;
        self.failures.push(FailedUnit {
            district_code: district.code.clone(),
            district_name: district.name.clone(),
            date,
            reason,
        });
    }

    pub(crate) fn merge(&mut self, other: RunSummary) {
        self.completed += other.completed;
        self.not_found += other.not_found;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    /// Units fetched this run.
    pub fn attempted(&self) -> usize {
        self.completed + self.not_found + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {:<14} {}", "completed", self.completed)?;
        writeln!(f, "  {:<14} {}", "not found", self.not_found)?;
        writeln!(f, "  {:<14} {}", "failed", self.failed)?;
        writeln!(f, "  {:<14} {}", "skipped", self.skipped)?;

        if self.has_failures() {
            writeln!(f)?;
            writeln!(f, "Failed units (rerun to retry)")?;
            for u in &self.failures {
                writeln!(
                    f,
                    "  {:<4} {:<14} {}  {}",
                    u.district_code, u.district_name, u.date, u.reason
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn district() -> District {
        District {
            code: "02".into(),
            name: "Lalitpur".into(),
            identifier: "lalitpurdc".into(),
        }
    }

    #[test]
    fn tally_and_display() {
        let date: BsDate = "2081-01-01".parse().unwrap();
        let mut s = RunSummary::default();
        s.tally(&district(), date, UnitStatus::Completed);
        s.tally(&district(), date, UnitStatus::NotFoundAtSource);
        s.tally(&district(), date, UnitStatus::Failed("server returned 503".into()));
        s.skipped = 4;

        assert_eq!(s.attempted(), 3);
        assert!(s.has_failures());

        let text = s.to_string();
        assert!(text.contains("  completed      1\n"));
        assert!(text.contains("  skipped        4\n"));
        assert!(text.contains("Failed units (rerun to retry)"));
        assert!(text.contains("  02   Lalitpur       2081-01-01  server returned 503"));

        assert!(!RunSummary::default().to_string().contains("Failed units"));
    }

    #[test]
    fn merge_adds_counts_and_keeps_failure_order() {
        let d1: BsDate = "2081-01-02".parse().unwrap();
        let d2: BsDate = "2081-01-01".parse().unwrap();
        let mut a = RunSummary::default();
        a.fail(&district(), d1, "a".into());
        let mut b = RunSummary::default();
        b.fail(&district(), d2, "b".into());
        b.completed = 2;

        a.merge(b);
        assert_eq!(a.failed, 2);
        assert_eq!(a.completed, 2);
        let reasons: Vec<&str> = a.failures.iter().map(|f| f.reason.as_str()).collect();
        assert_eq!(reasons, vec!["a", "b"]);
    }
}
