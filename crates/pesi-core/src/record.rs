//! Shared types for work units and extracted pesi records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::BsDate;

/// The atomic unit of checkpointing and retry: one district on one date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkUnit {
    pub district_code: String,
    pub date: BsDate,
}

impl WorkUnit {
    pub fn new(district_code: impl Into<String>, date: BsDate) -> Self {
        Self {
            district_code: district_code.into(),
            date,
        }
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.district_code, self.date)
    }
}

/// One case row from a district court's daily pesi list.
///
/// Field values are whitespace-normalised page text. Records for a unit are
/// kept in page order, which is the day's docket order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub district_code: String,
    pub hearing_date_bs: BsDate,
    /// Portal id of the bench that heard the case.
    pub bench_id: String,
    /// Bench number in ASCII digits.
    pub bench_no: String,
    /// Bench heading on the cause list, e.g. "एकल इजलास".
    pub bench_type: Option<String>,
    /// Judges sitting on the bench, as listed on the bench list.
    pub judge_names: Option<String>,
    pub serial_no: String,
    pub division: String,
    pub registration_date: String,
    pub case_type: String,
    pub case_number: String,
    pub plaintiff: String,
    pub defendant: String,
    pub lawyers: Option<String>,
    pub remarks: String,
    pub status: String,
    /// RFC 3339 timestamp on the Kathmandu clock.
    pub scraped_at: String,
}
