//! Bench and case-record extraction from pesi pages.
//!
//! # Page shapes
//!
//! A day's listing comes in two stages.
//!
//! **Bench list** (`bench_list`): one `table.table-striped.table-bordered.table-hover`
//! with a row per bench sitting that day. Each bench row carries
//! `onclick="send_data('<bench_id>', '<bench_no>', '<yyyymmdd>')"`; the
//! second cell names the judges. A `जम्माः` totals row closes the table.
//!
//! **Cause list** (`cause_list_detail`, one per bench): an `<h4>` bench
//! heading containing "इजलास" and a `table.table-bordered.table-hover` whose
//! case rows are `tr.data_row` with at least nine cells:
//!
//! | cell | content |
//! |------|---------|
//! | 0 | serial number |
//! | 1 | division |
//! | 2 | registration date |
//! | 3 | case type |
//! | 4 | case number, possibly with a parenthesised old number |
//! | 5 | parties as `plaintiff \|\| defendant` |
//! | 6 | lawyers, `--` when none |
//! | 7 | remarks |
//! | 8 | status |
//!
//! A page missing its table is a layout mismatch and an error. A bench
//! table with no bench rows means nothing is scheduled; a case table with
//! no data rows is a bench with no cases.

use pesi_core::calendar::now_rfc3339;
use pesi_core::text::{
    clean_case_number, devanagari_to_ascii_digits, normalize_date, normalize_whitespace,
};
use pesi_core::{BsDate, CaseRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

const BENCH_MARKER: &str = "इजलास";
const TOTALS_MARKER: &str = "जम्माः";
const MIN_CELLS: usize = 9;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("page layout not recognised: {0}")]
    Layout(String),
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// A bench sitting on the day, as listed on the bench list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bench {
    pub id: String,
    /// Bench number as the portal passes it back, possibly in Devanagari digits.
    pub number: String,
    pub judges: String,
}

/// Parses bench lists into [`Bench`]es and cause lists into [`CaseRecord`]s.
pub struct RecordExtractor {
    bench_table: Selector,
    case_table: Selector,
    heading: Selector,
    row: Selector,
    data_row: Selector,
    cell: Selector,
    send_data: Regex,
}

impl RecordExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            bench_table: selector("table.table-striped.table-bordered.table-hover")?,
            case_table: selector("table.table-bordered.table-hover:not(.table-striped)")?,
            heading: selector("h4")?,
            row: selector("tr")?,
            data_row: selector("tr.data_row")?,
            cell: selector("td")?,
            send_data: Regex::new(r"send_data\('(\d+)',\s*'([^']+)',\s*'(\d+)'\)")?,
        })
    }

    /// Benches listed on a bench-list page, in page order.
    ///
    /// An empty result means the table lists no benches for the day.
    pub fn benches(&self, html: &str) -> Result<Vec<Bench>, ExtractError> {
        let doc = Html::parse_document(html);
        let Some(table) = doc.select(&self.bench_table).next() else {
            return Err(ExtractError::Layout(
                "no bench table (table.table-striped) on bench list".into(),
            ));
        };

        let mut benches = Vec::new();
        let mut unlinked = 0usize;
        for row in table.select(&self.row) {
            if element_text(row).contains(TOTALS_MARKER) {
                continue;
            }
            let cells: Vec<ElementRef> = row.select(&self.cell).collect();
            if cells.len() < 2 {
                continue;
            }
            let onclick = row.value().attr("onclick").unwrap_or_default();
            let Some(caps) = self.send_data.captures(onclick) else {
                unlinked += 1;
                continue;
            };
            benches.push(Bench {
                id: caps[1].to_string(),
                number: caps[2].to_string(),
                judges: element_text(cells[1]),
            });
        }

        if benches.is_empty() && unlinked > 0 {
            return Err(ExtractError::Layout(format!(
                "{unlinked} bench rows but none links to a cause list"
            )));
        }
        debug!(benches = benches.len(), "parsed bench list");
        Ok(benches)
    }

    /// Case rows from one bench's cause-list page, in page order.
    pub fn extract(
        &self,
        district_code: &str,
        date: &BsDate,
        bench: &Bench,
        html: &str,
    ) -> Result<Vec<CaseRecord>, ExtractError> {
        let doc = Html::parse_document(html);
        let scraped_at = now_rfc3339();

        let bench_type = doc
            .select(&self.heading)
            .map(element_text)
            .find(|t| t.contains(BENCH_MARKER));
        let Some(table) = doc.select(&self.case_table).next() else {
            return Err(ExtractError::Layout(format!(
                "no case table (table.table-bordered.table-hover) on cause list for bench {}",
                bench.number
            )));
        };

        let bench_no = devanagari_to_ascii_digits(&bench.number);
        let judge_names = (!bench.judges.is_empty()).then(|| bench.judges.clone());

        let mut rows_seen = 0usize;
        let mut rows_well_formed = 0usize;
        let mut max_cells = 0usize;
        let mut records = Vec::new();

        for row in table.select(&self.data_row) {
            if element_text(row).contains(TOTALS_MARKER) {
                continue;
            }
            rows_seen += 1;

            let cells: Vec<ElementRef> = row.select(&self.cell).collect();
            max_cells = max_cells.max(cells.len());
            if cells.len() < MIN_CELLS {
                debug!(cells = cells.len(), "skipping short row");
                continue;
            }
            rows_well_formed += 1;

            let case_number = clean_case_number(&element_text(cells[4]));
            if case_number.is_empty() {
                continue;
            }

            let (plaintiff, defendant) = split_parties(&element_text(cells[5]));
            let lawyers = element_text(cells[6]);

            records.push(CaseRecord {
                district_code: district_code.to_string(),
                hearing_date_bs: *date,
                bench_id: bench.id.clone(),
                bench_no: bench_no.clone(),
                bench_type: bench_type.clone(),
                judge_names: judge_names.clone(),
                serial_no: devanagari_to_ascii_digits(&element_text(cells[0])),
                division: element_text(cells[1]),
                registration_date: normalize_date(&element_text(cells[2])),
                case_type: element_text(cells[3]),
                case_number,
                plaintiff,
                defendant,
                lawyers: (!lawyers.is_empty() && lawyers != "--").then_some(lawyers),
                remarks: element_text(cells[7]),
                status: element_text(cells[8]),
                scraped_at: scraped_at.clone(),
            });
        }

        if rows_seen > 0 && rows_well_formed == 0 {
            return Err(ExtractError::Layout(format!(
                "{rows_seen} case rows found but none has {MIN_CELLS} cells (widest has {max_cells})"
            )));
        }
        Ok(records)
    }
}

/// Whitespace-normalised text of an element, with text nodes separated so
/// that `<br>`-split content does not run together.
fn element_text(el: ElementRef) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn split_parties(parties: &str) -> (String, String) {
    match parties.split_once("||") {
        Some((p, d)) => (normalize_whitespace(p), normalize_whitespace(d)),
        None => (parties.to_string(), String::new()),
    }
}
