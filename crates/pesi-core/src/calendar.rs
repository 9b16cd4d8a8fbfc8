//! Bikram Sambat (BS) calendar and request-date resolution.
//!
//! The portal publishes pesi lists keyed by BS dates on the Asia/Kathmandu
//! clock. All calendar arithmetic lives here; callers only ever see
//! [`BsDate`] values and the `yyyy-mm-dd` strings produced by
//! [`format_for_request`].
//!
//! # Month table
//!
//! BS month lengths are not rule-based; they are published per year. The
//! table below covers BS 2070 to BS 2090 (AD 2013-04-14 onwards), which is
//! the span the portal has listings for. Dates outside it are rejected with
//! [`CoreError::InvalidDate`] rather than guessed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

const FIRST_YEAR: u16 = 2070;

/// Days per month, Baisakh first, for BS 2070..=2090.
const BS_MONTH_DAYS: [[u8; 12]; 21] = [
    [31, 31, 31, 32, 31, 31, 29, 30, 30, 29, 30, 30], // 2070
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 30], // 2071
    [31, 32, 31, 32, 31, 30, 30, 29, 30, 29, 30, 30], // 2072
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 29, 30, 31], // 2073
    [31, 31, 31, 32, 31, 31, 30, 29, 30, 29, 30, 30], // 2074
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 30], // 2075
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 29, 30, 30], // 2076
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 30, 29, 31], // 2077
    [31, 31, 31, 32, 31, 31, 30, 29, 30, 29, 30, 30], // 2078
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 30], // 2079
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 29, 30, 30], // 2080
    [31, 31, 32, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2081
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2082
    [31, 31, 32, 31, 31, 30, 30, 30, 29, 30, 30, 30], // 2083
    [31, 31, 32, 31, 31, 30, 30, 30, 29, 30, 30, 30], // 2084
    [31, 32, 31, 32, 30, 31, 30, 30, 29, 30, 30, 30], // 2085
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2086
    [31, 31, 32, 31, 31, 31, 30, 30, 29, 30, 30, 30], // 2087
    [30, 31, 32, 32, 30, 31, 30, 30, 29, 30, 30, 30], // 2088
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2089
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2090
];

/// Gregorian date of 1 Baisakh 2070.
const EPOCH_AD: (i32, u32, u32) = (2013, 4, 14);

/// Asia/Kathmandu is UTC+05:45 all year.
const KATHMANDU_OFFSET_SECS: i32 = 5 * 3600 + 45 * 60;

fn epoch_ad() -> Result<NaiveDate, CoreError> {
    let (y, m, d) = EPOCH_AD;
    NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| CoreError::InvalidDate(format!("bad calendar epoch {y}-{m}-{d}")))
}

/// Number of days in a BS month, or `None` outside the supported table.
pub fn days_in_month(year: u16, month: u8) -> Option<u8> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let idx = year.checked_sub(FIRST_YEAR)? as usize;
    BS_MONTH_DAYS.get(idx).map(|months| months[month as usize - 1])
}

/// A date in the Bikram Sambat calendar.
///
/// Always valid against the month table: the only constructors are
/// [`BsDate::new`], [`BsDate::from_gregorian`] and parsing, all of which
/// check bounds. Ordering is chronological. Serialises as `yyyy-mm-dd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BsDate {
    year: u16,
    month: u8,
    day: u8,
}

impl BsDate {
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self, CoreError> {
        let max = days_in_month(year, month).ok_or_else(|| {
            CoreError::InvalidDate(format!(
                "{year:04}-{month:02}-{day:02} is outside the supported BS calendar"
            ))
        })?;
        if day == 0 || day > max {
            return Err(CoreError::InvalidDate(format!(
                "{year:04}-{month:02}-{day:02}: month {month} of {year} has {max} days"
            )));
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// Convert a Gregorian date into BS.
    pub fn from_gregorian(date: NaiveDate) -> Result<Self, CoreError> {
        let mut remaining = date.signed_duration_since(epoch_ad()?).num_days();
        if remaining < 0 {
            return Err(CoreError::InvalidDate(format!(
                "{date} is before the supported BS calendar"
            )));
        }

        for (i, months) in BS_MONTH_DAYS.iter().enumerate() {
            for (m, &len) in months.iter().enumerate() {
                if remaining < i64::from(len) {
                    return Ok(Self {
                        year: FIRST_YEAR + i as u16,
                        month: m as u8 + 1,
                        day: remaining as u8 + 1,
                    });
                }
                remaining -= i64::from(len);
            }
        }

        Err(CoreError::InvalidDate(format!(
            "{date} is after the supported BS calendar"
        )))
    }

    /// Convert into the Gregorian calendar.
    pub fn to_gregorian(&self) -> Result<NaiveDate, CoreError> {
        let year_idx = (self.year - FIRST_YEAR) as usize;
        let whole_years: u64 = BS_MONTH_DAYS[..year_idx]
            .iter()
            .flat_map(|months| months.iter())
            .map(|&d| u64::from(d))
            .sum();
        let whole_months: u64 = BS_MONTH_DAYS[year_idx][..(self.month - 1) as usize]
            .iter()
            .map(|&d| u64::from(d))
            .sum();
        let offset = whole_years + whole_months + u64::from(self.day - 1);

        epoch_ad()?
            .checked_add_days(Days::new(offset))
            .ok_or_else(|| CoreError::InvalidDate(format!("{self} overflows the Gregorian range")))
    }

    /// The previous calendar day.
    pub fn pred(&self) -> Result<Self, CoreError> {
        if self.day > 1 {
            return Ok(Self {
                day: self.day - 1,
                ..*self
            });
        }
        let (year, month) = if self.month > 1 {
            (self.year, self.month - 1)
        } else {
            (self.year - 1, 12)
        };
        let day = days_in_month(year, month).ok_or_else(|| {
            CoreError::InvalidDate(format!("no day before {self} in the supported BS calendar"))
        })?;
        Ok(Self { year, month, day })
    }
}

impl fmt::Display for BsDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for BsDate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidDate(format!("expected yyyy-mm-dd, got {s:?}"));
        let mut parts = s.trim().split('-');
        let (Some(y), Some(m), Some(d), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let year = y.parse().map_err(|_| invalid())?;
        let month = m.parse().map_err(|_| invalid())?;
        let day = d.parse().map_err(|_| invalid())?;
        Self::new(year, month, day)
    }
}

impl TryFrom<String> for BsDate {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BsDate> for String {
    fn from(value: BsDate) -> Self {
        value.to_string()
    }
}

// ── DateResolver ──

fn kathmandu() -> Result<FixedOffset, CoreError> {
    FixedOffset::east_opt(KATHMANDU_OFFSET_SECS)
        .ok_or_else(|| CoreError::InvalidDate("bad Asia/Kathmandu offset".into()))
}

/// Current BS date on the Kathmandu clock.
pub fn today() -> Result<BsDate, CoreError> {
    today_at(Utc::now())
}

/// BS date on the Kathmandu clock at the given instant.
pub fn today_at(now: DateTime<Utc>) -> Result<BsDate, CoreError> {
    BsDate::from_gregorian(now.with_timezone(&kathmandu()?).date_naive())
}

/// Current wall-clock time in Kathmandu as RFC 3339, for record metadata.
pub fn now_rfc3339() -> String {
    match kathmandu() {
        Ok(tz) => Utc::now().with_timezone(&tz).to_rfc3339(),
        Err(_) => Utc::now().to_rfc3339(),
    }
}

/// `count` consecutive days ending at `from`, most recent first.
///
/// Most-recent-first means a partially failed run retries the newest
/// listings before older ones on the next invocation.
pub fn window(from: BsDate, count: u32) -> Result<Vec<BsDate>, CoreError> {
    if count == 0 {
        return Err(CoreError::InvalidDate("date window must be at least 1 day".into()));
    }
    let mut dates = Vec::with_capacity(count as usize);
    let mut current = from;
    dates.push(current);
    for _ in 1..count {
        current = current.pred()?;
        dates.push(current);
    }
    Ok(dates)
}

/// The request window for a run: `count` days ending `offset_days` before
/// today on the Kathmandu clock at `now`.
pub fn request_window(
    now: DateTime<Utc>,
    offset_days: u32,
    count: u32,
) -> Result<Vec<BsDate>, CoreError> {
    let mut end = today_at(now)?;
    for _ in 0..offset_days {
        end = end.pred()?;
    }
    window(end, count)
}

/// Render a date the way the portal expects it in `pesi_date`.
pub fn format_for_request(date: &BsDate) -> String {
    date.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ad(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bs(y: u16, m: u8, d: u8) -> BsDate {
        BsDate::new(y, m, d).unwrap()
    }

    #[test]
    fn new_year_anchors() {
        assert_eq!(BsDate::from_gregorian(ad(2013, 4, 14)).unwrap(), bs(2070, 1, 1));
        assert_eq!(BsDate::from_gregorian(ad(2023, 4, 14)).unwrap(), bs(2080, 1, 1));
        assert_eq!(BsDate::from_gregorian(ad(2024, 4, 13)).unwrap(), bs(2081, 1, 1));
        assert_eq!(BsDate::from_gregorian(ad(2025, 4, 14)).unwrap(), bs(2082, 1, 1));
    }

    #[test]
    fn mid_year_conversion() {
        // 1 January 2025 was Poush 17, 2081.
        assert_eq!(BsDate::from_gregorian(ad(2025, 1, 1)).unwrap(), bs(2081, 9, 17));
        assert_eq!(bs(2081, 9, 17).to_gregorian().unwrap(), ad(2025, 1, 1));
    }

    #[test]
    fn gregorian_conversion_is_consistent_across_the_table() {
        let mut date = ad(2013, 4, 14);
        let last = ad(2030, 12, 31);
        while date <= last {
            let converted = BsDate::from_gregorian(date).unwrap();
            assert_eq!(converted.to_gregorian().unwrap(), date, "via {converted}");
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn before_table_is_invalid() {
        let err = BsDate::from_gregorian(ad(2013, 4, 13)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDate(_)));
    }

    #[test]
    fn new_rejects_out_of_range_parts() {
        assert!(BsDate::new(2081, 13, 1).is_err());
        assert!(BsDate::new(2081, 0, 1).is_err());
        assert!(BsDate::new(2081, 1, 0).is_err());
        assert!(BsDate::new(2080, 9, 30).is_err()); // Poush 2080 has 29 days
        assert!(BsDate::new(2069, 12, 30).is_err());
        assert!(BsDate::new(2091, 1, 1).is_err());
    }

    #[test]
    fn pred_crosses_month_and_year() {
        assert_eq!(bs(2081, 5, 10).pred().unwrap(), bs(2081, 5, 9));
        assert_eq!(bs(2081, 5, 1).pred().unwrap(), bs(2081, 4, 32));
        assert_eq!(bs(2081, 1, 1).pred().unwrap(), bs(2080, 12, 30));
        assert!(bs(2070, 1, 1).pred().is_err());
    }

    #[test]
    fn parse_and_display() {
        let d: BsDate = "2081-09-17".parse().unwrap();
        assert_eq!(d, bs(2081, 9, 17));
        assert_eq!(d.to_string(), "2081-09-17");
        assert_eq!(format_for_request(&bs(2082, 1, 5)), "2082-01-05");
    }

    #[test]
    fn parse_rejects_malformed() {
        for s in ["", "2081-09", "2081/09/17", "2081-09-17-01", "20x1-01-01", "2081-02-40"] {
            assert!(s.parse::<BsDate>().is_err(), "{s:?} should not parse");
        }
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&bs(2081, 9, 17)).unwrap();
        assert_eq!(json, "\"2081-09-17\"");
        let back: BsDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bs(2081, 9, 17));
        assert!(serde_json::from_str::<BsDate>("\"2081-13-01\"").is_err());
    }

    #[test]
    fn ordering_is_chronological() {
        assert!(bs(2080, 12, 30) < bs(2081, 1, 1));
        assert!(bs(2081, 1, 2) < bs(2081, 2, 1));
    }

    #[test]
    fn window_is_most_recent_first() {
        let dates = window(bs(2081, 2, 2), 3).unwrap();
        assert_eq!(dates, vec![bs(2081, 2, 2), bs(2081, 2, 1), bs(2081, 1, 31)]);
    }

    #[test]
    fn window_of_zero_is_invalid() {
        assert!(matches!(window(bs(2081, 2, 2), 0), Err(CoreError::InvalidDate(_))));
    }

    #[test]
    fn today_follows_kathmandu_clock() {
        // 2026-10-16 AD is Asoj 30, 2083 BS.
        let midnight_utc = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        assert_eq!(today_at(midnight_utc).unwrap(), bs(2083, 6, 30));

        // 18:15 UTC is already the next day in Kathmandu.
        let after = Utc.with_ymd_and_hms(2026, 10, 15, 18, 15, 0).unwrap();
        assert_eq!(today_at(after).unwrap(), bs(2083, 6, 30));

        let before = Utc.with_ymd_and_hms(2026, 10, 15, 18, 0, 0).unwrap();
        assert_eq!(today_at(before).unwrap(), bs(2083, 6, 29));
    }

    #[test]
    fn request_window_applies_offset() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 6, 0, 0).unwrap();
        let dates = request_window(now, 2, 2).unwrap();
        assert_eq!(dates, vec![bs(2083, 6, 28), bs(2083, 6, 27)]);
    }
}
