//! The work-unit universe for one run.

use chrono::{DateTime, Utc};
use pesi_core::calendar::request_window;
use pesi_core::{BsDate, CoreError, District, DistrictRegistry, RunConfig, RunMode};
use tracing::info;

/// Districts and dates to process. Every district is paired with every date.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub districts: Vec<District>,
    /// Most recent first.
    pub dates: Vec<BsDate>,
}

impl RunPlan {
    /// Resolve the plan from config and a loaded registry at instant `now`.
    ///
    /// Debug mode keeps only the first district (after any `--district`
    /// filter) and caps the window.
    pub fn resolve(
        config: &RunConfig,
        registry: DistrictRegistry,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let mut registry = registry.restrict_to(&config.districts)?;
        if config.mode == RunMode::Debug {
            registry = registry.first_only();
        }
        let dates = request_window(now, config.offset_days, config.effective_window())?;

        let plan = Self {
            districts: registry.all().to_vec(),
            dates,
        };
        info!(
            mode = ?config.mode,
            districts = plan.districts.len(),
            days = plan.dates.len(),
            newest = ?plan.dates.first().map(ToString::to_string),
            oldest = ?plan.dates.last().map(ToString::to_string),
            "resolved run plan"
        );
        Ok(plan)
    }

    /// Number of (district, date) units in the plan.
    pub fn len(&self) -> usize {
        self.districts.len() * self.dates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const THREE: &str = r#"[
        {"code": "01", "name": "Kathmandu", "identifier": "kathmandudc"},
        {"code": "02", "name": "Lalitpur", "identifier": "lalitpurdc"},
        {"code": "03", "name": "Bhaktapur", "identifier": "bhaktapurdc"}
    ]"#;

    // 2025-01-03 12:00 Kathmandu is BS 2081-09-19.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 3, 6, 15, 0).unwrap()
    }

    fn registry() -> DistrictRegistry {
        DistrictRegistry::from_json(THREE).unwrap()
    }

    #[test]
    fn production_plan_covers_all_districts() {
        let config = RunConfig {
            window_size: 3,
            ..RunConfig::default()
        };
        let plan = RunPlan::resolve(&config, registry(), now()).unwrap();

        assert_eq!(plan.districts.len(), 3);
        let dates: Vec<String> = plan.dates.iter().map(ToString::to_string).collect();
        assert_eq!(dates, vec!["2081-09-17", "2081-09-16", "2081-09-15"]);
        assert_eq!(plan.len(), 9);
        let codes: Vec<&str> = plan.districts.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["01", "02", "03"]);
    }

    #[test]
    fn debug_plan_is_first_district_and_short_window() {
        let config = RunConfig {
            mode: RunMode::Debug,
            ..RunConfig::default()
        };
        let plan = RunPlan::resolve(&config, registry(), now()).unwrap();
        assert_eq!(plan.districts.len(), 1);
        assert_eq!(plan.districts[0].code, "01");
        assert_eq!(plan.dates.len(), 5);
    }

    #[test]
    fn district_filter_applies_before_debug_head() {
        let config = RunConfig {
            mode: RunMode::Debug,
            districts: vec!["03".into(), "02".into()],
            ..RunConfig::default()
        };
        let plan = RunPlan::resolve(&config, registry(), now()).unwrap();
        assert_eq!(plan.districts.len(), 1);
        assert_eq!(plan.districts[0].code, "02");
    }

    #[test]
    fn unknown_district_filter_fails() {
        let config = RunConfig {
            districts: vec!["99".into()],
            ..RunConfig::default()
        };
        assert!(RunPlan::resolve(&config, registry(), now()).is_err());
    }
}
