//! HTTP fetcher for district court pesi pages.
//!
//! A day's listing takes a `GET` of the bench list, then one `POST` to
//! `cause_list_detail` per bench. Every response is reduced to a
//! [`FetchOutcome`] by [`classify`]. No retries happen here: a
//! `TransportError` is recorded by the runner and retried on the next run.

use std::time::Duration;

use async_trait::async_trait;
use pesi_core::calendar::format_for_request;
use pesi_core::{BsDate, District};
use scraper::Html;
use thiserror::Error;
use tracing::{debug, info};

use crate::extract::Bench;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Text the portal's firewall serves instead of the requested page.
pub const WAF_MARKERS: &[&str] = &["The requested URL was rejected", "support ID is:"];

/// Text the portal shows when no pesi is scheduled. Only meaningful on a
/// page without any table; inside a listing it may label a single empty bench.
pub const NO_PESI_MARKERS: &[&str] = &["पेशी सूची उपलब्ध छैन", "No Record Found"];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result of fetching one (district, date) page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A listing page; the raw HTML for extraction.
    Found(String),
    /// The portal says nothing is scheduled. A normal, terminal result.
    NotFound,
    /// Network, status, or response-shape failure. Retryable.
    TransportError(String),
}

/// Classify a response.
///
/// Rules, first match wins:
/// 1. non-2xx status: `TransportError`
/// 2. empty or whitespace-only body: `TransportError`
/// 3. body contains a [`WAF_MARKERS`] entry: `TransportError`
/// 4. a [`NO_PESI_MARKERS`] entry on a page with no `<table>`: `NotFound`
/// 5. anything else: `Found(body)`
///
/// A `Found` page that turns out not to hold the expected table is caught
/// by the extractor, not here.
pub fn classify(status: u16, body: String) -> FetchOutcome {
    if !(200..300).contains(&status) {
        return FetchOutcome::TransportError(format!("server returned {status}"));
    }
    if body.trim().is_empty() {
        return FetchOutcome::TransportError("empty response body".into());
    }
    if WAF_MARKERS.iter().any(|m| body.contains(m)) {
        return FetchOutcome::TransportError("request blocked by WAF".into());
    }
    if announces_no_pesi(&body) {
        return FetchOutcome::NotFound;
    }
    FetchOutcome::Found(body)
}

fn announces_no_pesi(body: &str) -> bool {
    if !NO_PESI_MARKERS.iter().any(|m| body.contains(m)) {
        return false;
    }
    let doc = Html::parse_document(body);
    !doc.root_element()
        .descendants()
        .any(|n| n.value().as_element().is_some_and(|e| e.name() == "table"))
}

/// Anything that can produce pesi pages for a (district, date).
#[async_trait]
pub trait PageSource: Send + Sync {
    /// The day's bench list.
    async fn fetch(&self, district: &District, date: &BsDate) -> FetchOutcome;

    /// The cause list of one bench from that day's bench list.
    async fn fetch_bench(
        &self,
        district: &District,
        date: &BsDate,
        bench: &Bench,
    ) -> FetchOutcome;
}

/// Fetches pesi pages from the court portal.
pub struct PageFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl PageFetcher {
    /// Create a fetcher for the given portal base URL.
    ///
    /// `base_url` should be like `https://supremecourt.gov.np/court`; a
    /// trailing slash is ignored. `timeout` bounds each request end to end.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// `{base_url}/{identifier}/bench_list?pesi_date={yyyy-mm-dd}`
    pub fn request_url(&self, district: &District, date: &BsDate) -> String {
        format!(
            "{}/{}/bench_list?pesi_date={}",
            self.base_url,
            district.identifier,
            format_for_request(date)
        )
    }

    /// `{base_url}/{identifier}/cause_list_detail`
    pub fn cause_list_url(&self, district: &District) -> String {
        format!("{}/{}/cause_list_detail", self.base_url, district.identifier)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> (Option<u16>, FetchOutcome) {
        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => return (None, FetchOutcome::TransportError(self.describe(&e))),
        };
        let status = resp.status().as_u16();
        let outcome = match resp.text().await {
            Ok(body) => classify(status, body),
            Err(e) => FetchOutcome::TransportError(format!("reading body: {}", self.describe(&e))),
        };
        (Some(status), outcome)
    }

    fn describe(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs_f32())
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        }
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch(&self, district: &District, date: &BsDate) -> FetchOutcome {
        let url = self.request_url(district, date);
        debug!(url = %url, "fetching bench list");

        let (status, outcome) = self.send(self.client.get(&url)).await;
        info!(
            district = %district.code,
            date = %date,
            status,
            outcome = outcome.label(),
            "fetched bench list"
        );
        outcome
    }

    async fn fetch_bench(
        &self,
        district: &District,
        date: &BsDate,
        bench: &Bench,
    ) -> FetchOutcome {
        let url = self.cause_list_url(district);
        let form = [
            ("bench_id", bench.id.clone()),
            ("bench_no", bench.number.clone()),
            ("hearing_date", hearing_date_field(date)),
        ];
        debug!(url = %url, bench = %bench.id, "fetching cause list");

        let (status, outcome) = self.send(self.client.post(&url).form(&form)).await;
        info!(
            district = %district.code,
            date = %date,
            bench = %bench.id,
            status,
            outcome = outcome.label(),
            "fetched cause list"
        );
        outcome
    }
}

/// `hearing_date` form value: the BS date as `yyyymmdd`.
fn hearing_date_field(date: &BsDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

impl FetchOutcome {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
            Self::TransportError(_) => "transport_error",
        }
    }
}
