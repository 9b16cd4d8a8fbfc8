//! Fetch layer: portal HTTP client, response classification, and bench and
//! cause-list extraction.

pub mod extract;
pub mod http;

pub use extract::{Bench, ExtractError, RecordExtractor};
pub use http::{FetchError, FetchOutcome, PageFetcher, PageSource, classify};
