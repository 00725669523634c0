//! Type definitions for the rss module.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fetch::{FetchError, ServerErrorKind};
use crate::schedule::{SchedulePolicy, UpdateStats};

/// Outcome of one feed check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedStatus {
    Updated,
    NotModified,
    NotFound,
    RedirectFailed,
    ServerError,
    RequestFailed,
    ParseError,
    InvalidUrl,
}

impl FeedStatus {
    pub fn from_error(error: &FetchError) -> Self {
        match error {
            FetchError::NotFound { .. } => FeedStatus::NotFound,
            FetchError::ServerError { kind, .. } => match kind {
                ServerErrorKind::EmptyLocation
                | ServerErrorKind::DisallowedScheme(_)
                | ServerErrorKind::TooManyRedirects(_)
                | ServerErrorKind::InvalidUrl(_) => FeedStatus::RedirectFailed,
                ServerErrorKind::UnexpectedStatus(_) => FeedStatus::ServerError,
            },
            FetchError::Transport(_) => FeedStatus::RequestFailed,
        }
    }

    /// True when the check produced a usable answer from the server.
    pub fn is_success(&self) -> bool {
        matches!(self, FeedStatus::Updated | FeedStatus::NotModified)
    }
}

/// Result of one poll of one feed, as logged and reported by the poller
#[derive(Debug, Clone, Serialize)]
pub struct FeedCheckResult {
    pub url: String,
    pub status: FeedStatus,
    pub status_code: Option<u16>,
    pub final_url: Option<String>,
    pub duration_secs: Option<f64>,
    pub entries_found: usize,
    pub next_update: DateTime<Utc>,
    pub failures: u32,
    pub error: Option<String>,
}

/// Summary of the publication statistics of a feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalStats {
    pub intervals: usize,
    pub min_interval: i64,
    pub max_interval: i64,
    pub average_interval: i64,
    pub median_interval: i64,
    pub newest_item_date: i64,
    pub sleepy: bool,
}

impl IntervalStats {
    pub fn from_stats(stats: &UpdateStats, policy: &SchedulePolicy) -> Self {
        Self {
            intervals: stats.intervals().len(),
            min_interval: stats.min_interval(),
            max_interval: stats.max_interval(),
            average_interval: stats.average_interval(),
            median_interval: stats.median_interval(),
            newest_item_date: stats.newest_item_date(),
            sleepy: stats.is_sleepy(policy.sleepy_duration, policy.margin_ratio),
        }
    }
}

/// Detailed test results for a feed
#[derive(Debug, Clone, Serialize)]
pub struct TestRssFeedResult {
    pub url: String,
    pub status: FeedStatus,
    pub status_code: Option<u16>,
    pub final_url: Option<String>,
    pub duration_secs: Option<f64>,
    pub content_type: Option<String>,
    pub raw_preview: Option<Vec<u8>>,
    pub decoded_preview: Option<String>,
    pub entries_found: usize,
    pub headers: Vec<(String, String)>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub entries: Vec<EntryInfo>,
    pub interval_stats: Option<IntervalStats>,
    pub next_update: Option<DateTime<Utc>>,
}

impl TestRssFeedResult {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: FeedStatus::Updated,
            status_code: None,
            final_url: None,
            duration_secs: None,
            content_type: None,
            raw_preview: None,
            decoded_preview: None,
            entries_found: 0,
            headers: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            entries: Vec::new(),
            interval_stats: None,
            next_update: None,
        }
    }
}

/// Basic information about a feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub title: Option<String>,
    pub url: Option<String>,
    pub pub_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_from_error() {
        let not_found = FetchError::NotFound {
            url: "https://example.com/feed".to_string(),
            duration: Duration::ZERO,
        };
        assert_eq!(FeedStatus::from_error(&not_found), FeedStatus::NotFound);

        let server = FetchError::ServerError {
            kind: ServerErrorKind::UnexpectedStatus(503),
            response: None,
            duration: Duration::ZERO,
        };
        assert_eq!(FeedStatus::from_error(&server), FeedStatus::ServerError);

        let looping = FetchError::ServerError {
            kind: ServerErrorKind::TooManyRedirects(11),
            response: None,
            duration: Duration::ZERO,
        };
        assert_eq!(FeedStatus::from_error(&looping), FeedStatus::RedirectFailed);
    }

    #[test]
    fn test_status_serializes_as_variant_name() {
        assert_eq!(serde_json::to_string(&FeedStatus::NotModified).unwrap(), "\"NotModified\"");
        assert!(FeedStatus::Updated.is_success());
        assert!(!FeedStatus::ParseError.is_success());
    }
}
