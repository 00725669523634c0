//! Periodic feed polling: conditional fetches, next-update scheduling and retry backoff.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use super::parser::parse_feed;
use super::types::{FeedCheckResult, FeedStatus};
use super::util::is_valid_url;
use crate::clock::{Clock, FixedClock, SystemClock};
use crate::environment::Config;
use crate::feed::FeedSnapshot;
use crate::fetch::{FetchClient, FetchError, ReqwestTransport, Response, Transport};
use crate::schedule::{SchedulePolicy, UpdateStats};
use crate::{TARGET_SCHEDULE, TARGET_WEB_REQUEST};

/// What the poller remembers about one feed between checks.
#[derive(Debug, Clone)]
pub struct FeedState {
    /// Sent as If-Modified-Since on the next check.
    pub last_modified: Option<DateTime<Utc>>,
    pub next_update: DateTime<Utc>,
    /// Consecutive failed checks.
    pub failures: u32,
    /// Timestamps of the last successfully parsed version of the feed.
    pub snapshot: Option<FeedSnapshot>,
}

impl FeedState {
    fn new() -> Self {
        Self {
            last_modified: None,
            next_update: DateTime::<Utc>::MIN_UTC,
            failures: 0,
            snapshot: None,
        }
    }
}

pub struct FeedPoller<T: Transport> {
    client: FetchClient<T>,
    policy: SchedulePolicy,
    max_concurrent: usize,
    feeds: BTreeMap<String, FeedState>,
}

impl<T: Transport> FeedPoller<T> {
    pub fn new(client: FetchClient<T>, policy: SchedulePolicy, max_concurrent: usize) -> Self {
        Self {
            client,
            policy,
            max_concurrent: max_concurrent.max(1),
            feeds: BTreeMap::new(),
        }
    }

    /// Register a feed, due immediately. Returns false for non-http(s) URLs.
    pub fn add_feed(&mut self, url: &str) -> bool {
        let url = url.trim();
        if !is_valid_url(url) {
            return false;
        }
        self.feeds.entry(url.to_string()).or_insert_with(FeedState::new);
        true
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn state(&self, url: &str) -> Option<&FeedState> {
        self.feeds.get(url)
    }

    /// Earliest scheduled check across all feeds.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.feeds.values().map(|state| state.next_update).min()
    }

    /// How long to sleep before the next poll: until the earliest due feed,
    /// at least one second and at most `tick`.
    pub fn sleep_duration(&self, now: DateTime<Utc>, tick: Duration) -> Duration {
        let until_due = self
            .next_due()
            .and_then(|due| (due - now).to_std().ok())
            .unwrap_or(Duration::ZERO);
        until_due.min(tick).max(Duration::from_secs(1))
    }

    /// Check every feed whose next update is at or before `now`.
    ///
    /// Fetches run concurrently, at most `max_concurrent` at a time. Results
    /// are sorted by URL.
    pub async fn poll_due(&mut self, now: DateTime<Utc>) -> Vec<FeedCheckResult> {
        let due: Vec<(String, Option<DateTime<Utc>>)> = self
            .feeds
            .iter()
            .filter(|(_, state)| state.next_update <= now)
            .map(|(url, state)| (url.clone(), state.last_modified))
            .collect();

        if due.is_empty() {
            debug!(target: TARGET_SCHEDULE, "No feeds due at {}", now.to_rfc3339());
            return Vec::new();
        }
        debug!(target: TARGET_WEB_REQUEST, "Checking {} of {} feeds", due.len(), self.feeds.len());

        let client = &self.client;
        let outcomes: Vec<(String, Result<Response, FetchError>)> = stream::iter(due)
            .map(|(url, since)| async move {
                let outcome = client.get_response(&url, since).await;
                (url, outcome)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        // Every feed checked in this round is scheduled against the same instant
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));
        let mut results: Vec<FeedCheckResult> = outcomes
            .into_iter()
            .map(|(url, outcome)| self.apply(url, outcome, &clock))
            .collect();
        results.sort_by(|a, b| a.url.cmp(&b.url));
        results
    }

    fn apply(
        &mut self,
        url: String,
        outcome: Result<Response, FetchError>,
        clock: &Arc<dyn Clock>,
    ) -> FeedCheckResult {
        let now = clock.now();
        let policy = self.policy;
        let state = self.feeds.entry(url.clone()).or_insert_with(FeedState::new);

        let mut result = FeedCheckResult {
            url,
            status: FeedStatus::Updated,
            status_code: None,
            final_url: None,
            duration_secs: None,
            entries_found: 0,
            next_update: now,
            failures: 0,
            error: None,
        };

        match outcome {
            Ok(response) => {
                result.status_code = Some(response.status_code());
                result.final_url = Some(response.url().to_string());
                result.duration_secs = Some(response.duration_secs());

                if response.is_not_modified() {
                    result.status = FeedStatus::NotModified;
                    state.failures = 0;
                    state.next_update = match &state.snapshot {
                        Some(snapshot) => UpdateStats::with_clock(snapshot, clock.clone())
                            .compute_next_update(&policy),
                        None => after(now, policy.min_delay.max(1)),
                    };
                } else {
                    match parse_feed(response.body(), &result.url) {
                        Ok(feed) => {
                            let snapshot = FeedSnapshot::from_model(&feed);
                            let stats = UpdateStats::with_clock(&snapshot, clock.clone());

                            result.entries_found = feed.entries.len();
                            state.failures = 0;
                            state.next_update = stats.compute_next_update(&policy);
                            state.last_modified = response
                                .header("Last-Modified")
                                .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
                                .map(|date| date.with_timezone(&Utc))
                                .or_else(|| newest_known_date(&snapshot))
                                .map(|date| date.min(now))
                                .or(state.last_modified);
                            state.snapshot = Some(snapshot);
                        }
                        Err(err) => {
                            result.status = FeedStatus::ParseError;
                            result.error = Some(err.to_string());
                            record_failure(state, &policy, now);
                        }
                    }
                }
            }
            Err(err) => {
                result.status = FeedStatus::from_error(&err);
                result.status_code = err.status_code();
                result.duration_secs = err.duration().map(|d| d.as_secs_f64());
                result.error = Some(err.to_string());
                record_failure(state, &policy, now);
            }
        }

        result.next_update = state.next_update;
        result.failures = state.failures;

        match result.status {
            FeedStatus::Updated => {
                info!(
                    target: TARGET_WEB_REQUEST,
                    "Fetched {}: {} entries, next check at {}",
                    result.url,
                    result.entries_found,
                    result.next_update.to_rfc3339()
                );
            }
            FeedStatus::NotModified => {
                debug!(
                    target: TARGET_WEB_REQUEST,
                    "{} not modified, next check at {}",
                    result.url,
                    result.next_update.to_rfc3339()
                );
            }
            _ => {
                warn!(
                    target: TARGET_WEB_REQUEST,
                    "Check of {} failed ({} in a row): {}, retrying at {}",
                    result.url,
                    result.failures,
                    result.error.as_deref().unwrap_or("unknown error"),
                    result.next_update.to_rfc3339()
                );
            }
        }

        result
    }
}

fn record_failure(state: &mut FeedState, policy: &SchedulePolicy, now: DateTime<Utc>) {
    state.failures = state.failures.saturating_add(1);
    state.next_update = after(now, policy.retry_delay(state.failures));
}

fn after(now: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(now.timestamp().saturating_add(seconds), 0)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Latest explicit date in the feed, item or feed level.
fn newest_known_date(snapshot: &FeedSnapshot) -> Option<DateTime<Utc>> {
    snapshot
        .items
        .iter()
        .filter_map(|item| item.last_modified)
        .chain(snapshot.last_modified)
        .max()
}

/// Main feed polling loop: checks every due feed, then sleeps until the next one is due.
pub async fn rss_loop(config: Config) -> Result<()> {
    let transport = ReqwestTransport::new(&config.transport)
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
    let mut poller = FeedPoller::new(
        FetchClient::new(transport),
        config.policy,
        config.max_concurrent_fetches,
    );

    for url in &config.feed_urls {
        if !poller.add_feed(url) {
            warn!(target: TARGET_WEB_REQUEST, "Skipping invalid URL: {}", url);
        }
    }
    if poller.is_empty() {
        error!(target: TARGET_WEB_REQUEST, "No valid feed URLs configured");
        return Err(anyhow!("No valid feed URLs configured, set FEED_URLS"));
    }
    info!(target: TARGET_WEB_REQUEST, "Watching {} feeds", poller.len());

    let clock = SystemClock;
    loop {
        let results = poller.poll_due(clock.now()).await;
        if !results.is_empty() {
            let updated = results.iter().filter(|r| r.status == FeedStatus::Updated).count();
            let failed = results.iter().filter(|r| !r.status.is_success()).count();
            info!(
                target: TARGET_WEB_REQUEST,
                "Checked {} feeds: {} updated, {} failed",
                results.len(),
                updated,
                failed
            );
        }

        let pause = poller.sleep_duration(clock.now(), config.poll_tick);
        debug!(target: TARGET_SCHEDULE, "Sleeping for {:?} before next check", pause);
        sleep(pause).await;
    }
}
