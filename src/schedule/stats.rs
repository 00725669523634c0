use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::policy::SchedulePolicy;
use crate::clock::{Clock, SystemClock};
use crate::feed::{FeedItem, FeedModel};
use crate::TARGET_SCHEDULE;

/// Publication statistics of one feed snapshot.
///
/// Built once per check cycle. A new snapshot of the feed needs a new
/// instance; nothing here is mutated after construction.
#[derive(Clone)]
pub struct UpdateStats {
    intervals: Vec<i64>,
    newest_item_date: i64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for UpdateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateStats")
            .field("intervals", &self.intervals)
            .field("newest_item_date", &self.newest_item_date)
            .finish_non_exhaustive()
    }
}

impl UpdateStats {
    pub fn new<F: FeedModel + ?Sized>(feed: &F) -> Self {
        Self::with_clock(feed, Arc::new(SystemClock))
    }

    pub fn with_clock<F: FeedModel + ?Sized>(feed: &F, clock: Arc<dyn Clock>) -> Self {
        let now = clock.timestamp();
        let feed_timestamp = feed.last_modified().map(|t| t.timestamp()).unwrap_or(now);

        let mut dates: Vec<i64> = feed
            .items()
            .iter()
            .map(|item| item.last_modified().map(|t| t.timestamp()).unwrap_or(feed_timestamp))
            .collect();

        // Items dated in the future must not push the newest date past now
        let newest_item_date = dates.iter().copied().max().unwrap_or(feed_timestamp).min(now);

        dates.sort_unstable_by(|a, b| b.cmp(a));
        let intervals = dates.windows(2).map(|pair| pair[0] - pair[1]).collect();

        Self {
            intervals,
            newest_item_date,
            clock,
        }
    }

    /// Gaps between consecutive items, newest first.
    pub fn intervals(&self) -> &[i64] {
        &self.intervals
    }

    pub fn min_interval(&self) -> i64 {
        self.intervals.iter().copied().min().unwrap_or(0)
    }

    pub fn max_interval(&self) -> i64 {
        self.intervals.iter().copied().max().unwrap_or(0)
    }

    /// Mean interval with outliers outside 1.5 IQR left out of the sum.
    ///
    /// The sum is still divided by the full interval count, so outliers
    /// pull the result down instead of vanishing. Quartiles are picked by
    /// index (`n/4`, `3n/4`) without interpolation.
    pub fn average_interval(&self) -> i64 {
        let sorted = self.sorted_intervals();
        let count = sorted.len();
        if count == 0 {
            return 0;
        }

        let q1 = sorted[count / 4];
        let q3 = sorted[count * 3 / 4];
        let iqr = (q3 - q1) as f64;
        let lower_bound = q1 as f64 - 1.5 * iqr;
        let upper_bound = q3 as f64 + 1.5 * iqr;

        let total: i64 = sorted
            .iter()
            .copied()
            .filter(|&value| (value as f64) >= lower_bound && (value as f64) <= upper_bound)
            .sum();

        total.div_euclid(count as i64)
    }

    pub fn median_interval(&self) -> i64 {
        let sorted = self.sorted_intervals();
        let count = sorted.len();
        if count == 0 {
            return 0;
        }

        let middle = count / 2;
        if count % 2 == 0 {
            (sorted[middle - 1] + sorted[middle]).div_euclid(2)
        } else {
            sorted[middle]
        }
    }

    /// Unix timestamp of the newest item, never later than now.
    pub fn newest_item_date(&self) -> i64 {
        self.newest_item_date
    }

    /// True once the feed has been silent for longer than the inflated `sleepy_duration`.
    pub fn is_sleepy(&self, sleepy_duration: i64, margin_ratio: f64) -> bool {
        let deadline = Self::add_interval(self.newest_item_date, sleepy_duration, margin_ratio);
        self.clock.timestamp() > deadline
    }

    /// `ts + floor(interval + margin_ratio * interval)`.
    pub fn add_interval(ts: i64, interval: i64, margin_ratio: f64) -> i64 {
        let inflated = (interval as f64 + margin_ratio * interval as f64).floor() as i64;
        ts.saturating_add(inflated)
    }

    pub fn compute_next_update(&self, policy: &SchedulePolicy) -> DateTime<Utc> {
        let ts = self.compute_next_update_timestamp(policy);
        DateTime::from_timestamp(ts, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Next recommended fetch as a unix timestamp, always strictly after now.
    pub fn compute_next_update_timestamp(&self, policy: &SchedulePolicy) -> i64 {
        let now = self.clock.timestamp();

        if self.is_sleepy(policy.sleepy_duration, policy.margin_ratio) {
            debug!(
                target: TARGET_SCHEDULE,
                "Feed is sleepy, newest item at {}",
                self.newest_item_date
            );
            return now.saturating_add(policy.sleepy_delay.max(1));
        }

        let mut candidates = [self.average_interval(), self.median_interval()];
        candidates.sort_unstable();

        for interval in candidates {
            let projected =
                Self::add_interval(self.newest_item_date, interval, policy.margin_ratio);
            if projected > now {
                debug!(
                    target: TARGET_SCHEDULE,
                    "Next update in {}s from interval {}s",
                    projected - now,
                    interval
                );
                return projected;
            }
        }

        debug!(
            target: TARGET_SCHEDULE,
            "No interval projects past now, using minimum delay {}s",
            policy.min_delay
        );
        now.saturating_add(policy.min_delay.max(1))
    }

    fn sorted_intervals(&self) -> Vec<i64> {
        let mut sorted = self.intervals.clone();
        sorted.sort_unstable();
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::feed::FeedSnapshot;
    use chrono::TimeZone;

    const NOW: i64 = 1_736_000_000;
    const HOUR: i64 = 3600;
    const DAY: i64 = 86400;

    fn at(offset: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(NOW + offset, 0).single()
    }

    fn feed(feed_offset: Option<i64>, item_offsets: &[i64]) -> FeedSnapshot {
        item_offsets
            .iter()
            .fold(FeedSnapshot::new(feed_offset.and_then(at)), |feed, &offset| {
                feed.with_item(at(offset))
            })
    }

    fn stats(feed: &FeedSnapshot) -> UpdateStats {
        UpdateStats::with_clock(feed, Arc::new(FixedClock::at_timestamp(NOW)))
    }

    #[test]
    fn test_intervals() {
        let stats = stats(&feed(Some(-DAY), &[-DAY, -3 * DAY, -10 * DAY, -20 * DAY, -21 * DAY]));

        assert_eq!(stats.intervals(), &[2 * DAY, 7 * DAY, 10 * DAY, DAY]);
        assert_eq!(stats.min_interval(), DAY);
        assert_eq!(stats.max_interval(), 10 * DAY);
        assert_eq!(stats.average_interval(), 5 * DAY);
        assert_eq!(stats.median_interval(), 4 * DAY + 12 * HOUR);
        assert_eq!(stats.newest_item_date(), NOW - DAY);

        let computed = stats.average_interval().min(stats.median_interval());
        assert_eq!(
            stats.compute_next_update_timestamp(&SchedulePolicy::default()),
            stats.newest_item_date() + (computed as f64 * 1.1) as i64
        );
    }

    #[test]
    fn test_intervals_are_sorted_before_differencing() {
        let stats = stats(&feed(None, &[-10 * DAY, -DAY, -3 * DAY]));
        assert_eq!(stats.intervals(), &[2 * DAY, 7 * DAY]);
    }

    #[test]
    fn test_interval_count_follows_item_count() {
        for count in 0..8_i64 {
            let offsets: Vec<i64> = (0..count).map(|i| -i * HOUR).collect();
            let stats = stats(&feed(Some(-DAY), &offsets));
            assert_eq!(stats.intervals().len() as i64, (count - 1).max(0));
        }
    }

    #[test]
    fn test_sleepy_feed() {
        let stats = stats(&feed(Some(-10 * DAY), &[-10 * DAY, -12 * DAY]));

        assert_eq!(stats.intervals().len(), 1);
        assert!(stats.is_sleepy(
            crate::schedule::DEFAULT_DURATION_BEFORE_BEING_SLEEPY,
            crate::schedule::DEFAULT_MARGIN_RATIO
        ));
        assert_eq!(stats.compute_next_update_timestamp(&SchedulePolicy::default()), NOW + DAY);
    }

    #[test]
    fn test_is_sleepy_boundary() {
        // threshold = 1000 + floor(0.1 * 1000) = 1100
        let at_threshold = stats(&feed(None, &[-1100]));
        assert!(!at_threshold.is_sleepy(1000, 0.1));

        let past_threshold = stats(&feed(None, &[-1101]));
        assert!(past_threshold.is_sleepy(1000, 0.1));
    }

    #[test]
    fn test_add_interval() {
        assert_eq!(UpdateStats::add_interval(1000, 100, 0.1), 1110);
        assert_eq!(UpdateStats::add_interval(1000, 15, 0.1), 1016);
        assert_eq!(UpdateStats::add_interval(1000, 0, 0.1), 1000);
        assert_eq!(UpdateStats::add_interval(i64::MAX - 1, 100, 0.1), i64::MAX);
    }

    #[test]
    fn test_average_with_no_intervals() {
        let stats = stats(&feed(Some(-DAY), &[-DAY]));
        assert!(stats.intervals().is_empty());
        assert_eq!(stats.average_interval(), 0);
        assert_eq!(stats.median_interval(), 0);
        assert_eq!(stats.min_interval(), 0);
        assert_eq!(stats.max_interval(), 0);
    }

    #[test]
    fn test_average_with_outlier_keeps_full_divisor() {
        // intervals [1d, 1d, 1d, 1d, 100d]
        let stats = stats(&feed(Some(-DAY), &[0, -DAY, -2 * DAY, -3 * DAY, -4 * DAY, -104 * DAY]));
        assert_eq!(stats.intervals(), &[DAY, DAY, DAY, DAY, 100 * DAY]);

        let raw_average = stats.intervals().iter().sum::<i64>() / 5;
        let average = stats.average_interval();

        assert_eq!(average, 4 * DAY / 5);
        assert!(average < raw_average);
        assert!(average > 0);
    }

    #[test]
    fn test_average_with_uniform_intervals() {
        let offsets: Vec<i64> = (1..=10).map(|i| -i * HOUR).collect();
        let stats = stats(&feed(Some(-HOUR), &offsets));

        assert_eq!(stats.intervals().len(), 9);
        assert!(stats.intervals().iter().all(|&i| i == HOUR));
        assert_eq!(stats.average_interval(), HOUR);
    }

    #[test]
    fn test_average_small_counts() {
        assert_eq!(stats(&feed(None, &[0, -10])).average_interval(), 10);
        // [10, 20]: bounds [-5, 35]
        assert_eq!(stats(&feed(None, &[0, -10, -30])).average_interval(), 15);
    }

    #[test]
    fn test_quartile_indices_within_bounds() {
        for count in [1_i64, 2, 3, 4, 5, 10, 100] {
            let offsets: Vec<i64> = (0..=count).map(|i| -i * 2 * HOUR).collect();
            let stats = stats(&feed(Some(-DAY), &offsets));
            assert_eq!(stats.intervals().len() as i64, count);
            assert_eq!(stats.average_interval(), 2 * HOUR);
        }
    }

    #[test]
    fn test_median() {
        // odd: [1, 5, 9] hours
        let odd = stats(&feed(None, &[0, -HOUR, -6 * HOUR, -15 * HOUR]));
        assert_eq!(odd.median_interval(), 5 * HOUR);

        // even: [10, 25] seconds -> floor(17.5)
        let even = stats(&feed(None, &[0, -10, -35]));
        assert_eq!(even.median_interval(), 17);
    }

    #[test]
    fn test_item_dates_fall_back_to_feed_then_now() {
        let with_feed_date = stats(
            &FeedSnapshot::new(at(-DAY))
                .with_item(None)
                .with_item(at(-3 * DAY)),
        );
        assert_eq!(with_feed_date.intervals(), &[2 * DAY]);
        assert_eq!(with_feed_date.newest_item_date(), NOW - DAY);

        let without_dates = stats(&FeedSnapshot::new(None).with_item(None).with_item(at(-DAY)));
        assert_eq!(without_dates.intervals(), &[DAY]);
        assert_eq!(without_dates.newest_item_date(), NOW);
    }

    #[test]
    fn test_newest_item_date_is_clamped_to_now() {
        let stats = stats(&feed(None, &[5 * DAY, -DAY]));
        assert_eq!(stats.newest_item_date(), NOW);
        assert_eq!(stats.intervals(), &[6 * DAY]);

        let empty_future = stats_for_empty(Some(2 * DAY));
        assert_eq!(empty_future.newest_item_date(), NOW);
    }

    fn stats_for_empty(feed_offset: Option<i64>) -> UpdateStats {
        stats(&feed(feed_offset, &[]))
    }

    #[test]
    fn test_empty_feed_uses_feed_date() {
        assert_eq!(stats_for_empty(Some(-3 * DAY)).newest_item_date(), NOW - 3 * DAY);
        assert_eq!(stats_for_empty(None).newest_item_date(), NOW);
        assert_eq!(
            stats_for_empty(None).compute_next_update_timestamp(&SchedulePolicy::default()),
            NOW + HOUR
        );
    }

    #[test]
    fn test_smaller_candidate_wins_when_in_future() {
        // intervals [1d x4, 100d]: average 69120 < median 86400
        let stats = stats(&feed(None, &[0, -DAY, -2 * DAY, -3 * DAY, -4 * DAY, -104 * DAY]));
        assert_eq!(
            stats.compute_next_update_timestamp(&SchedulePolicy::default()),
            NOW + (69120.0 * 1.1_f64) as i64
        );
    }

    #[test]
    fn test_larger_candidate_used_when_smaller_is_past() {
        // intervals [1h, 1h, 5d]: median 3600, average 146400
        let stats = stats(&feed(
            None,
            &[-DAY, -DAY - HOUR, -DAY - 2 * HOUR, -DAY - 2 * HOUR - 5 * DAY],
        ));
        assert_eq!(stats.median_interval(), HOUR);
        assert_eq!(stats.average_interval(), 146400);
        assert_eq!(
            stats.compute_next_update_timestamp(&SchedulePolicy::default()),
            NOW - DAY + 161040
        );
    }

    #[test]
    fn test_falls_back_to_min_delay() {
        // intervals [1h, 1h], newest item 2 days old: both projections are in the past
        let stats = stats(&feed(None, &[-2 * DAY, -2 * DAY - HOUR, -2 * DAY - 2 * HOUR]));
        assert_eq!(stats.compute_next_update_timestamp(&SchedulePolicy::default()), NOW + HOUR);

        let custom = SchedulePolicy::default().with_min_delay(600);
        assert_eq!(stats.compute_next_update_timestamp(&custom), NOW + 600);
    }

    #[test]
    fn test_next_update_always_after_now() {
        let feeds = [
            feed(None, &[]),
            feed(Some(-DAY), &[0]),
            feed(None, &[0, 0, 0]),
            feed(None, &[-30 * DAY, -31 * DAY]),
            feed(None, &[10 * DAY, 20 * DAY]),
            feed(Some(-HOUR), &[-HOUR, -2 * HOUR, -3 * HOUR]),
        ];
        let policies = [
            SchedulePolicy::default(),
            SchedulePolicy::default().with_min_delay(0).with_sleepy_delay(0),
            SchedulePolicy::default().with_margin_ratio(0.0),
        ];
        for feed in &feeds {
            for policy in &policies {
                let stats = stats(feed);
                assert!(
                    stats.compute_next_update_timestamp(policy) > NOW,
                    "{:?} with {:?}",
                    stats,
                    policy
                );
                assert!(stats.compute_next_update(policy).timestamp() > NOW);
            }
        }
    }

    #[test]
    fn test_stats_from_feed_rs() {
        let xml = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example</title>
  <id>urn:example</id>
  <updated>2025-01-04T00:00:00Z</updated>
  <entry><id>1</id><title>a</title><updated>2025-01-04T00:00:00Z</updated></entry>
  <entry><id>2</id><title>b</title><updated>2025-01-03T00:00:00Z</updated></entry>
  <entry><id>3</id><title>c</title><updated>2025-01-01T00:00:00Z</updated></entry>
</feed>"#;
        let parsed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        let stats = UpdateStats::with_clock(&parsed, Arc::new(FixedClock::at_timestamp(NOW)));

        assert_eq!(stats.intervals(), &[DAY, 2 * DAY]);
        assert_eq!(
            stats.newest_item_date(),
            Utc.with_ymd_and_hms(2025, 1, 4, 0, 0, 0).unwrap().timestamp()
        );
    }
}
