use serde::{Deserialize, Serialize};

/// Delay applied when neither the average nor the median interval lands in the future.
pub const DEFAULT_MIN_DELAY: i64 = 3600;

/// Delay applied once a feed is considered sleepy.
pub const DEFAULT_SLEEPY_DELAY: i64 = 86400;

/// Inactivity after which a feed is considered sleepy.
pub const DEFAULT_DURATION_BEFORE_BEING_SLEEPY: i64 = 7 * 86400;

pub const DEFAULT_MARGIN_RATIO: f64 = 0.1;

/// Tunables for [`UpdateStats::compute_next_update`](super::UpdateStats::compute_next_update).
///
/// All durations are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulePolicy {
    pub min_delay: i64,
    pub sleepy_delay: i64,
    pub sleepy_duration: i64,
    pub margin_ratio: f64,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            sleepy_delay: DEFAULT_SLEEPY_DELAY,
            sleepy_duration: DEFAULT_DURATION_BEFORE_BEING_SLEEPY,
            margin_ratio: DEFAULT_MARGIN_RATIO,
        }
    }
}

impl SchedulePolicy {
    pub fn with_min_delay(mut self, min_delay: i64) -> Self {
        self.min_delay = min_delay;
        self
    }

    pub fn with_sleepy_delay(mut self, sleepy_delay: i64) -> Self {
        self.sleepy_delay = sleepy_delay;
        self
    }

    pub fn with_sleepy_duration(mut self, sleepy_duration: i64) -> Self {
        self.sleepy_duration = sleepy_duration;
        self
    }

    pub fn with_margin_ratio(mut self, margin_ratio: f64) -> Self {
        self.margin_ratio = margin_ratio;
        self
    }

    /// Seconds to wait before retrying a feed after `failures` consecutive failed checks.
    ///
    /// Doubles from `min_delay` on each failure and never exceeds `sleepy_delay`
    /// (or `min_delay`, whichever is larger).
    pub fn retry_delay(&self, failures: u32) -> i64 {
        let base = self.min_delay.max(1);
        let exponent = failures.saturating_sub(1).min(32);
        let delay = base.saturating_mul(1_i64 << exponent);
        delay.min(self.sleepy_delay.max(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = SchedulePolicy::default();
        assert_eq!(policy.min_delay, 3600);
        assert_eq!(policy.sleepy_delay, 86400);
        assert_eq!(policy.sleepy_duration, 604800);
        assert_eq!(policy.margin_ratio, 0.1);
    }

    #[test]
    fn test_retry_delay_exponential_growth() {
        let policy = SchedulePolicy::default();
        assert_eq!(policy.retry_delay(0), 3600);
        assert_eq!(policy.retry_delay(1), 3600);
        assert_eq!(policy.retry_delay(2), 7200);
        assert_eq!(policy.retry_delay(3), 14400);
        assert_eq!(policy.retry_delay(5), 57600);
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let policy = SchedulePolicy::default();
        assert_eq!(policy.retry_delay(6), 86400);
        assert_eq!(policy.retry_delay(u32::MAX), 86400);

        // A sleepy delay shorter than the minimum delay does not shrink retries
        let inverted = SchedulePolicy::default().with_min_delay(600).with_sleepy_delay(60);
        assert_eq!(inverted.retry_delay(4), 600);
    }

    #[test]
    fn test_retry_delay_zero_min_delay() {
        let policy = SchedulePolicy::default().with_min_delay(0);
        assert_eq!(policy.retry_delay(1), 1);
        assert_eq!(policy.retry_delay(3), 4);
    }

    #[test]
    fn test_builders() {
        let policy = SchedulePolicy::default()
            .with_min_delay(60)
            .with_sleepy_delay(7200)
            .with_sleepy_duration(86400)
            .with_margin_ratio(0.25);
        assert_eq!(
            policy,
            SchedulePolicy {
                min_delay: 60,
                sleepy_delay: 7200,
                sleepy_duration: 86400,
                margin_ratio: 0.25,
            }
        );
    }
}
