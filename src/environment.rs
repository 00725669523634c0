use anyhow::{anyhow, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::fetch::TransportConfig;
use crate::schedule::SchedulePolicy;

/// Runtime configuration of the feed poller.
#[derive(Debug, Clone)]
pub struct Config {
    pub feed_urls: Vec<String>,
    pub transport: TransportConfig,
    pub max_concurrent_fetches: usize,
    pub poll_tick: Duration,
    pub policy: SchedulePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_urls: Vec::new(),
            transport: TransportConfig::default(),
            max_concurrent_fetches: 8,
            poll_tick: Duration::from_secs(60),
            policy: SchedulePolicy::default(),
        }
    }
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// - `FEED_URLS`: `;`-separated feed URLs
    /// - `FETCH_TIMEOUT_SECS`, `FETCH_USER_AGENT`
    /// - `MAX_CONCURRENT_FETCHES`, `POLL_TICK_SECS`
    /// - `SCHEDULE_MIN_DELAY`, `SCHEDULE_SLEEPY_DELAY`
    /// - `SCHEDULE_SLEEPY_DURATION`, `SCHEDULE_MARGIN_RATIO`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let feed_urls = list_or_empty(&lookup, "FEED_URLS", ';');

        let timeout_secs = parse_or(
            &lookup,
            "FETCH_TIMEOUT_SECS",
            defaults.transport.timeout.as_secs(),
        )?;
        let transport = TransportConfig {
            timeout: Duration::from_secs(timeout_secs),
            user_agent: lookup("FETCH_USER_AGENT")
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or(defaults.transport.user_agent),
        };

        let max_concurrent_fetches = parse_or(
            &lookup,
            "MAX_CONCURRENT_FETCHES",
            defaults.max_concurrent_fetches,
        )?;
        if max_concurrent_fetches == 0 {
            return Err(anyhow!("MAX_CONCURRENT_FETCHES must be at least 1"));
        }

        let policy = SchedulePolicy {
            min_delay: parse_or(&lookup, "SCHEDULE_MIN_DELAY", defaults.policy.min_delay)?,
            sleepy_delay: parse_or(&lookup, "SCHEDULE_SLEEPY_DELAY", defaults.policy.sleepy_delay)?,
            sleepy_duration: parse_or(
                &lookup,
                "SCHEDULE_SLEEPY_DURATION",
                defaults.policy.sleepy_duration,
            )?,
            margin_ratio: parse_or(&lookup, "SCHEDULE_MARGIN_RATIO", defaults.policy.margin_ratio)?,
        };
        if policy.min_delay <= 0 || policy.sleepy_delay <= 0 {
            return Err(anyhow!("SCHEDULE_MIN_DELAY and SCHEDULE_SLEEPY_DELAY must be positive"));
        }
        if policy.sleepy_duration < 0 || policy.margin_ratio < 0.0 {
            return Err(anyhow!(
                "SCHEDULE_SLEEPY_DURATION and SCHEDULE_MARGIN_RATIO must not be negative"
            ));
        }

        let poll_tick_secs = parse_or(&lookup, "POLL_TICK_SECS", defaults.poll_tick.as_secs())?;

        Ok(Self {
            feed_urls,
            transport,
            max_concurrent_fetches,
            poll_tick: Duration::from_secs(poll_tick_secs),
            policy,
        })
    }
}

/// Splits a variable on `delimiter`, dropping blank entries. Unset means empty.
fn list_or_empty<F>(lookup: &F, name: &str, delimiter: char) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| {
            value
                .split(delimiter)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value {:?} for {}: {}", value, name, e)),
        _ => Ok(default),
    }
}
