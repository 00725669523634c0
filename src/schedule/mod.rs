//! Next-fetch prediction from a feed's publication history.

mod policy;
mod stats;

pub use self::policy::{
    SchedulePolicy, DEFAULT_DURATION_BEFORE_BEING_SLEEPY, DEFAULT_MARGIN_RATIO, DEFAULT_MIN_DELAY,
    DEFAULT_SLEEPY_DELAY,
};
pub use self::stats::UpdateStats;
