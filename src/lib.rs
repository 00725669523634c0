pub mod clock;
pub mod environment;
pub mod feed;
pub mod fetch;
pub mod logging;
pub mod rss;
pub mod schedule;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_SCHEDULE: &str = "schedule";
