//! Feed polling, parsing and diagnostics built on the fetch and schedule modules.

mod fetcher;
mod parser;
mod types;
mod util;

pub use self::types::*;

pub use self::fetcher::{rss_loop, FeedPoller, FeedState};
pub use self::parser::{entry_infos, parse_feed, parse_feed_reporting_cleanup};
pub use self::test::test_rss_feed;
pub use self::util::{cleanup_xml, hex_preview, is_valid_url, looks_like_feed, text_preview};
