//! Feed parsing for RSS, Atom and JSON Feed documents.

use anyhow::{anyhow, Result};
use feed_rs::model::Feed;
use feed_rs::parser;
use tracing::debug;

use super::types::EntryInfo;
use super::util::{cleanup_xml, looks_like_feed, text_preview};
use crate::TARGET_WEB_REQUEST;

/// Parse a feed body, retrying once on a cleaned-up copy of malformed XML.
pub fn parse_feed(body: &[u8], url: &str) -> Result<Feed> {
    parse_feed_reporting_cleanup(body, url).map(|(feed, _)| feed)
}

/// Like [`parse_feed`], also reporting whether the XML cleanup pass was needed.
pub fn parse_feed_reporting_cleanup(body: &[u8], url: &str) -> Result<(Feed, bool)> {
    let first_err = match parser::parse(body) {
        Ok(feed) => return Ok((feed, false)),
        Err(err) => err,
    };

    let text = String::from_utf8_lossy(body);
    if !looks_like_feed(&text) {
        return Err(anyhow!(
            "Feed doesn't appear to be RSS or Atom ({}). Content preview: {}",
            first_err,
            text_preview(body, 100)
        ));
    }

    debug!(
        target: TARGET_WEB_REQUEST,
        "Retrying parse of {} after XML cleanup: {}",
        url,
        first_err
    );
    let cleaned = cleanup_xml(&text);
    match parser::parse(cleaned.as_bytes()) {
        Ok(feed) => Ok((feed, true)),
        Err(second_err) => Err(anyhow!(
            "Failed to parse feed even after cleanup. First error: {}. Second error: {}",
            first_err,
            second_err
        )),
    }
}

/// Title, link and date of every entry, in document order.
pub fn entry_infos(feed: &Feed) -> Vec<EntryInfo> {
    feed.entries
        .iter()
        .map(|entry| EntryInfo {
            title: entry.title.as_ref().map(|t| t.content.clone()),
            url: entry.links.first().map(|link| link.href.clone()),
            pub_date: entry.published.or(entry.updated).map(|d| d.to_rfc3339()),
        })
        .collect()
}
