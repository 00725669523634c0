//! The view of a parsed feed that the update scheduler needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait FeedItem {
    fn last_modified(&self) -> Option<DateTime<Utc>>;
}

/// Ordered feed items plus the feed-level timestamp used when an item has none.
pub trait FeedModel {
    type Item: FeedItem;

    fn items(&self) -> &[Self::Item];

    fn last_modified(&self) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub last_modified: Option<DateTime<Utc>>,
}

impl ItemSnapshot {
    pub fn new(last_modified: Option<DateTime<Utc>>) -> Self {
        Self { last_modified }
    }
}

impl FeedItem for ItemSnapshot {
    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }
}

/// Owned, format-independent copy of the timestamps of a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub last_modified: Option<DateTime<Utc>>,
    pub items: Vec<ItemSnapshot>,
}

impl FeedSnapshot {
    pub fn new(last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            last_modified,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, last_modified: Option<DateTime<Utc>>) -> Self {
        self.items.push(ItemSnapshot::new(last_modified));
        self
    }

    pub fn from_model<F: FeedModel + ?Sized>(feed: &F) -> Self {
        Self {
            last_modified: feed.last_modified(),
            items: feed
                .items()
                .iter()
                .map(|item| ItemSnapshot::new(item.last_modified()))
                .collect(),
        }
    }
}

impl FeedModel for FeedSnapshot {
    type Item = ItemSnapshot;

    fn items(&self) -> &[ItemSnapshot] {
        &self.items
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }
}

impl FeedItem for feed_rs::model::Entry {
    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated.or(self.published)
    }
}

impl FeedModel for feed_rs::model::Feed {
    type Item = feed_rs::model::Entry;

    fn items(&self) -> &[feed_rs::model::Entry] {
        &self.entries
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated.or(self.published)
    }
}
