//! Feed item records

use serde::{Deserialize, Serialize};

/// Identifier assigned to an item by the page source when it is produced
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub username: String,
    pub avatar_url: String,
}

/// Interaction counters shown under an item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub replies: u32,
    pub retweets: u32,
    pub likes: u32,
    pub views: u32,
}

/// One entry of the feed.
///
/// Everything except the two viewer flags and their paired counters is fixed
/// once the page source produces the item. Use [`toggle_like`](Self::toggle_like)
/// and [`toggle_retweet`](Self::toggle_retweet) to keep flag and counter in step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: ItemId,
    pub author: Author,
    pub text: String,
    /// Relative time label ("5m", "2h", ...)
    pub time_label: String,
    pub engagement: Engagement,
    pub images: Vec<String>,
    /// Viewer has liked this item
    pub liked: bool,
    /// Viewer has retweeted this item
    pub retweeted: bool,
}

impl FeedItem {
    /// First attached image, if any
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Flip the liked flag and move the like counter with it. Returns the new flag.
    pub fn toggle_like(&mut self) -> bool {
        self.liked = !self.liked;
        self.engagement.likes = step(self.engagement.likes, self.liked);
        self.liked
    }

    /// Flip the retweeted flag and move the retweet counter with it. Returns the new flag.
    pub fn toggle_retweet(&mut self) -> bool {
        self.retweeted = !self.retweeted;
        self.engagement.retweets = step(self.engagement.retweets, self.retweeted);
        self.retweeted
    }
}

fn step(count: u32, up: bool) -> u32 {
    if up {
        count.saturating_add(1)
    } else {
        count.saturating_sub(1)
    }
}
