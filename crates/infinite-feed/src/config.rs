//! Feed and trigger configuration
//!
//! Both structs deserialize with every field optional, so a host can load them
//! from whatever serde format it already uses.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_PAGES: u32 = 10;
pub const DEFAULT_ROOT_MARGIN: u32 = 100;
pub const DEFAULT_THRESHOLD: f64 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Items requested per page
    pub page_size: usize,
    /// Pages after which the feed reports no more items
    pub max_pages: u32,
    pub trigger: TriggerConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            trigger: TriggerConfig::default(),
        }
    }
}

impl FeedConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Copy with out-of-range values pulled back into range
    pub fn sanitized(&self) -> Self {
        Self {
            page_size: self.page_size.max(1),
            max_pages: self.max_pages.max(1),
            trigger: self.trigger.sanitized(),
        }
    }
}

/// When the sentinel counts as visible
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Lookahead added around the scroll root on every side
    pub root_margin: u32,
    /// Fraction of the sentinel that must intersect, in (0, 1]
    pub threshold: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            root_margin: DEFAULT_ROOT_MARGIN,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl TriggerConfig {
    pub fn sanitized(&self) -> Self {
        let threshold = if self.threshold.is_finite() && self.threshold > 0.0 {
            self.threshold.min(1.0)
        } else {
            DEFAULT_THRESHOLD
        };
        Self {
            root_margin: self.root_margin,
            threshold,
        }
    }
}
