//! Data provider capability
//!
//! The only seam between the feed and wherever its items come from. Swapping
//! [`MockProvider`](crate::MockProvider) for a network-backed provider does not
//! touch the controller.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::ids::IdAllocator;
use crate::item::FeedItem;

/// Restriction applied to every item of a page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedFilter {
    /// Only items written by the author with this username
    Author(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of items wanted
    pub count: usize,
    pub filter: Option<FeedFilter>,
}

impl PageRequest {
    pub fn new(count: usize) -> Self {
        Self { count, filter: None }
    }

    pub fn with_filter(mut self, filter: Option<FeedFilter>) -> Self {
        self.filter = filter;
        self
    }
}

/// Produces the items of one page.
///
/// Implementations must take every id from `ids`, one per item, so ids stay
/// under the control of whoever owns the allocator.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        ids: &dyn IdAllocator,
    ) -> Result<Vec<FeedItem>, ProviderError>;
}
