//! Page Source
//!
//! Binds a provider to an id allocator and a page budget. The source keeps no
//! notion of exhaustion: whether more pages exist is decided purely from the
//! page number the caller asks for.

use std::sync::Arc;

use crate::error::ProviderError;
use crate::ids::IdAllocator;
use crate::item::FeedItem;
use crate::provider::{DataProvider, FeedFilter, PageRequest};

/// Items of one completed fetch
#[derive(Clone, Debug)]
pub struct Page {
    pub items: Vec<FeedItem>,
    pub has_more: bool,
}

pub struct PageSource {
    provider: Arc<dyn DataProvider>,
    ids: Arc<dyn IdAllocator>,
    page_size: usize,
    max_pages: u32,
}

impl PageSource {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        ids: Arc<dyn IdAllocator>,
        page_size: usize,
        max_pages: u32,
    ) -> Self {
        Self {
            provider,
            ids,
            page_size,
            max_pages,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Whether a page numbered `page_number` (1-based) leaves room for another
    pub fn has_more_after(&self, page_number: u32) -> bool {
        page_number < self.max_pages
    }

    /// Fetch page `page_number` (1-based)
    pub async fn fetch(
        &self,
        page_number: u32,
        filter: Option<&FeedFilter>,
    ) -> Result<Page, ProviderError> {
        let request = PageRequest::new(self.page_size).with_filter(filter.cloned());
        let items = self.provider.fetch_page(&request, self.ids.as_ref()).await?;

        if items.len() != self.page_size {
            tracing::debug!(
                "page {} returned {} items, requested {}",
                page_number,
                items.len(),
                self.page_size
            );
        }

        Ok(Page {
            items,
            has_more: self.has_more_after(page_number),
        })
    }
}
