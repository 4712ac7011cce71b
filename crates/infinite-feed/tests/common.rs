//! Test utilities for infinite-feed integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tracing::Level;

// Re-export useful types
pub use infinite_feed::ankurah_signals::{Mut, Peek, Subscribe};
pub use infinite_feed::{
    Bounds, DataProvider, FeedConfig, FeedController, FeedError, FeedFilter, FeedItem, FeedPhase,
    FetchOutcome, FetchSignal, IdAllocator, ItemId, MockProvider, PageRequest, ProviderError,
    Sentinel, SequentialIds, Span, TriggerConfig, VisibilityTrigger,
};

/// Viewport height used by every sentinel in these tests
pub const VIEWPORT: u32 = 500;
/// Height of one rendered row
pub const ROW: u32 = 50;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
}

/// Feed config with the given page size and budget and default trigger geometry
pub fn config(page_size: usize, max_pages: u32) -> FeedConfig {
    FeedConfig::default()
        .with_page_size(page_size)
        .with_max_pages(max_pages)
}

/// Seeded mock with no simulated latency
pub fn instant_mock() -> MockProvider {
    MockProvider::seeded(Duration::ZERO, 7)
}

/// Poll `condition` every millisecond, panicking if it does not hold within 500ms
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let reached = tokio::time::timeout(Duration::from_millis(500), async move {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "condition not reached within 500ms");
}

/// Assert that no signal arrives within 20ms
pub async fn assert_no_signal(rx: &mut mpsc::UnboundedReceiver<FetchSignal>) {
    match tokio::time::timeout(Duration::from_millis(20), rx.recv()).await {
        Ok(Some(signal)) => panic!("unexpected signal from sentinel {}", signal.sentinel),
        Ok(None) => {} // channel closed - nothing can arrive
        Err(_) => {}   // timeout - good
    }
}

/// Wait up to 500ms for the next signal
pub async fn expect_signal(rx: &mut mpsc::UnboundedReceiver<FetchSignal>) -> FetchSignal {
    match tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
        Ok(Some(signal)) => signal,
        Ok(None) => panic!("signal channel closed"),
        Err(_) => panic!("expected signal did not arrive within 500ms"),
    }
}

// ============================================================================
// FakeSentinel
// ============================================================================

/// Stands in for the rendered last row: owns the bounds signal a renderer
/// would update as the user scrolls.
pub struct FakeSentinel {
    pub item: ItemId,
    bounds: Mut<Bounds>,
}

impl FakeSentinel {
    /// Sentinel row far below the viewport
    pub fn hidden(item: ItemId) -> Self {
        Self {
            item,
            bounds: Mut::new(Self::at(1000)),
        }
    }

    /// Sentinel row already inside the viewport
    pub fn visible(item: ItemId) -> Self {
        Self {
            item,
            bounds: Mut::new(Self::at(400)),
        }
    }

    fn at(top: i32) -> Bounds {
        Bounds::new(Span::new(top, ROW), Span::new(0, VIEWPORT))
    }

    /// Handle to give to a trigger or controller
    pub fn sentinel(&self) -> Sentinel {
        Sentinel::new(self.item, self.bounds.read())
    }

    /// Move the row so its top edge sits at `top` relative to the viewport
    pub fn move_to(&self, top: i32) {
        self.bounds.set(Self::at(top));
    }

    pub fn scroll_into_view(&self) {
        self.move_to(400);
    }

    pub fn scroll_out_of_view(&self) {
        self.move_to(1000);
    }
}

// ============================================================================
// Providers
// ============================================================================

/// Mock provider that counts calls
pub struct CountingProvider {
    inner: MockProvider,
    calls: AtomicUsize,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self {
            inner: instant_mock(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for CountingProvider {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        ids: &dyn IdAllocator,
    ) -> Result<Vec<FeedItem>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_page(request, ids).await
    }
}

/// Provider that holds every fetch until released, to keep a fetch in flight
pub struct GatedProvider {
    inner: MockProvider,
    gate: Notify,
    calls: AtomicUsize,
}

impl GatedProvider {
    pub fn new() -> Self {
        Self {
            inner: instant_mock(),
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Let one waiting (or the next) fetch complete
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for GatedProvider {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        ids: &dyn IdAllocator,
    ) -> Result<Vec<FeedItem>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.inner.fetch_page(request, ids).await
    }
}

/// Provider that fails with queued errors before falling back to the mock
pub struct ScriptedProvider {
    inner: MockProvider,
    failures: Mutex<VecDeque<ProviderError>>,
}

impl ScriptedProvider {
    pub fn failing_with(failures: impl IntoIterator<Item = ProviderError>) -> Self {
        Self {
            inner: instant_mock(),
            failures: Mutex::new(failures.into_iter().collect()),
        }
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        ids: &dyn IdAllocator,
    ) -> Result<Vec<FeedItem>, ProviderError> {
        let failure = self.failures.lock().unwrap().pop_front();
        match failure {
            Some(error) => Err(error),
            None => self.inner.fetch_page(request, ids).await,
        }
    }
}

/// Ids of every item in the controller, in list order
pub fn item_ids(controller: &FeedController) -> Vec<u64> {
    controller.snapshot().items.iter().map(|item| item.id.0).collect()
}

/// Shared handle for spawning controller tasks
pub fn shared(controller: FeedController) -> Arc<FeedController> {
    Arc::new(controller)
}
