//! Feed Controller - glue between the visibility trigger and the page source

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ankurah_signals::{Mut, Peek, Read};
use tokio::sync::{mpsc, Notify};

use crate::config::FeedConfig;
use crate::error::{FeedError, ProviderError};
use crate::ids::{IdAllocator, SequentialIds};
use crate::item::{FeedItem, ItemId};
use crate::provider::{DataProvider, FeedFilter};
use crate::source::PageSource;
use crate::trigger::{FetchSignal, Sentinel, VisibilityTrigger};

// ============================================================================
// Core Types
// ============================================================================

/// Where the controller is in its fetch cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedPhase {
    /// Waiting for a trigger signal
    Idle,
    /// One page request outstanding
    Fetching,
    /// Page budget used up; terminal
    Exhausted,
}

/// Snapshot of everything the presentation layer renders
#[derive(Clone, Debug)]
pub struct FeedState {
    /// Items in arrival order; only ever appended to
    pub items: Vec<FeedItem>,
    /// Completed pages
    pub pages: u32,
    pub phase: FeedPhase,
    pub has_more: bool,
    /// Failure of the most recent fetch, cleared by the next success
    pub last_error: Option<ProviderError>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pages: 0,
            phase: FeedPhase::Idle,
            has_more: true,
            last_error: None,
        }
    }
}

impl FeedState {
    pub fn is_fetching(&self) -> bool {
        self.phase == FeedPhase::Fetching
    }

    /// Id of the item that should serve as sentinel
    pub fn last_item(&self) -> Option<ItemId> {
        self.items.last().map(|item| item.id)
    }
}

/// Result of [`FeedController::fetch_next_page`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchOutcome {
    pub has_more: bool,
    /// Items appended by this call; zero when the feed was already exhausted
    pub appended: usize,
}

/// Holds the in-flight flag for one fetch.
///
/// Dropping it (including dropping the fetch future mid-await) releases the
/// flag and returns a still-fetching phase to idle.
struct FlightGuard<'a> {
    controller: &'a FeedController,
}

impl<'a> FlightGuard<'a> {
    fn acquire(controller: &'a FeedController) -> Option<Self> {
        controller
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { controller })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let controller = self.controller;
        controller.trigger.set_busy(false);
        if controller.state.peek().is_fetching() {
            tracing::debug!("fetch abandoned before completion");
            controller.update(|state| state.phase = FeedPhase::Idle);
        }
        controller.in_flight.store(false, Ordering::Release);
    }
}

// ============================================================================
// FeedController
// ============================================================================

pub struct FeedController {
    source: PageSource,
    config: FeedConfig,
    filter: Option<FeedFilter>,
    state: Mut<FeedState>,
    /// Serializes read-modify-write cycles on `state`
    writes: Mutex<()>,
    in_flight: AtomicBool,
    disposed: AtomicBool,
    shutdown: Notify,
    trigger: VisibilityTrigger,
    signals: Mutex<Option<mpsc::UnboundedReceiver<FetchSignal>>>,
}

impl FeedController {
    /// Create a controller with its own id sequence starting at 1
    ///
    /// # Arguments
    /// * `provider` - Where pages come from
    /// * `config` - Page size, page budget and trigger geometry
    pub fn new(provider: Arc<dyn DataProvider>, config: FeedConfig) -> Self {
        Self::with_ids(provider, Arc::new(SequentialIds::new()), config)
    }

    /// Create a controller drawing ids from a caller-owned allocator
    pub fn with_ids(
        provider: Arc<dyn DataProvider>,
        ids: Arc<dyn IdAllocator>,
        config: FeedConfig,
    ) -> Self {
        let config = config.sanitized();
        let source = PageSource::new(provider, ids, config.page_size, config.max_pages);
        let (trigger, signals) = VisibilityTrigger::new(config.trigger);

        Self {
            source,
            config,
            filter: None,
            state: Mut::new(FeedState::default()),
            writes: Mutex::new(()),
            in_flight: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            shutdown: Notify::new(),
            trigger,
            signals: Mutex::new(Some(signals)),
        }
    }

    /// Restrict every page to `filter`
    pub fn with_filter(mut self, filter: FeedFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    // Accessors
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn filter(&self) -> Option<&FeedFilter> {
        self.filter.as_ref()
    }

    /// Reactive view of the feed state.
    ///
    /// Listeners may call [`attach_sentinel`](Self::attach_sentinel) but must
    /// not call the toggle methods from inside the callback.
    pub fn state(&self) -> Read<FeedState> {
        self.state.read()
    }

    pub fn snapshot(&self) -> FeedState {
        self.state.peek()
    }

    pub fn phase(&self) -> FeedPhase {
        self.state.peek().phase
    }

    pub fn has_more(&self) -> bool {
        self.state.peek().has_more
    }

    /// Whether a `fetch_next_page` call currently holds the in-flight flag.
    ///
    /// Unlike [`FeedState::is_fetching`], this is also true while an exhausted
    /// feed answers a call without reaching the provider.
    pub fn has_fetch_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Item the presentation layer should mark as sentinel
    pub fn sentinel_item(&self) -> Option<ItemId> {
        self.state.peek().last_item()
    }

    /// Item the trigger is currently watching
    pub fn observed_sentinel(&self) -> Option<ItemId> {
        self.trigger.observed()
    }

    /// Load the first page. Does nothing once any page has been loaded.
    pub async fn start(&self) -> Result<FetchOutcome, FeedError> {
        let current = self.state.peek();
        if current.pages > 0 {
            return Ok(FetchOutcome {
                has_more: current.has_more,
                appended: 0,
            });
        }
        self.fetch_next_page().await
    }

    /// Fetch and append the next page.
    ///
    /// Returns `FetchInFlight` while another fetch is outstanding. Once the
    /// feed is exhausted, returns `has_more = false` without asking the
    /// provider. A provider failure leaves page count and `has_more` untouched
    /// so the same page can be requested again.
    pub async fn fetch_next_page(&self) -> Result<FetchOutcome, FeedError> {
        if self.is_disposed() {
            return Err(FeedError::Disposed);
        }
        let Some(flight) = FlightGuard::acquire(self) else {
            tracing::debug!("fetch rejected, another fetch is in flight");
            return Err(FeedError::FetchInFlight);
        };

        let (pages, has_more) = {
            let current = self.state.peek();
            (current.pages, current.has_more)
        };
        if !has_more {
            return Ok(FetchOutcome {
                has_more: false,
                appended: 0,
            });
        }

        let page_number = pages + 1;
        self.trigger.set_busy(true);
        self.update(|state| state.phase = FeedPhase::Fetching);
        tracing::debug!("fetching page {}/{}", page_number, self.source.max_pages());

        let result = self.source.fetch(page_number, self.filter.as_ref()).await;

        if self.is_disposed() {
            tracing::debug!("controller disposed during fetch, discarding page {}", page_number);
            drop(flight);
            return Err(FeedError::Disposed);
        }

        // Release the trigger before publishing so listeners can attach the new sentinel
        self.trigger.set_busy(false);

        let outcome = match result {
            Ok(page) => {
                let appended = page.items.len();
                let has_more = page.has_more;
                self.trigger.set_has_more(has_more);
                self.update(|state| {
                    state.items.extend(page.items);
                    state.pages = page_number;
                    state.has_more = has_more;
                    state.phase = if has_more { FeedPhase::Idle } else { FeedPhase::Exhausted };
                    state.last_error = None;
                });
                if has_more {
                    tracing::debug!("page {} appended {} items", page_number, appended);
                } else {
                    tracing::info!("feed exhausted after {} pages", page_number);
                }
                Ok(FetchOutcome { has_more, appended })
            }
            Err(e) => {
                tracing::warn!("page {} failed: {} (retryable={})", page_number, e, e.is_retryable());
                self.update(|state| {
                    state.phase = FeedPhase::Idle;
                    state.last_error = Some(e.clone());
                });
                Err(FeedError::Provider(e))
            }
        };

        drop(flight);
        outcome
    }

    /// Mark `sentinel` as the item to watch, replacing the previous one.
    ///
    /// `None` clears the observation. A sentinel that is not the current last
    /// item is stale and ignored.
    pub fn attach_sentinel(&self, sentinel: Option<Sentinel>) {
        if let Some(sentinel) = &sentinel {
            let last = self.sentinel_item();
            if last != Some(sentinel.item) {
                tracing::debug!("ignoring stale sentinel {} (last item {:?})", sentinel.item, last);
                return;
            }
        }
        self.trigger.observe(sentinel);
    }

    /// Consume trigger signals and fetch on each one until disposed.
    /// Generally this should be spawned, not awaited inline.
    pub async fn run(&self) {
        let Some(mut signals) = lock(&self.signals).take() else {
            tracing::warn!("run() called more than once, ignoring");
            return;
        };

        loop {
            if self.is_disposed() {
                break;
            }
            let signal = tokio::select! {
                signal = signals.recv() => signal,
                _ = self.shutdown.notified() => None,
            };
            let Some(signal) = signal else { break };

            // Signals queued before the last page landed name an old sentinel
            let observed = self.trigger.observed();
            let last = self.sentinel_item();
            if observed != Some(signal.sentinel) || last != Some(signal.sentinel) {
                tracing::debug!(
                    "dropping signal from stale sentinel {} (observed {:?}, last item {:?})",
                    signal.sentinel,
                    observed,
                    last
                );
                continue;
            }

            match self.fetch_next_page().await {
                Ok(outcome) => tracing::debug!(
                    "sentinel {} loaded {} items, has_more={}",
                    signal.sentinel,
                    outcome.appended,
                    outcome.has_more
                ),
                Err(FeedError::FetchInFlight) => {
                    tracing::debug!("sentinel {} ignored, fetch in flight", signal.sentinel)
                }
                Err(FeedError::Disposed) => break,
                Err(e) => tracing::error!("fetch for sentinel {} failed: {}", signal.sentinel, e),
            }
        }
        tracing::debug!("feed controller run loop finished");
    }

    /// Release the sentinel subscription and stop `run()`.
    ///
    /// A fetch still in flight completes but its page is discarded.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.trigger.dispose();
        self.shutdown.notify_one();
        tracing::debug!("feed controller disposed");
    }

    /// Toggle the viewer's like on an item. Returns the new flag, or `None`
    /// if no such item is loaded.
    pub fn toggle_like(&self, id: ItemId) -> Option<bool> {
        self.interact(id, FeedItem::toggle_like)
    }

    /// Toggle the viewer's retweet on an item. Returns the new flag, or `None`
    /// if no such item is loaded.
    pub fn toggle_retweet(&self, id: ItemId) -> Option<bool> {
        self.interact(id, FeedItem::toggle_retweet)
    }

    fn interact(&self, id: ItemId, toggle: fn(&mut FeedItem) -> bool) -> Option<bool> {
        if !self.state.peek().items.iter().any(|item| item.id == id) {
            return None;
        }
        self.update(|state| state.items.iter_mut().find(|item| item.id == id).map(toggle))
    }

    fn update<R>(&self, f: impl FnOnce(&mut FeedState) -> R) -> R {
        let _writes = lock(&self.writes);
        let mut state = self.state.peek();
        let result = f(&mut state);
        self.state.set(state);
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
