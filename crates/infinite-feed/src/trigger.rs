//! Visibility Trigger
//!
//! Watches the sentinel's bounds signal and sends a [`FetchSignal`] when the
//! sentinel goes from hidden to visible. Each observed sentinel gets its own
//! subscription handle; observing a new sentinel drops the old handle before
//! anything else happens.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ankurah_signals::{Peek, Read, Subscribe, SubscriptionGuard};
use tokio::sync::mpsc;

use crate::config::TriggerConfig;
use crate::geometry::{self, Bounds};
use crate::item::ItemId;

/// The last rendered item together with its live position
pub struct Sentinel {
    pub item: ItemId,
    pub bounds: Read<Bounds>,
}

impl Sentinel {
    pub fn new(item: ItemId, bounds: Read<Bounds>) -> Self {
        Self { item, bounds }
    }
}

/// Request to load the next page, raised by the sentinel `sentinel`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchSignal {
    pub sentinel: ItemId,
}

/// Caller-owned flags consulted on every bounds change
#[derive(Debug)]
struct Gate {
    busy: AtomicBool,
    has_more: AtomicBool,
}

struct Observation {
    sentinel: ItemId,
    _guard: SubscriptionGuard,
}

/// State shared with one subscription's listener
struct Watcher {
    sentinel: ItemId,
    config: TriggerConfig,
    gate: Arc<Gate>,
    sender: mpsc::UnboundedSender<FetchSignal>,
    was_visible: AtomicBool,
}

impl Watcher {
    fn on_bounds(&self, bounds: Bounds) {
        let visible = geometry::is_visible(bounds, self.config.root_margin, self.config.threshold);
        let was_visible = self.was_visible.swap(visible, Ordering::AcqRel);
        if !visible || was_visible {
            return;
        }

        // The transition is consumed even when it cannot signal
        if self.gate.busy.load(Ordering::Acquire) {
            tracing::debug!("sentinel {} visible while busy, signal suppressed", self.sentinel);
            return;
        }
        if !self.gate.has_more.load(Ordering::Acquire) {
            tracing::debug!("sentinel {} visible but feed exhausted", self.sentinel);
            return;
        }

        tracing::debug!("sentinel {} entered viewport", self.sentinel);
        if self.sender.send(FetchSignal { sentinel: self.sentinel }).is_err() {
            tracing::debug!("fetch signal dropped, receiver closed");
        }
    }
}

pub struct VisibilityTrigger {
    config: TriggerConfig,
    gate: Arc<Gate>,
    sender: Mutex<Option<mpsc::UnboundedSender<FetchSignal>>>,
    observation: Mutex<Option<Observation>>,
}

impl VisibilityTrigger {
    /// Create a trigger and the receiving end of its signals.
    ///
    /// The channel closes once the trigger is disposed or dropped.
    pub fn new(config: TriggerConfig) -> (Self, mpsc::UnboundedReceiver<FetchSignal>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let trigger = Self {
            config: config.sanitized(),
            gate: Arc::new(Gate {
                busy: AtomicBool::new(false),
                has_more: AtomicBool::new(true),
            }),
            sender: Mutex::new(Some(sender)),
            observation: Mutex::new(None),
        };
        (trigger, receiver)
    }

    pub fn config(&self) -> TriggerConfig {
        self.config
    }

    pub fn set_busy(&self, busy: bool) {
        self.gate.busy.store(busy, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.gate.busy.load(Ordering::Acquire)
    }

    pub fn set_has_more(&self, has_more: bool) {
        self.gate.has_more.store(has_more, Ordering::Release);
    }

    /// Item currently observed, if any
    pub fn observed(&self) -> Option<ItemId> {
        lock(&self.observation).as_ref().map(|o| o.sentinel)
    }

    /// Replace the observed sentinel.
    ///
    /// The previous subscription is always released. A new one is only taken
    /// when a sentinel is given and the caller is not busy; its current bounds
    /// are evaluated right away.
    pub fn observe(&self, sentinel: Option<Sentinel>) {
        let mut observation = lock(&self.observation);
        observation.take();

        let Some(sentinel) = sentinel else {
            tracing::debug!("no sentinel, observation cleared");
            return;
        };
        if self.is_busy() {
            tracing::debug!("busy, not observing sentinel {}", sentinel.item);
            return;
        }
        let Some(sender) = lock(&self.sender).clone() else {
            tracing::debug!("trigger disposed, not observing sentinel {}", sentinel.item);
            return;
        };

        let watcher = Arc::new(Watcher {
            sentinel: sentinel.item,
            config: self.config,
            gate: self.gate.clone(),
            sender,
            was_visible: AtomicBool::new(false),
        });

        let guard = {
            let watcher = watcher.clone();
            sentinel.bounds.subscribe(move |bounds: Bounds| watcher.on_bounds(bounds))
        };
        watcher.on_bounds(sentinel.bounds.peek());

        *observation = Some(Observation {
            sentinel: sentinel.item,
            _guard: guard,
        });
    }

    /// Stop observing without closing the signal channel
    pub fn disconnect(&self) {
        lock(&self.observation).take();
    }

    /// Release the subscription and close the signal channel
    pub fn dispose(&self) {
        self.disconnect();
        lock(&self.sender).take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
