//! Item id allocation
//!
//! Ids are handed to the page source explicitly instead of living in a
//! process-wide counter, so two controllers only share an id space when they
//! are given the same allocator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::IdError;
use crate::item::ItemId;

/// Source of fresh item ids. Every call returns an id larger than any id the
/// same allocator returned before.
pub trait IdAllocator: Send + Sync {
    fn allocate(&self) -> Result<ItemId, IdError>;
}

// ============================================================================
// Sequential
// ============================================================================

/// Counter starting at 1, the default allocator of a feed controller
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self { next: AtomicU64::new(first) }
    }

    /// The id the next call to `allocate` will return
    pub fn peek_next(&self) -> ItemId {
        ItemId(self.next.load(Ordering::Acquire))
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for SequentialIds {
    fn allocate(&self) -> Result<ItemId, IdError> {
        Ok(ItemId(self.next.fetch_add(1, Ordering::AcqRel)))
    }
}

// ============================================================================
// Snowflake
// ============================================================================

const DATACENTER_BITS: u32 = 5;
const WORKER_BITS: u32 = 5;
const SEQUENCE_BITS: u32 = 12;

const MAX_DATACENTER: u64 = (1 << DATACENTER_BITS) - 1;
const MAX_WORKER: u64 = (1 << WORKER_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

const WORKER_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS + DATACENTER_BITS;

/// How long `allocate` waits for the clock once a millisecond's sequence is used up
const SEQUENCE_WAIT: Duration = Duration::from_millis(5);

/// 2024-01-01T00:00:00Z in unix milliseconds
pub const SNOWFLAKE_EPOCH_MS: u64 = 1_704_067_200_000;

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

/// Time-ordered ids unique across processes, for feeds whose items outlive
/// one controller.
///
/// Layout, most significant first: 41 bits of milliseconds since
/// [`SNOWFLAKE_EPOCH_MS`], 5 bits datacenter, 5 bits worker, 12 bits sequence.
pub struct SnowflakeIds {
    datacenter: u64,
    worker: u64,
    clock: Clock,
    last: Mutex<Option<(u64, u64)>>,
}

/// Fields packed into a snowflake id
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnowflakeParts {
    pub timestamp_ms: u64,
    pub datacenter: u64,
    pub worker: u64,
    pub sequence: u64,
}

impl SnowflakeIds {
    pub fn new(datacenter: u64, worker: u64) -> Result<Self, IdError> {
        Self::with_clock(datacenter, worker, system_millis)
    }

    /// Allocator with a caller-supplied millisecond clock (unix epoch)
    pub fn with_clock(
        datacenter: u64,
        worker: u64,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Result<Self, IdError> {
        if datacenter > MAX_DATACENTER {
            return Err(IdError::OutOfRange { field: "datacenter", value: datacenter, max: MAX_DATACENTER });
        }
        if worker > MAX_WORKER {
            return Err(IdError::OutOfRange { field: "worker", value: worker, max: MAX_WORKER });
        }
        tracing::debug!("snowflake allocator datacenter={} worker={}", datacenter, worker);
        Ok(Self {
            datacenter,
            worker,
            clock: Box::new(clock),
            last: Mutex::new(None),
        })
    }

    /// Allocator with a randomly chosen datacenter and worker
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Self {
            datacenter: rng.gen_range(0..=MAX_DATACENTER),
            worker: rng.gen_range(0..=MAX_WORKER),
            clock: Box::new(system_millis),
            last: Mutex::new(None),
        }
    }

    pub fn decompose(id: ItemId) -> SnowflakeParts {
        SnowflakeParts {
            timestamp_ms: (id.0 >> TIMESTAMP_SHIFT) + SNOWFLAKE_EPOCH_MS,
            datacenter: (id.0 >> DATACENTER_SHIFT) & MAX_DATACENTER,
            worker: (id.0 >> WORKER_SHIFT) & MAX_WORKER,
            sequence: id.0 & MAX_SEQUENCE,
        }
    }

    fn now(&self) -> u64 {
        (self.clock)().saturating_sub(SNOWFLAKE_EPOCH_MS)
    }
}

impl IdAllocator for SnowflakeIds {
    fn allocate(&self) -> Result<ItemId, IdError> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let mut now = self.now();

        let sequence = match *last {
            Some((last_ms, _)) if now < last_ms => {
                return Err(IdError::ClockMovedBackwards { by_ms: last_ms - now });
            }
            Some((last_ms, last_sequence)) if now == last_ms => {
                let next = (last_sequence + 1) & MAX_SEQUENCE;
                if next == 0 {
                    let deadline = Instant::now() + SEQUENCE_WAIT;
                    while now <= last_ms {
                        if Instant::now() >= deadline {
                            tracing::warn!("snowflake sequence exhausted, clock stuck at {}ms", last_ms);
                            return Err(IdError::SequenceExhausted {
                                at_ms: last_ms + SNOWFLAKE_EPOCH_MS,
                            });
                        }
                        std::hint::spin_loop();
                        now = self.now();
                    }
                }
                next
            }
            _ => 0,
        };

        *last = Some((now, sequence));
        Ok(ItemId(
            (now << TIMESTAMP_SHIFT)
                | (self.datacenter << DATACENTER_SHIFT)
                | (self.worker << WORKER_SHIFT)
                | sequence,
        ))
    }
}

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
