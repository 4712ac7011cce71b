//! Infinite Feed - visibility-triggered incremental feed loading
//!
//! A [`FeedController`] owns an append-only list of [`FeedItem`]s. The
//! presentation layer renders that list, marks its last rendered item as the
//! [`Sentinel`], and the controller's [`VisibilityTrigger`] asks the
//! [`PageSource`] for the next page once the sentinel scrolls into view.
//!
//! Where the items come from is decided by a [`DataProvider`]; [`MockProvider`]
//! synthesizes them from fixed tables with simulated latency.

pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod item;
pub mod mock;
pub mod provider;
pub mod source;
pub mod trigger;

pub use config::{FeedConfig, TriggerConfig};
pub use controller::{FeedController, FeedPhase, FeedState, FetchOutcome};
pub use error::{FeedError, IdError, ProviderError};
pub use geometry::{Bounds, Span};
pub use ids::{IdAllocator, SequentialIds, SnowflakeIds};
pub use item::{Author, Engagement, FeedItem, ItemId};
pub use mock::MockProvider;
pub use provider::{DataProvider, FeedFilter, PageRequest};
pub use source::{Page, PageSource};
pub use trigger::{FetchSignal, Sentinel, VisibilityTrigger};

// Re-exported so hosts can build sentinel bounds signals without a direct dependency
pub use ankurah_signals;
