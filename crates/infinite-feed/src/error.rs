//! Error types for id allocation, page providers and the feed controller

/// Failure to hand out an item id
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("clock moved backwards by {by_ms}ms, refusing to allocate id")]
    ClockMovedBackwards { by_ms: u64 },

    /// Every sequence number of one millisecond is used and the clock did not advance
    #[error("id sequence exhausted at {at_ms}ms")]
    SequenceExhausted { at_ms: u64 },

    #[error("{field} {value} exceeds maximum {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Failure reported by a [`DataProvider`](crate::DataProvider).
///
/// Never used to signal the end of the feed; that is `has_more = false`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Transient failure; the same request may succeed later
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the request; retrying it unchanged will not help
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Id(#[from] IdError),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Unavailable(_) => true,
            ProviderError::Rejected(_) => false,
            ProviderError::Id(IdError::ClockMovedBackwards { .. }) => true,
            ProviderError::Id(IdError::SequenceExhausted { .. }) => true,
            ProviderError::Id(IdError::OutOfRange { .. }) => false,
        }
    }
}

/// Failure of a [`FeedController`](crate::FeedController) operation
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("a page fetch is already in flight")]
    FetchInFlight,

    #[error("feed controller has been disposed")]
    Disposed,

    #[error("page fetch failed: {0}")]
    Provider(#[from] ProviderError),
}

impl FeedError {
    /// Whether calling `fetch_next_page` again later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::FetchInFlight => true,
            FeedError::Disposed => false,
            FeedError::Provider(e) => e.is_retryable(),
        }
    }
}
