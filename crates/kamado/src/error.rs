use thiserror::Error;

/// Every failure a caller of the engine can observe.
///
/// Errors are `Clone` because a single compute failure is fanned out to
/// every owner that had a slot in the failed batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServeError {
    /// The admission queue is at capacity. Not retried internally.
    #[error("queue full, try again later (capacity {capacity})")]
    QueueFull {
        capacity: usize
    },

    /// The prompt could not be turned into token ids.
    #[error("failed to encode prompt: {0}")]
    Encode(String),

    /// The produced token ids could not be turned back into text.
    #[error("failed to decode completion: {0}")]
    Decode(String),

    /// The compute resource returned an error or panicked while running a batch.
    #[error("batch compute failed: {0}")]
    Compute(String),

    /// The compute resource returned a batch of the wrong size, so slot
    /// positions can no longer be trusted as correlation keys.
    #[error("compute resource returned {actual} outputs for a batch of {expected} slots")]
    ShapeMismatch {
        expected: usize,
        actual: usize
    },

    /// The engine stopped before the request could be served.
    #[error("completion engine is shut down")]
    Shutdown,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ServeError>;
