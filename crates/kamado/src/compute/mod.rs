//! # Compute Resource
//!
//! The model is an external collaborator. The engine only knows how to hand
//! it one full batch at a time and read back one output sequence per slot.
//!
//! Implementations own the expensive part of serving: weights, devices,
//! sampling. The batching worker calls [`ComputeResource::run_batch`] from a
//! single task and never overlaps two calls, so implementations need no
//! internal locking for that call. Long synchronous work should be moved off
//! the async executor (for example with `tokio::task::spawn_blocking`).

mod echo;

#[cfg(test)]
pub(crate) mod mock;

pub use echo::Echo;

use async_trait::async_trait;
use thiserror::Error;
use crate::error::ServeError;
use crate::request::SamplingParams;

/// Failure reported by a [`ComputeResource`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ComputeError(pub String);

impl From<ComputeError> for ServeError {
    fn from(err: ComputeError) -> Self {
        ServeError::Compute(err.0)
    }
}

/// One full batch, in the shape the compute resource consumes.
///
/// All vectors have the same length `B`, the fixed batch size. Index `i` of
/// each vector describes slot `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInput {
    /// `[B][context_length]` token ids, left padded.
    pub sequences: Vec<Vec<u32>>,

    /// Real token count per slot, `0` for filler slots.
    pub lengths: Vec<usize>,

    pub params: Vec<SamplingParams>,

    /// Number of tokens to produce for every slot.
    pub continuation_length: usize,
}

impl BatchInput {
    pub fn batch_size(&self) -> usize {
        self.sequences.len()
    }

    pub fn context_length(&self) -> usize {
        self.sequences.first().map(Vec::len).unwrap_or(0)
    }
}

/// A single shared model that runs one batch at a time.
///
/// ```ignore
/// use kamado::compute::{BatchInput, ComputeError, ComputeResource};
/// use async_trait::async_trait;
///
/// struct Constant;
///
/// #[async_trait]
/// impl ComputeResource for Constant {
///     async fn run_batch(&self, batch: &BatchInput) -> Result<Vec<Vec<u32>>, ComputeError> {
///         Ok(vec![vec![42; batch.continuation_length]; batch.batch_size()])
///     }
/// }
/// ```
#[async_trait]
pub trait ComputeResource: Send + Sync + 'static {
    /// Runs one batch.
    ///
    /// # Returns
    ///
    /// Exactly `batch.batch_size()` output sequences, in slot order. Output
    /// `i` must belong to input slot `i`; position is the only correlation key.
    async fn run_batch(&self, batch: &BatchInput) -> Result<Vec<Vec<u32>>, ComputeError>;
}
