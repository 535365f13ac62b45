//! # Codec Boundary
//!
//! Text goes in and out of the engine through a [`Codec`]. The tokenizer itself
//! is an external collaborator; this module only fixes its interface and
//! implements the shaping every slot needs before it reaches the compute
//! resource: left padding short prompts and left truncating long ones so each
//! sequence is exactly `context_length` tokens.

mod byte;
mod operations;

pub use byte::ByteCodec;
pub use operations::left_pad_truncate;

use thiserror::Error;
use crate::error::{Result, ServeError};

/// Failure reported by a [`Codec`] implementation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

/// Converts between text and integer token ids.
///
/// Implementations are called from the batching worker, once per real slot
/// for `encode` and once per owned output slot for `decode`. They must not
/// block for long; the whole batch waits on them.
pub trait Codec: Send + Sync + 'static {
    /// Tokenize `text` without padding or truncation.
    fn encode(&self, text: &str) -> std::result::Result<Vec<u32>, CodecError>;

    /// Turn produced token ids back into text.
    fn decode(&self, tokens: &[u32]) -> std::result::Result<String, CodecError>;
}

/// A prompt shaped for one batch slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPrompt {
    /// Exactly `context_length` token ids.
    pub tokens: Vec<u32>,

    /// Number of tokens the codec produced, before padding or truncation.
    /// May exceed `context_length` when the prompt was truncated.
    pub valid_length: usize,
}

/// Encodes `text` into a fixed length sequence.
///
/// Short prompts are left padded with `pad_id`, long prompts keep only their
/// last `context_length` tokens.
///
/// # Errors
///
/// [`ServeError::Encode`] when the codec rejects the text.
pub fn encode_fixed<C>(
    codec: &C,
    text: &str,
    context_length: usize,
    pad_id: u32,
) -> Result<EncodedPrompt>
where C: Codec + ?Sized
{
    let tokens = codec.encode(text)
        .map_err(|err| ServeError::Encode(err.to_string()))?;
    Ok(EncodedPrompt {
        valid_length: tokens.len(),
        tokens: left_pad_truncate(&tokens, context_length, pad_id),
    })
}
