use super::{Codec, CodecError};

/// A tokenizer-free codec: every UTF-8 byte becomes one token.
///
/// Byte `b` is encoded as `b + 1` so id `0` stays free for padding. Decoding
/// skips pad ids and replaces invalid UTF-8 sequences instead of failing,
/// since a sampled continuation may end in the middle of a character.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteCodec {}

impl ByteCodec {
    /// Token id reserved for padding.
    pub const PAD_ID: u32 = 0;

    /// Number of ids this codec can produce, padding included.
    pub const VOCAB_SIZE: u32 = 257;

    pub fn new() -> Self {
        Self {}
    }
}

impl Codec for ByteCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>, CodecError> {
        Ok(text.bytes().map(|b| b as u32 + 1).collect())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, CodecError> {
        let mut bytes = Vec::with_capacity(tokens.len());
        for &token in tokens {
            match token {
                Self::PAD_ID => continue,
                1..=256 => bytes.push((token - 1) as u8),
                _ => {
                    return Err(CodecError(format!(
                        "token id {token} is outside the byte vocabulary"
                    )));
                }
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
