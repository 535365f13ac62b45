/// Shapes `tokens` into exactly `context_length` ids.
///
/// When `tokens` is shorter, `pad_id` fills the front of the sequence so the
/// real tokens sit at the end. When it is longer, tokens are dropped from the
/// front, keeping the most recent `context_length` of them.
///
/// # Parameters
///
/// * `tokens` - Token ids produced by a codec
/// * `context_length` - Length of the returned sequence
/// * `pad_id` - Id written into padding positions
///
/// # Returns
///
/// A vector of length `context_length`
pub fn left_pad_truncate(tokens: &[u32], context_length: usize, pad_id: u32) -> Vec<u32> {
    if tokens.len() >= context_length {
        let start_idx = tokens.len() - context_length;
        return tokens[start_idx..].to_vec();
    }
    let padding_amount = context_length - tokens.len();
    let mut padded = Vec::with_capacity(context_length);
    padded.resize(padding_amount, pad_id);
    padded.extend_from_slice(tokens);
    padded
}
