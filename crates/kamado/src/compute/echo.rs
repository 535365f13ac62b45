use async_trait::async_trait;
use super::{BatchInput, ComputeError, ComputeResource};

/// A stand-in model that repeats the tail of each prompt.
///
/// Every slot produces the last `continuation_length` tokens of its input
/// sequence, left padded with `pad_id` when the context is shorter than the
/// continuation. Decoding the output of a prompt that fits in both windows
/// therefore yields the prompt itself, which makes slot routing observable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo {
    pad_id: u32,
}

impl Echo {
    pub fn new(pad_id: u32) -> Self {
        Self { pad_id }
    }
}

#[async_trait]
impl ComputeResource for Echo {
    async fn run_batch(&self, batch: &BatchInput) -> Result<Vec<Vec<u32>>, ComputeError> {
        let outputs = batch.sequences.iter()
            .map(|sequence| {
                crate::codec::left_pad_truncate(sequence, batch.continuation_length, self.pad_id)
            })
            .collect();
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SamplingParams;

    fn input(sequences: Vec<Vec<u32>>, continuation_length: usize) -> BatchInput {
        let lengths = sequences.iter().map(Vec::len).collect();
        let params = vec![SamplingParams::default(); sequences.len()];
        BatchInput { sequences, lengths, params, continuation_length }
    }

    #[tokio::test]
    async fn test_echo_keeps_tail() {
        let outputs = Echo::new(0)
            .run_batch(&input(vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]], 2))
            .await
            .unwrap();
        assert_eq!(outputs, vec![vec![3, 4], vec![7, 8]]);
    }

    #[tokio::test]
    async fn test_echo_pads_short_context() {
        let outputs = Echo::new(0)
            .run_batch(&input(vec![vec![1, 2]], 4))
            .await
            .unwrap();
        assert_eq!(outputs, vec![vec![0, 0, 1, 2]]);
    }

    #[tokio::test]
    async fn test_echo_preserves_batch_size() {
        let batch = input(vec![vec![0; 3]; 5], 3);
        let outputs = Echo::default().run_batch(&batch).await.unwrap();
        assert_eq!(outputs.len(), batch.batch_size());
    }
}
