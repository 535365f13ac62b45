use async_trait::async_trait;
use candle_core::{Device, Tensor};
use crate::compute::{BatchInput, ComputeError, ComputeResource};

/// One batch as candle tensors.
///
/// With `B` the batch size and `S` the context length:
///
/// * `tokens` - `(B, S)` u32, left padded
/// * `lengths` - `(B,)` u32, real token count per slot
/// * `top_p` - `(B,)` f32
/// * `temperature` - `(B,)` f32
#[derive(Debug, Clone)]
pub struct TensorBatch {
    pub tokens: Tensor,
    pub lengths: Tensor,
    pub top_p: Tensor,
    pub temperature: Tensor,
    pub continuation_length: usize,
}

/// A model that generates a continuation for every row of a [`TensorBatch`].
#[async_trait]
pub trait TensorModel: Send + Sync + 'static {
    /// # Returns
    ///
    /// A `(B, continuation_length)` u32 tensor of generated token ids, rows
    /// in the same order as `batch.tokens`.
    async fn generate(&self, batch: TensorBatch) -> candle_core::Result<Tensor>;
}

/// Adapts a [`TensorModel`] into a [`ComputeResource`].
pub struct CandleCompute<M> {
    model: M,
    device: Device,
}

impl<M: TensorModel> CandleCompute<M> {
    pub fn new(model: M, device: Device) -> Self {
        Self { model, device }
    }

    /// Lays `input` out as tensors on this adapter's device.
    pub fn to_tensors(&self, input: &BatchInput) -> candle_core::Result<TensorBatch> {
        let batch_size = input.batch_size();
        let context_length = input.context_length();

        let flat: Vec<u32> = input.sequences.iter().flatten().copied().collect();
        let tokens = Tensor::from_vec(flat, (batch_size, context_length), &self.device)?;

        let lengths: Vec<u32> = input.lengths.iter().map(|&length| length as u32).collect();
        let top_p: Vec<f32> = input.params.iter().map(|params| params.top_p).collect();
        let temperature: Vec<f32> = input.params.iter().map(|params| params.temperature).collect();

        Ok(TensorBatch {
            tokens,
            lengths: Tensor::from_vec(lengths, batch_size, &self.device)?,
            top_p: Tensor::from_vec(top_p, batch_size, &self.device)?,
            temperature: Tensor::from_vec(temperature, batch_size, &self.device)?,
            continuation_length: input.continuation_length,
        })
    }
}

#[async_trait]
impl<M: TensorModel> ComputeResource for CandleCompute<M> {
    async fn run_batch(&self, batch: &BatchInput) -> Result<Vec<Vec<u32>>, ComputeError> {
        let tensors = self.to_tensors(batch)
            .map_err(|err| ComputeError(format!("building batch tensors: {err}")))?;
        let output = self.model.generate(tensors).await
            .map_err(|err| ComputeError(format!("model forward: {err}")))?;
        output.to_vec2::<u32>()
            .map_err(|err| ComputeError(format!("reading model output: {err}")))
    }
}
