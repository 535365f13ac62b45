use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, error, warn};
use crate::codec::{encode_fixed, Codec};
use crate::communication::{Batch, BatchSlot, Envelope};
use crate::compute::ComputeResource;
use crate::config::EngineConfig;
use crate::core::handler::BatchHandler;
use crate::error::{Result, ServeError};
use super::dispatch::{dispatch, fail_all};

/// A [`BatchHandler`] for fixed-shape text completion.
///
/// Owns the codec and the compute resource for the lifetime of the batching
/// worker; nothing else ever calls into them.
///
/// # Type Parameters
///
/// * `C` - The [`Codec`] turning prompts into token ids and outputs back into text
/// * `M` - The [`ComputeResource`] running each batch
pub struct CompletionHandler<C, M> {
    codec: C,
    compute: M,
    config: EngineConfig,
}

impl<C, M> CompletionHandler<C, M>
where C: Codec, M: ComputeResource
{
    pub fn new(codec: C, compute: M, config: EngineConfig) -> Self {
        Self {
            codec,
            compute,
            config,
        }
    }

    fn filler(&self) -> BatchSlot {
        BatchSlot::filler(self.config.context_length, self.config.pad_id, self.config.filler)
    }
}

#[async_trait]
impl<C, M> BatchHandler for CompletionHandler<C, M>
where C: Codec, M: ComputeResource
{
    type Request = Envelope;
    type ModelInput = Batch;
    type ModelOutput = Vec<Vec<u32>>;

    /// Encodes every envelope into its slot and pads the batch with filler
    /// slots up to `total_batch`.
    ///
    /// An envelope whose text cannot be encoded is answered right away with
    /// [`ServeError::Encode`] and its slot becomes filler, so one bad prompt
    /// never holds up the rest of the batch.
    fn make_batch_input(&self, requests: Vec<Envelope>) -> Batch {
        let start = Instant::now();
        let total_batch = self.config.total_batch();
        debug_assert!(requests.len() <= total_batch);

        let mut slots = Vec::with_capacity(total_batch);
        for envelope in requests {
            let (id, request, owner) = envelope.into_parts();
            match encode_fixed(&self.codec, &request.text, self.config.context_length, self.config.pad_id) {
                Ok(prompt) => slots.push(BatchSlot::occupied(prompt, request.params, owner)),
                Err(err) => {
                    warn!("envelope {id}: {err}, slot replaced by filler");
                    if !owner.deliver(Err(err)) {
                        debug!("envelope {id}: caller went away before encode failure was reported");
                    }
                    slots.push(self.filler());
                }
            }
        }
        while slots.len() < total_batch {
            slots.push(self.filler());
        }

        let batch = Batch::from_slots(slots, self.config.continuation_length);
        debug!(
            "encode done in {:?}: {} real slots, {} filler",
            start.elapsed(),
            batch.real_slots(),
            batch.len() - batch.real_slots()
        );
        batch
    }

    /// Runs the compute resource with errors and panics contained.
    ///
    /// # Errors
    ///
    /// * [`ServeError::Compute`] if the resource returns an error or panics
    /// * [`ServeError::ShapeMismatch`] if it returns the wrong number of outputs
    async fn forward(&self, batch: &Batch) -> Result<Vec<Vec<u32>>> {
        let start = Instant::now();
        let outputs = AssertUnwindSafe(self.compute.run_batch(batch.input()))
            .catch_unwind()
            .await
            .map_err(|panic| ServeError::Compute(panic_message(&*panic)))??;

        if outputs.len() != batch.len() {
            return Err(ServeError::ShapeMismatch {
                expected: batch.len(),
                actual: outputs.len(),
            });
        }
        debug!("inference done in {:?}", start.elapsed());
        Ok(outputs)
    }

    /// Decodes and routes each output to the owner of its slot, or answers
    /// every owner with the forward error.
    fn handle_outputs(&self, batch: Batch, output: Result<Vec<Vec<u32>>>) {
        let start = Instant::now();
        let summary = match output {
            Ok(outputs) => dispatch(&self.codec, batch.into_owners(), outputs),
            Err(err) => {
                error!("batch failed, answering {} slots with an error: {err}", batch.real_slots());
                fail_all(batch.into_owners(), err)
            }
        };
        if summary.abandoned > 0 {
            warn!("{} completions discarded, callers went away", summary.abandoned);
        }
        debug!("decode done in {:?}: {summary:?}", start.elapsed());
    }

    fn reject(&self, request: Envelope, error: ServeError) {
        request.reject(error);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "compute resource panicked".to_string()
    }
}
