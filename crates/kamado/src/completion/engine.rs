use log::{info, trace, warn};
use crate::codec::Codec;
use crate::communication::{response_channel, Envelope, ResponseHandle};
use crate::compute::ComputeResource;
use crate::config::EngineConfig;
use crate::core::batch::batching_loop;
use crate::core::worker::WorkerHandle;
use crate::error::{Result, ServeError};
use crate::queue::{self, AdmissionQueue};
use crate::request::CompletionRequest;
use super::handler::CompletionHandler;

/// # CompletionEngine
///
/// The front door of the batching pipeline. Owns the admission queue and the
/// background worker that assembles batches, runs the compute resource and
/// dispatches results.
///
/// Submissions never block: they either land in the admission queue or fail
/// immediately with [`ServeError::QueueFull`]. The returned
/// [`ResponseHandle`] is awaited for the result.
///
/// Share it between gateway tasks behind an `Arc`. Dropping the last
/// reference stops the worker after its current batch; use
/// [`shutdown`](CompletionEngine::shutdown) to wait for that and to have
/// still-queued requests answered with [`ServeError::Shutdown`].
pub struct CompletionEngine {
    queue: AdmissionQueue<Envelope>,
    worker: WorkerHandle,
    total_batch: usize,
}

impl CompletionEngine {
    /// Validates `config` and spawns the batching worker.
    ///
    /// # Errors
    ///
    /// [`ServeError::InvalidConfig`] when the configuration cannot produce a batch.
    ///
    /// # Panics
    ///
    /// When called outside a tokio runtime.
    pub fn new<C, M>(config: EngineConfig, codec: C, compute: M) -> Result<Self>
    where C: Codec, M: ComputeResource
    {
        config.validate()?;
        let total_batch = config.total_batch();
        let (queue, admissions) = queue::bounded(config.queue_capacity);
        info!(
            "starting completion engine: {total_batch} slots x {} tokens, {} continuation tokens, queue capacity {}",
            config.context_length, config.continuation_length, config.queue_capacity
        );

        let handler = CompletionHandler::new(codec, compute, config);
        let worker = WorkerHandle::spawn(move |signal| async move {
            batching_loop(&handler, signal, admissions, total_batch).await;
        });

        Ok(Self {
            queue,
            worker,
            total_batch,
        })
    }

    /// Submits one request for one sample.
    ///
    /// # Errors
    ///
    /// * [`ServeError::QueueFull`] if the admission queue is at capacity
    /// * [`ServeError::Shutdown`] if the engine has stopped
    pub fn submit(&self, request: CompletionRequest) -> Result<ResponseHandle> {
        self.submit_samples(request, 1)
    }

    /// Submits `samples` independent copies of `request` that share one handle.
    ///
    /// Every copy occupies its own batch slot and passes its own admission
    /// check; copies may be served by different batches. The handle receives
    /// one value per copy in the order they complete.
    ///
    /// If a later copy is rejected, the error is returned and the copies
    /// already admitted still run; their results are discarded with the handle.
    pub fn submit_samples(&self, request: CompletionRequest, samples: usize) -> Result<ResponseHandle> {
        if samples == 0 {
            return Err(ServeError::InvalidConfig("a submission needs at least one sample".into()));
        }
        if !self.worker.is_running() {
            return Err(ServeError::Shutdown);
        }

        let (owner, handle) = response_channel(samples);
        for sample in 1..=samples {
            let envelope = Envelope::new(request.clone(), owner.clone());
            let id = envelope.id();
            if let Err(err) = self.queue.enqueue(envelope) {
                warn!("sample {sample} of {samples} not admitted: {err}");
                return Err(err);
            }
            trace!("admitted envelope {id}, sample {sample} of {samples}");
        }
        Ok(handle)
    }

    /// Envelopes currently waiting for a batch.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn total_batch(&self) -> usize {
        self.total_batch
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running() && !self.queue.is_closed()
    }

    /// Stops the worker once its current batch is dispatched and waits for it.
    /// Requests still queued are answered with [`ServeError::Shutdown`].
    pub async fn shutdown(self) {
        self.worker.join().await;
        info!("completion engine stopped");
    }
}
