use log::{debug, info};
use crate::error::ServeError;
use crate::queue::Admissions;
use super::handler::BatchHandler;
use super::worker::WorkerSignal;

/// Runs the collect / dispatch cycle until shutdown.
///
/// While collecting, the loop parks on the admission queue. As soon as one
/// request arrives it drains whatever else is already queued, up to
/// `batch_size`, and dispatches without waiting for more: a partial batch is
/// always flushed. The handler pads it to full size.
///
/// On exit the queue is closed and every request still waiting in it is
/// rejected with [`ServeError::Shutdown`].
///
/// # Parameters
///
/// * `handler` - Builds, runs and routes each batch
/// * `signal` - Shutdown signal of the owning worker
/// * `admissions` - Consumer side of the admission queue
/// * `batch_size` - Maximum number of requests per batch
pub(crate) async fn batching_loop<BH: BatchHandler>(
    handler: &BH,
    signal: WorkerSignal,
    mut admissions: Admissions<BH::Request>,
    batch_size: usize,
) {
    info!("batching loop started, {batch_size} slots per batch");
    let mut batches: u64 = 0;

    loop {
        let first = tokio::select! {
            biased;
            _ = signal.stopped() => break,
            request = admissions.next() => match request {
                Some(request) => request,
                // every producer is gone
                None => break,
            },
        };

        let requests = drain_possible_requests(first, &mut admissions, batch_size);
        debug!("batch {batches}: collected {} of {batch_size} requests", requests.len());

        let input = handler.make_batch_input(requests);
        let output = handler.forward(&input).await;
        handler.handle_outputs(input, output);
        batches += 1;
    }

    admissions.close();
    let mut rejected = 0;
    while let Some(request) = admissions.dequeue_nonblocking() {
        handler.reject(request, ServeError::Shutdown);
        rejected += 1;
    }
    info!("batching loop stopped after {batches} batches, {rejected} queued requests rejected");
}

/// Greedily takes queued requests after `first` until the batch is full or the
/// queue is empty. Never waits.
///
/// # Returns
///
/// Between `1` and `batch_size` requests in FIFO order, `first` leading.
pub(crate) fn drain_possible_requests<T>(
    first: T,
    admissions: &mut Admissions<T>,
    batch_size: usize,
) -> Vec<T> {
    let mut requests = Vec::with_capacity(batch_size);
    requests.push(first);
    while requests.len() < batch_size {
        match admissions.dequeue_nonblocking() {
            Some(request) => requests.push(request),
            None => break,
        }
    }
    requests
}
