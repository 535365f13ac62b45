//! # Admission Queue
//!
//! A bounded FIFO between any number of submitting tasks and the single
//! batching worker.
//!
//! Admission is non-blocking on both ends: [`AdmissionQueue::enqueue`] fails
//! fast with [`ServeError::QueueFull`] once `capacity` items are waiting, and
//! [`Admissions::dequeue_nonblocking`] returns immediately when nothing is
//! queued. The consumer side is a separate, non-cloneable type, so there is
//! exactly one reader.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use crate::error::{Result, ServeError};

/// Creates a queue that holds at most `capacity` items.
///
/// # Panics
///
/// When `capacity` is `0`. [`EngineConfig::validate`](crate::EngineConfig::validate)
/// rejects that value before the engine gets here.
pub fn bounded<T>(capacity: usize) -> (AdmissionQueue<T>, Admissions<T>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (
        AdmissionQueue { sender },
        Admissions { receiver },
    )
}

/// Producer side of the admission queue. Clone it into every gateway task.
#[derive(Debug)]
pub struct AdmissionQueue<T> {
    sender: mpsc::Sender<T>,
}

impl<T> Clone for AdmissionQueue<T> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<T> AdmissionQueue<T> {
    /// Same as [`bounded`].
    pub fn bounded(capacity: usize) -> (Self, Admissions<T>) {
        bounded(capacity)
    }

    /// Adds `item` to the back of the queue without waiting.
    ///
    /// # Errors
    ///
    /// * [`ServeError::QueueFull`] if `capacity` items are already waiting
    /// * [`ServeError::Shutdown`] if the consumer has stopped
    pub fn enqueue(&self, item: T) -> Result<()> {
        match self.sender.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ServeError::QueueFull {
                capacity: self.capacity(),
            }),
            Err(TrySendError::Closed(_)) => Err(ServeError::Shutdown),
        }
    }

    /// Number of items currently waiting.
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consumer side of the admission queue, owned by the batching worker.
#[derive(Debug)]
pub struct Admissions<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> Admissions<T> {
    /// Takes the next item in FIFO order, or `None` right away when the queue is empty.
    pub fn dequeue_nonblocking(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Waits for the next item.
    ///
    /// Returns `None` once every producer is gone and the queue is drained.
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Stops admitting new items. Items already queued can still be dequeued.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
