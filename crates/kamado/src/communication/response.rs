use std::pin::Pin;
use std::task::{Context, Poll};
use futures::Stream;
use tokio::sync::mpsc;
use crate::error::Result;

/// The value written into a response handle: decoded text or the reason
/// there is none.
pub type Completion = Result<String>;

/// Creates a linked sender / handle pair expecting `expected` writes.
pub(crate) fn response_channel(expected: usize) -> (ResponseSender, ResponseHandle) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        ResponseSender { sender },
        ResponseHandle { receiver, expected, received: 0 },
    )
}

/// Write side of a response handle, captured by every envelope that shares it.
///
/// Cloning is cheap; each clone is one more envelope that will write once.
#[derive(Debug, Clone)]
pub(crate) struct ResponseSender {
    sender: mpsc::UnboundedSender<Completion>,
}

impl ResponseSender {
    /// Writes one completion.
    ///
    /// # Returns
    ///
    /// `false` when the caller dropped its handle; the value is discarded.
    pub fn deliver(&self, completion: Completion) -> bool {
        self.sender.send(completion).is_ok()
    }

    #[allow(dead_code)]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// # ResponseHandle
///
/// The caller's side of a submission. Receives one [`Completion`] per
/// envelope that was admitted with it, in the order the dispatcher wrote
/// them.
///
/// A single-sample submission expects one value, a fan-out submission of `n`
/// samples expects `n`; the samples may be served by different batches.
///
/// There is no built-in timeout. Callers that need one wrap [`recv`] or
/// [`collect`] in `tokio::time::timeout`.
///
/// [`recv`]: ResponseHandle::recv
/// [`collect`]: ResponseHandle::collect
#[derive(Debug)]
pub struct ResponseHandle {
    receiver: mpsc::UnboundedReceiver<Completion>,
    expected: usize,
    received: usize,
}

impl ResponseHandle {
    /// Number of writes this handle will receive in total.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Number of writes still outstanding.
    pub fn remaining(&self) -> usize {
        self.expected - self.received
    }

    /// Waits for the next completion.
    ///
    /// Returns `None` once every expected value has been read, or if the
    /// engine dropped the request without answering it.
    pub async fn recv(&mut self) -> Option<Completion> {
        if self.remaining() == 0 {
            return None;
        }
        let completion = self.receiver.recv().await;
        if completion.is_some() {
            self.received += 1;
        }
        completion
    }

    /// Waits for every expected completion, in arrival order.
    pub async fn collect(mut self) -> Vec<Completion> {
        let mut completions = Vec::with_capacity(self.remaining());
        while let Some(completion) = self.recv().await {
            completions.push(completion);
        }
        completions
    }
}

impl Stream for ResponseHandle {
    type Item = Completion;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.remaining() == 0 {
            return Poll::Ready(None);
        }
        let polled = Pin::new(&mut this.receiver).poll_recv(cx);
        if let Poll::Ready(Some(_)) = &polled {
            this.received += 1;
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}
