mod batch;
mod envelope;
mod response;

pub(crate) use batch::{Batch, BatchSlot};
pub(crate) use envelope::Envelope;
pub(crate) use response::{response_channel, ResponseSender};
pub use response::{Completion, ResponseHandle};
