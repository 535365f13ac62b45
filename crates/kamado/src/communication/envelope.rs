use uuid::Uuid;
use crate::error::ServeError;
use crate::request::CompletionRequest;
use super::response::ResponseSender;

/// # Envelope
///
/// One unit of admitted work: a request plus the handle its result goes to.
///
/// Envelopes are immutable once built. Two envelopes may share one owner
/// (fan-out sampling); they still occupy separate batch slots and each
/// writes exactly once.
#[derive(Debug)]
pub(crate) struct Envelope {
    /// Identifier used only for logging
    id: Uuid,

    request: CompletionRequest,

    /// Where the single result of this envelope is written
    owner: ResponseSender,
}

impl Envelope {
    pub fn new(request: CompletionRequest, owner: ResponseSender) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            owner,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn into_parts(self) -> (Uuid, CompletionRequest, ResponseSender) {
        (self.id, self.request, self.owner)
    }

    /// Answers this envelope with an error without it ever reaching a batch.
    pub fn reject(self, error: ServeError) {
        if !self.owner.deliver(Err(error)) {
            log::debug!("envelope {}: caller went away before rejection", self.id);
        }
    }
}
