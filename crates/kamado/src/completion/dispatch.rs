use crate::codec::Codec;
use crate::communication::ResponseSender;
use crate::error::ServeError;

/// What happened to each slot of one dispatched batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Owners that received decoded text
    pub delivered: usize,

    /// Owners that received an error
    pub failed: usize,

    /// Filler slots whose output was dropped
    pub discarded: usize,

    /// Owners whose caller had already gone away
    pub abandoned: usize,
}

impl DispatchSummary {
    fn record(&mut self, reached: bool, ok: bool) {
        match (reached, ok) {
            (false, _) => self.abandoned += 1,
            (true, true) => self.delivered += 1,
            (true, false) => self.failed += 1,
        }
    }
}

/// Walks `outputs` in slot order and writes each decoded output to the owner
/// of the same slot. Filler slots are skipped.
///
/// `owners` and `outputs` must have the same length; a decode failure only
/// affects its own slot.
pub(crate) fn dispatch<C>(
    codec: &C,
    owners: Vec<Option<ResponseSender>>,
    outputs: Vec<Vec<u32>>,
) -> DispatchSummary
where C: Codec + ?Sized
{
    debug_assert_eq!(owners.len(), outputs.len());
    let mut summary = DispatchSummary::default();

    for (owner, tokens) in owners.into_iter().zip(outputs) {
        let Some(owner) = owner else {
            summary.discarded += 1;
            continue;
        };
        let completion = codec.decode(&tokens)
            .map_err(|err| ServeError::Decode(err.to_string()));
        let ok = completion.is_ok();
        summary.record(owner.deliver(completion), ok);
    }
    summary
}

/// Answers every owner in a failed batch with `error`.
pub(crate) fn fail_all(owners: Vec<Option<ResponseSender>>, error: ServeError) -> DispatchSummary {
    let mut summary = DispatchSummary::default();
    for owner in owners {
        match owner {
            Some(owner) => summary.record(owner.deliver(Err(error.clone())), false),
            None => summary.discarded += 1,
        }
    }
    summary
}
