use crate::codec::EncodedPrompt;
use crate::compute::BatchInput;
use crate::request::SamplingParams;
use super::response::ResponseSender;

/// # BatchSlot
///
/// One position of a batch while it is being assembled.
///
/// Real slots carry the encoded prompt and the owner of the envelope they
/// came from. Filler slots are all padding, have a valid length of `0` and
/// never own a response handle, so their outputs are dropped.
#[derive(Debug)]
pub(crate) struct BatchSlot {
    sequence: Vec<u32>,
    valid_length: usize,
    params: SamplingParams,
    owner: Option<ResponseSender>,
}

impl BatchSlot {
    pub fn occupied(prompt: EncodedPrompt, params: SamplingParams, owner: ResponseSender) -> Self {
        Self {
            sequence: prompt.tokens,
            valid_length: prompt.valid_length,
            params,
            owner: Some(owner),
        }
    }

    pub fn filler(context_length: usize, pad_id: u32, params: SamplingParams) -> Self {
        Self {
            sequence: vec![pad_id; context_length],
            valid_length: 0,
            params,
            owner: None,
        }
    }

    #[cfg(test)]
    pub fn is_filler(&self) -> bool {
        self.owner.is_none()
    }
}

/// # Batch
///
/// A fully assembled batch: the compute-facing [`BatchInput`] plus, for
/// every slot, the optional owner its output must be routed to.
///
/// `owners[i]` belongs to `input.sequences[i]` and to output `i`. No other
/// correlation key exists, so the two vectors are built together and never
/// reordered.
#[derive(Debug)]
pub(crate) struct Batch {
    input: BatchInput,
    owners: Vec<Option<ResponseSender>>,
}

impl Batch {
    pub fn from_slots(slots: Vec<BatchSlot>, continuation_length: usize) -> Self {
        let size = slots.len();
        let mut sequences = Vec::with_capacity(size);
        let mut lengths = Vec::with_capacity(size);
        let mut params = Vec::with_capacity(size);
        let mut owners = Vec::with_capacity(size);

        for slot in slots {
            sequences.push(slot.sequence);
            lengths.push(slot.valid_length);
            params.push(slot.params);
            owners.push(slot.owner);
        }

        Self {
            input: BatchInput {
                sequences,
                lengths,
                params,
                continuation_length,
            },
            owners,
        }
    }

    pub fn input(&self) -> &BatchInput {
        &self.input
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Number of slots that own a response handle.
    pub fn real_slots(&self) -> usize {
        self.owners.iter().filter(|owner| owner.is_some()).count()
    }

    pub fn into_owners(self) -> Vec<Option<ResponseSender>> {
        self.owners
    }
}
