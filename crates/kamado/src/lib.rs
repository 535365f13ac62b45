//! # Kamado
//!
//! A batching front end for a single, shared text completion model.
//!
//! ## Overview
//!
//! Many concurrent callers submit prompts; one model can only run one batch
//! of a fixed size at a time. Kamado sits between the two:
//!
//! - A bounded **admission queue** fails fast under overload instead of
//!   letting callers pile up without limit
//! - A background **batch assembler** drains the queue greedily, flushes a
//!   partial batch as soon as the queue runs dry, and pads it with inert
//!   filler slots to the exact batch size the model requires
//! - A **result dispatcher** routes each output back to the caller that owns
//!   its slot, using slot position as the only correlation key
//!
//! ## Architecture
//!
//! ### External collaborators
//!
//! The tokenizer and the model are plugged in through two traits:
//!
//! - [`Codec`](codec::Codec) turns text into token ids and back. The engine
//!   left pads short prompts and keeps the tail of long ones, so every slot
//!   has exactly `context_length` tokens.
//! - [`ComputeResource`](compute::ComputeResource) runs one full batch and
//!   returns one output sequence per slot, in order.
//!
//! ### Fan-out sampling
//!
//! [`CompletionEngine::submit_samples`] enqueues several copies of one request
//! sharing a single [`ResponseHandle`]. Each copy is an independent slot, and
//! the copies may land in different batches.
//!
//! ### Failure isolation
//!
//! A prompt that fails to encode, a failed or panicking compute call and an
//! output batch of the wrong size are all answered with a
//! [`ServeError`] on the affected handles. The worker keeps serving.
//!
//! ## Features
//!
//! - **candle** - Enables the candle tensor adapter in [`backend`]
//!
//! ## Example
//!
//! ```rust
//! use kamado::{CompletionEngine, CompletionRequest, EngineConfig, SamplingParams};
//! use kamado::codec::ByteCodec;
//! use kamado::compute::Echo;
//!
//! # #[tokio::main]
//! # async fn main() -> kamado::Result<()> {
//! let engine = CompletionEngine::new(EngineConfig::default(), ByteCodec::new(), Echo::default())?;
//!
//! let request = CompletionRequest::new("hello", SamplingParams::new(0.9, 1.0));
//! let completions = engine.submit_samples(request, 2)?.collect().await;
//! assert_eq!(completions.len(), 2);
//! # Ok(())
//! # }
//! ```

mod communication;
mod config;
mod error;
mod request;

pub(crate) mod core;

pub mod backend;
pub mod codec;
pub mod completion;
pub mod compute;
pub mod queue;

pub use communication::{Completion, ResponseHandle};
pub use completion::CompletionEngine;
pub use config::{BatchShape, EngineConfig, MAX_CORES_PER_REPLICA};
pub use error::{Result, ServeError};
pub use request::{CompletionRequest, SamplingParams};
