//! # Completion Serving
//!
//! Text completion on top of the batching core: prompts are encoded into
//! fixed-length slots, run through the compute resource one full batch at a
//! time, and decoded back to the caller that owns each slot.
//!
//! * [`CompletionEngine`] - Admission and the public submission API
//! * [`CompletionHandler`] - Batch assembly, isolated compute and dispatch
//! * [`DispatchSummary`] - Per-batch routing counts, logged at debug level

mod dispatch;
mod engine;
mod handler;

pub use dispatch::DispatchSummary;
pub use engine::CompletionEngine;
pub use handler::CompletionHandler;
