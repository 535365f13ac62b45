//! # Batching Core
//!
//! The request-agnostic half of the engine.
//!
//! * [`batch`] - The collect / dispatch loop and the greedy drain that feeds it.
//!
//! * [`handler`] - The [`BatchHandler`](handler::BatchHandler) trait: how a
//!   drained set of requests becomes a model input, how the model is run and
//!   how outputs are routed back.
//!
//! * [`worker`] - Spawning, signalling and shutting down the background task
//!   that runs the loop.
//!
pub mod worker;
pub mod batch;
pub mod handler;
