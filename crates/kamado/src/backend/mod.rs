//! # Tensor Backends
//!
//! Adapters that let tensor-based models act as a
//! [`ComputeResource`](crate::compute::ComputeResource).
//!
//! ## Feature Flags
//!
//! - `candle`: Enables [`candle::CandleCompute`], which lays every batch out
//!   as candle tensors and reads the generated ids back.

#[cfg_attr(docsrs, doc(cfg(feature = "candle")))]
#[cfg(feature = "candle")]
/// Candle tensor backend.
///
/// This module is only available when the `candle` feature flag is enabled.
pub mod candle;
