//! Engine configuration.
//!
//! Loaded once at startup and never reloaded. Every field has a default so a
//! partially filled configuration file deserializes cleanly.

use serde::{Deserialize, Serialize};
use crate::error::{Result, ServeError};
use crate::request::SamplingParams;

/// Upper bound on cores a single model replica may be sharded across.
pub const MAX_CORES_PER_REPLICA: usize = 8;

/// Describes how the fixed batch size is derived from the device layout.
///
/// `total_batch = per_replica_batch * device_count / cores_per_replica * fan_out`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchShape {
    pub per_replica_batch: usize,
    pub device_count: usize,
    pub cores_per_replica: usize,
    pub fan_out: usize,
}

impl BatchShape {
    /// A shape that yields exactly `total_batch` slots on a single device.
    pub fn fixed(total_batch: usize) -> Self {
        Self {
            per_replica_batch: total_batch,
            device_count: 1,
            cores_per_replica: 1,
            fan_out: 1,
        }
    }

    /// Number of slots in every batch, `0` when the shape is degenerate.
    pub fn total_batch(&self) -> usize {
        (self.per_replica_batch * self.device_count)
            .checked_div(self.cores_per_replica)
            .unwrap_or(0)
            * self.fan_out
    }
}

impl Default for BatchShape {
    fn default() -> Self {
        Self {
            per_replica_batch: 1,
            device_count: 1,
            cores_per_replica: 1,
            fan_out: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Envelopes allowed to wait in the admission queue before new ones are rejected.
    pub queue_capacity: usize,
    pub batch: BatchShape,
    /// Fixed input length of every slot, in tokens.
    pub context_length: usize,
    /// Number of tokens the compute resource produces per slot.
    pub continuation_length: usize,
    pub pad_id: u32,
    /// Sampling parameters carried by filler slots.
    pub filler: SamplingParams,
}

impl EngineConfig {
    pub fn total_batch(&self) -> usize {
        self.batch.total_batch()
    }

    /// Rejects configurations the batching loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(ServeError::InvalidConfig("queue_capacity must be at least 1".into()));
        }
        if self.context_length == 0 {
            return Err(ServeError::InvalidConfig("context_length must be at least 1".into()));
        }
        if self.continuation_length == 0 {
            return Err(ServeError::InvalidConfig("continuation_length must be at least 1".into()));
        }
        let shape = &self.batch;
        if shape.cores_per_replica == 0 || shape.cores_per_replica > MAX_CORES_PER_REPLICA {
            return Err(ServeError::InvalidConfig(format!(
                "cores_per_replica must be between 1 and {MAX_CORES_PER_REPLICA}, got {}",
                shape.cores_per_replica
            )));
        }
        if self.total_batch() == 0 {
            return Err(ServeError::InvalidConfig(format!(
                "batch shape {shape:?} yields an empty batch"
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            batch: BatchShape::default(),
            context_length: 2048,
            continuation_length: 32,
            pad_id: 0,
            filler: SamplingParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.continuation_length, 32);
        assert_eq!(config.total_batch(), 8);
    }

    #[test]
    fn test_total_batch_derivation() {
        let shape = BatchShape {
            per_replica_batch: 4,
            device_count: 8,
            cores_per_replica: 8,
            fan_out: 8,
        };
        assert_eq!(shape.total_batch(), 32);

        let shape = BatchShape {
            per_replica_batch: 2,
            device_count: 8,
            cores_per_replica: 2,
            fan_out: 8,
        };
        assert_eq!(shape.total_batch(), 64);
    }

    #[test]
    fn test_fixed_shape() {
        assert_eq!(BatchShape::fixed(5).total_batch(), 5);
    }

    #[test]
    fn test_zero_cores_does_not_divide_by_zero() {
        let shape = BatchShape { cores_per_replica: 0, ..BatchShape::default() };
        assert_eq!(shape.total_batch(), 0);
    }

    #[test]
    fn test_rejects_too_many_cores() {
        let config = EngineConfig {
            batch: BatchShape { cores_per_replica: 16, device_count: 16, ..BatchShape::default() },
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ServeError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_empty_batch() {
        let config = EngineConfig {
            batch: BatchShape { per_replica_batch: 1, device_count: 1, cores_per_replica: 2, fan_out: 8 },
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ServeError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let zero_queue = EngineConfig { queue_capacity: 0, ..EngineConfig::default() };
        assert!(zero_queue.validate().is_err());

        let zero_context = EngineConfig { context_length: 0, ..EngineConfig::default() };
        assert!(zero_context.validate().is_err());

        let zero_continuation = EngineConfig { continuation_length: 0, ..EngineConfig::default() };
        assert!(zero_continuation.validate().is_err());
    }
}
