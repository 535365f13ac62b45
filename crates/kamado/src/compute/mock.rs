use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use super::{BatchInput, ComputeError, ComputeResource};

/// Returns pre-baked outputs and records every batch it was given.
#[derive(Clone, Default)]
pub struct ScriptedCompute {
    pub(crate) outputs: Vec<Vec<u32>>,
    pub(crate) seen: Arc<Mutex<Vec<BatchInput>>>,
}

impl ScriptedCompute {
    pub fn new(outputs: Vec<Vec<u32>>) -> Self {
        Self {
            outputs,
            seen: Default::default(),
        }
    }

    pub fn seen(&self) -> Vec<BatchInput> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComputeResource for ScriptedCompute {
    async fn run_batch(&self, batch: &BatchInput) -> Result<Vec<Vec<u32>>, ComputeError> {
        self.seen.lock().unwrap().push(batch.clone());
        Ok(self.outputs.clone())
    }
}

/// Fails the first `failures` batches, then echoes.
#[derive(Default)]
pub struct FlakyCompute {
    pub(crate) failures: Mutex<usize>,
}

impl FlakyCompute {
    pub fn new(failures: usize) -> Self {
        Self { failures: Mutex::new(failures) }
    }
}

#[async_trait]
impl ComputeResource for FlakyCompute {
    async fn run_batch(&self, batch: &BatchInput) -> Result<Vec<Vec<u32>>, ComputeError> {
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ComputeError("device lost".to_string()));
            }
        }
        super::Echo::new(0).run_batch(batch).await
    }
}

/// Panics on every batch.
pub struct PanickingCompute;

#[async_trait]
impl ComputeResource for PanickingCompute {
    async fn run_batch(&self, _batch: &BatchInput) -> Result<Vec<Vec<u32>>, ComputeError> {
        panic!("kernel launch failed")
    }
}

/// Blocks until released, so tests can observe the queue while a batch is running.
pub struct GatedCompute {
    pub(crate) gate: Arc<tokio::sync::Semaphore>,
}

impl GatedCompute {
    pub fn new() -> (Self, Arc<tokio::sync::Semaphore>) {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        (Self { gate: gate.clone() }, gate)
    }
}

#[async_trait]
impl ComputeResource for GatedCompute {
    async fn run_batch(&self, batch: &BatchInput) -> Result<Vec<Vec<u32>>, ComputeError> {
        let permit = self.gate.acquire().await
            .map_err(|err| ComputeError(err.to_string()))?;
        permit.forget();
        super::Echo::new(0).run_batch(batch).await
    }
}
