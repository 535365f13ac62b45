use async_trait::async_trait;
use crate::error::{Result, ServeError};

/// The stages the batching loop drives for every batch.
///
/// The loop itself only knows how to collect requests; turning them into a
/// model input, running the model and routing the outputs is delegated here.
#[async_trait]
pub(crate) trait BatchHandler: Send + Sync {
    type Request: Send;
    type ModelInput: Send + Sync;
    type ModelOutput: Send;

    /// Build one fixed-shape model input from up to a full batch of requests.
    fn make_batch_input(&self, requests: Vec<Self::Request>) -> Self::ModelInput;

    /// Run the model forward pass. Failures are returned, never propagated as panics.
    async fn forward(&self, model_input: &Self::ModelInput) -> Result<Self::ModelOutput>;

    /// Route outputs, or the forward failure, back to the requests in `model_input`.
    fn handle_outputs(&self, model_input: Self::ModelInput, output: Result<Self::ModelOutput>);

    /// Answer a request that will never be batched.
    fn reject(&self, request: Self::Request, error: ServeError);
}
