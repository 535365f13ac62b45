use serde::{Deserialize, Serialize};

/// Per-slot sampling parameters handed to the compute resource untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub top_p: f32,
    pub temperature: f32,
}

impl SamplingParams {
    pub fn new(top_p: f32, temperature: f32) -> Self {
        Self { top_p, temperature }
    }
}

/// Parameters used for filler slots: `top_p = 1`, `temperature = 1`.
impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            top_p: 1.0,
            temperature: 1.0,
        }
    }
}

/// A single text completion request as it arrives from the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub text: String,
    pub params: SamplingParams,
}

impl CompletionRequest {
    pub fn new(text: impl Into<String>, params: SamplingParams) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }
}
