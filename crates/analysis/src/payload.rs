//! Fully resolved request bodies for the batch submission service.

use serde::{Deserialize, Serialize};

/// Desired shape of the model response.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    Json,
}

/// Model sampling parameters attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub temperature: f64,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
}

impl Default for ModelParams {
    fn default() -> Self {
        // Report sections are structured; low temperature, JSON by default.
        Self {
            temperature: 0.2,
            max_tokens: 2048,
            response_format: ResponseFormat::Json,
        }
    }
}

impl ModelParams {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_response_format(mut self, response_format: ResponseFormat) -> Self {
        self.response_format = response_format;
        self
    }
}

/// Fully resolved request body. Built once per job invocation; immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    system: String,
    user: String,
    params: ModelParams,
}

impl RequestPayload {
    pub fn new(system: impl Into<String>, user: impl Into<String>, params: ModelParams) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            params,
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }
}
