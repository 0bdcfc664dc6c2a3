//! Text generation trait: the abstraction over whatever AI backend the host
//! application wires in.
//!
//! The engine never sees a provider wire format. It hands a
//! [`GenerationRequest`] to a [`TextGenerator`] and gets text or a
//! [`GenerationError`] back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Result of a single generation call: `Ok(data)` or `Err(error)`.
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// A provider-agnostic generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System instructions (usually the injected project context)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// The user-facing prompt
    pub prompt: String,

    /// Sampling and output options
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            options: GenerationOptions::default(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Options forwarded untouched to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Ask the backend for a JSON-only response
    #[serde(default)]
    pub json_response: bool,
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: None,
            json_response: false,
        }
    }
}

/// Text returned by a successful generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,

    /// Which model produced the text, if the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GeneratedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }
}

/// The external generation collaborator.
///
/// Implementations wrap a concrete AI backend. The engine treats every
/// implementation as opaque: retries, timeouts and fallbacks are layered on
/// top by the orchestrator, so implementations should make exactly one
/// attempt per call.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A human-readable name for this generator (e.g., "gemini", "mock").
    fn name(&self) -> &str;

    /// Send a request and get the generated text back.
    async fn generate_text(&self, request: GenerationRequest) -> GenerationResult<GeneratedText>;
}
