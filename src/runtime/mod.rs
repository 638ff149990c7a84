//! Model runtime abstraction
//!
//! This module defines the [`ModelRuntime`] trait that all model backends
//! implement, along with the request and handle types shared between them.
//! The application never talks to an inference engine directly; it loads a
//! model through the trait and consumes a finite, non-restartable stream of
//! token strings.

use crate::error::Result;
use crate::prompt::STOP_SEQUENCES;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

pub mod fake;
pub mod ollama;

pub use fake::{FakeRuntime, FakeRuntimeHandle};
pub use ollama::OllamaRuntime;

/// Default number of tokens to generate
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Smallest accepted `max_tokens` value
pub const MIN_MAX_TOKENS: u32 = 64;

/// Largest accepted `max_tokens` value
pub const MAX_MAX_TOKENS: u32 = 4096;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Largest accepted sampling temperature
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Context window floor, in tokens
const MIN_CONTEXT_SIZE: u32 = 2048;

/// Compute the context size to load a model with
///
/// Leaves headroom above the requested completion length:
/// `max(2048, max_tokens + 512)`.
///
/// # Examples
///
/// ```
/// use tangerine::runtime::context_size_for;
///
/// assert_eq!(context_size_for(512), 2048);
/// assert_eq!(context_size_for(4096), 4608);
/// ```
pub fn context_size_for(max_tokens: u32) -> u32 {
    MIN_CONTEXT_SIZE.max(max_tokens + 512)
}

/// A finite, lazily produced sequence of token strings
///
/// The stream is not restartable; consuming it is the one chance to observe
/// the generation.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Proof of a successful model load
///
/// Produced by [`ModelRuntime::load`] and passed back to
/// [`ModelRuntime::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    /// The model reference the runtime resolved
    pub model_ref: String,
    /// Context window the model was loaded with, in tokens
    pub context_size: u32,
}

/// Parameters for one generation call
///
/// Ephemeral: constructed per send and owned by the worker invocation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The fully rendered prompt
    pub prompt: String,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature, 0.0 to 2.0
    pub temperature: f32,
    /// Sequences that terminate generation when emitted
    pub stop_sequences: Vec<String>,
}

impl GenerationRequest {
    /// Creates a request with default parameters
    ///
    /// # Examples
    ///
    /// ```
    /// use tangerine::runtime::GenerationRequest;
    ///
    /// let request = GenerationRequest::new("<|system|>\nhi\n<|assistant|>\n");
    /// assert_eq!(request.max_tokens, 512);
    /// assert!((request.temperature - 0.7).abs() < f32::EPSILON);
    /// assert!(!request.stop_sequences.is_empty());
    /// ```
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            stop_sequences: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Set `max_tokens`, clamped to the accepted range
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.clamp(MIN_MAX_TOKENS, MAX_MAX_TOKENS);
        self
    }

    /// Set the sampling temperature, clamped to `0.0..=2.0`
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, MAX_TEMPERATURE);
        self
    }
}

/// Interface every model backend implements
///
/// `load` resolves a model reference into a [`ModelHandle`]; `generate`
/// starts one completion and returns its token stream. Implementations are
/// shared behind an `Arc` and must be safe to call from a spawned task.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Load a model, returning a handle for subsequent generate calls
    ///
    /// # Arguments
    ///
    /// * `model_ref` - Model path or name, as understood by the backend
    /// * `context_size` - Context window to load with, in tokens
    async fn load(&self, model_ref: &str, context_size: u32) -> Result<ModelHandle>;

    /// Start one generation and return its token stream
    ///
    /// The stream yields token strings as the runtime produces them and
    /// ends when the runtime finishes; it cannot be restarted.
    async fn generate(
        &self,
        handle: &ModelHandle,
        request: &GenerationRequest,
    ) -> Result<TokenStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_size_floor() {
        assert_eq!(context_size_for(64), 2048);
        assert_eq!(context_size_for(512), 2048);
        assert_eq!(context_size_for(1536), 2048);
    }

    #[test]
    fn test_context_size_headroom_above_floor() {
        assert_eq!(context_size_for(2048), 2560);
        assert_eq!(context_size_for(4096), 4608);
    }

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("prompt");
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(
            request.stop_sequences,
            vec!["<|user|>", "</s>", "<|system|>"]
        );
    }

    #[test]
    fn test_max_tokens_clamped_to_range() {
        assert_eq!(GenerationRequest::new("p").with_max_tokens(1).max_tokens, 64);
        assert_eq!(
            GenerationRequest::new("p").with_max_tokens(100_000).max_tokens,
            4096
        );
        assert_eq!(
            GenerationRequest::new("p").with_max_tokens(1024).max_tokens,
            1024
        );
    }

    #[test]
    fn test_temperature_clamped_to_range() {
        let cold = GenerationRequest::new("p").with_temperature(-1.0);
        assert_eq!(cold.temperature, 0.0);
        let hot = GenerationRequest::new("p").with_temperature(9.5);
        assert_eq!(hot.temperature, 2.0);
    }
}
