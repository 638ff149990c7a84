//! Ollama-backed model runtime
//!
//! Implements [`ModelRuntime`] against an Ollama-compatible HTTP server.
//! `load` issues the empty-prompt form of `/api/generate`, which instructs
//! the server to bring the model into memory; `generate` posts a raw-mode
//! streaming request and parses the newline-delimited JSON chunks out of
//! the response byte stream. Chunks can arrive split across network reads,
//! so a rolling string buffer accumulates bytes until a full line is
//! available.

use crate::error::{Result, TangerineError};
use crate::runtime::{GenerationRequest, ModelHandle, ModelRuntime, TokenStream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;

/// Default Ollama server address
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// HTTP model runtime speaking the Ollama generate API
///
/// # Examples
///
/// ```no_run
/// use tangerine::runtime::{ModelRuntime, OllamaRuntime, GenerationRequest};
///
/// # async fn example() -> tangerine::error::Result<()> {
/// let runtime = OllamaRuntime::new("http://localhost:11434");
/// let handle = runtime.load("llama3.2:latest", 2048).await?;
/// let request = GenerationRequest::new("<|system|>\nhi\n<|assistant|>\n");
/// let mut tokens = runtime.generate(&handle, &request).await?;
/// # Ok(())
/// # }
/// ```
pub struct OllamaRuntime {
    client: Client,
    host: String,
}

/// Request body for `/api/generate`
#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    raw: bool,
    stream: bool,
    options: OllamaOptions<'a>,
}

/// Sampling and context options for a generate call
#[derive(Debug, Serialize)]
struct OllamaOptions<'a> {
    num_ctx: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

/// One NDJSON chunk from a generate response
#[derive(Debug, Deserialize)]
struct OllamaGenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaRuntime {
    /// Create a runtime talking to the given host
    ///
    /// # Arguments
    ///
    /// * `host` - Base URL of the Ollama server; a trailing slash is
    ///   tolerated
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            host,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.host)
    }
}

#[async_trait]
impl ModelRuntime for OllamaRuntime {
    /// Preload a model into server memory
    ///
    /// Uses the empty-prompt, non-streaming form of `/api/generate`, which
    /// the server treats as a load request. Failures are reported as
    /// [`TangerineError::ModelLoad`]; the caller may retry with another
    /// model reference.
    async fn load(&self, model_ref: &str, context_size: u32) -> Result<ModelHandle> {
        let body = OllamaGenerateRequest {
            model: model_ref,
            prompt: "",
            raw: true,
            stream: false,
            options: OllamaOptions {
                num_ctx: context_size,
                num_predict: None,
                temperature: None,
                stop: None,
            },
        };

        tracing::info!("Loading model {} (num_ctx={})", model_ref, context_size);

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| TangerineError::ModelLoad(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TangerineError::ModelLoad(format!(
                "server returned {}: {}",
                status,
                text.trim()
            ))
            .into());
        }

        let chunk: OllamaGenerateChunk = response
            .json()
            .await
            .map_err(|e| TangerineError::ModelLoad(e.to_string()))?;
        if let Some(error) = chunk.error {
            return Err(TangerineError::ModelLoad(error).into());
        }

        Ok(ModelHandle {
            model_ref: model_ref.to_string(),
            context_size,
        })
    }

    /// Start a raw-mode streaming generation
    ///
    /// The prompt already carries its own role markers, so the server-side
    /// chat template is bypassed with `raw: true`.
    async fn generate(
        &self,
        handle: &ModelHandle,
        request: &GenerationRequest,
    ) -> Result<TokenStream> {
        let body = OllamaGenerateRequest {
            model: &handle.model_ref,
            prompt: &request.prompt,
            raw: true,
            stream: true,
            options: OllamaOptions {
                num_ctx: handle.context_size,
                num_predict: Some(request.max_tokens),
                temperature: Some(request.temperature),
                stop: Some(&request.stop_sequences),
            },
        };

        tracing::debug!(
            "Generating with {} (max_tokens={}, temperature={})",
            handle.model_ref,
            request.max_tokens,
            request.temperature
        );

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| TangerineError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TangerineError::Generation(format!(
                "server returned {}: {}",
                status,
                text.trim()
            ))
            .into());
        }

        Ok(ndjson_token_stream(response.bytes_stream()))
    }
}

/// Items queued between network reads while decoding the NDJSON stream
enum Decoded {
    Token(String),
    Error(String),
}

/// Decoder state threaded through the unfold below
struct DecodeState {
    bytes: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: String,
    pending: VecDeque<Decoded>,
    finished: bool,
}

impl DecodeState {
    /// Parse every complete line currently in the buffer
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].trim().to_string();
            self.buffer.drain(..=pos);
            self.decode_line(&line);
            if self.finished {
                break;
            }
        }
    }

    fn decode_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<OllamaGenerateChunk>(line) {
            Ok(chunk) => {
                if let Some(error) = chunk.error {
                    self.pending.push_back(Decoded::Error(error));
                    self.finished = true;
                    return;
                }
                if !chunk.response.is_empty() {
                    self.pending.push_back(Decoded::Token(chunk.response));
                }
                if chunk.done {
                    self.finished = true;
                }
            }
            Err(e) => {
                self.pending
                    .push_back(Decoded::Error(format!("malformed runtime chunk: {}", e)));
                self.finished = true;
            }
        }
    }
}

/// Turn a response byte stream into a stream of token strings
///
/// Lines may span chunk boundaries; bytes accumulate in a rolling buffer
/// until a newline completes them. A chunk carrying an `error` field or a
/// malformed line terminates the stream with a [`TangerineError::Generation`].
fn ndjson_token_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
) -> TokenStream {
    let state = DecodeState {
        bytes: Box::pin(byte_stream),
        buffer: String::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return match item {
                    Decoded::Token(token) => Some((Ok(token), state)),
                    Decoded::Error(error) => {
                        state.finished = true;
                        state.pending.clear();
                        Some((Err(TangerineError::Generation(error).into()), state))
                    }
                };
            }

            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(TangerineError::Generation(e.to_string()).into()), state));
                }
                None => {
                    // Server closed the connection; a final unterminated
                    // line is still decodable.
                    state.finished = true;
                    let leftover = std::mem::take(&mut state.buffer);
                    let leftover = leftover.trim().to_string();
                    if !leftover.is_empty() {
                        state.decode_line(&leftover);
                    }
                    if state.pending.is_empty() {
                        return None;
                    }
                }
            }
        }
    }))
}
