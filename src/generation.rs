//! Streaming generation worker
//!
//! One short-lived tokio task per generation request. The task pulls tokens
//! from the runtime's stream and forwards each one over an unbounded channel
//! as a [`GenerationEvent`]; the presentation loop consumes the channel and
//! the controller applies the terminal outcome. Cancellation is cooperative:
//! the token is polled between stream items, so the worker cannot preempt
//! the runtime mid-token.

use crate::error::Result;
use crate::runtime::{GenerationRequest, ModelHandle, ModelRuntime};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Event emitted by a generation task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// One streamed token
    Token(String),
    /// Terminal event; nothing follows it
    Finished(GenerationOutcome),
}

/// How a generation ended
///
/// Every variant carries the full accumulated text, which may be empty or
/// partial. Failures keep the text accumulated before the error; only the
/// error string stays out of conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The runtime finished the completion
    Completed {
        /// Accumulated text of the completion
        text: String,
    },
    /// The user stopped the generation early
    Cancelled {
        /// Text accumulated before cancellation was observed
        text: String,
    },
    /// The runtime reported an error
    Failed {
        /// The error, for display as a system message
        error: String,
        /// Text accumulated before the failure
        text: String,
    },
}

impl GenerationOutcome {
    /// The accumulated text, whatever the ending
    pub fn text(&self) -> &str {
        match self {
            Self::Completed { text } | Self::Cancelled { text } | Self::Failed { text, .. } => text,
        }
    }

    /// The error string for failed generations
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Spawn a generation task
///
/// Obtains the token stream from the runtime and forwards tokens as events
/// until the stream ends, the runtime errors, or `cancel` fires. The
/// cancellation check runs before each token is processed (`biased` select),
/// and exiting on cancellation is not an error: the partial text rides out
/// in the terminal [`GenerationOutcome::Cancelled`].
///
/// # Arguments
///
/// * `runtime` - The model runtime to generate with
/// * `handle` - Handle from a successful model load
/// * `request` - Parameters for this generation
/// * `cancel` - Token polled between stream items
///
/// # Returns
///
/// The receiving end of the event channel. The final event is always
/// `Finished`; the channel closes after it.
pub fn spawn_generation(
    runtime: Arc<dyn ModelRuntime>,
    handle: ModelHandle,
    request: GenerationRequest,
    cancel: CancellationToken,
) -> mpsc::UnboundedReceiver<GenerationEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let outcome = run_generation(runtime, handle, request, cancel, &tx).await;
        let _ = tx.send(GenerationEvent::Finished(outcome));
    });

    rx
}

async fn run_generation(
    runtime: Arc<dyn ModelRuntime>,
    handle: ModelHandle,
    request: GenerationRequest,
    cancel: CancellationToken,
    tx: &mpsc::UnboundedSender<GenerationEvent>,
) -> GenerationOutcome {
    let mut stream = match runtime.generate(&handle, &request).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Generation failed to start: {}", e);
            return GenerationOutcome::Failed {
                error: e.to_string(),
                text: String::new(),
            };
        }
    };

    let mut accumulated = String::new();

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!(
                    "Generation cancelled after {} chars",
                    accumulated.len()
                );
                return GenerationOutcome::Cancelled { text: accumulated };
            }

            next = stream.next() => match next {
                Some(Ok(token)) => {
                    accumulated.push_str(&token);
                    let _ = tx.send(GenerationEvent::Token(token));
                }
                Some(Err(e)) => {
                    tracing::warn!("Generation failed mid-stream: {}", e);
                    return GenerationOutcome::Failed {
                        error: e.to_string(),
                        text: accumulated,
                    };
                }
                None => {
                    return GenerationOutcome::Completed { text: accumulated };
                }
            }
        }
    }
}

/// Drain a generation's events, returning the terminal outcome
///
/// Convenience for callers that do not render tokens incrementally (tests,
/// non-interactive paths). Returns a synthetic `Failed` outcome if the
/// channel closes without a terminal event, which indicates a panicked
/// worker task.
pub async fn drain_events(
    rx: &mut mpsc::UnboundedReceiver<GenerationEvent>,
) -> Result<GenerationOutcome> {
    while let Some(event) = rx.recv().await {
        if let GenerationEvent::Finished(outcome) = event {
            return Ok(outcome);
        }
    }
    Ok(GenerationOutcome::Failed {
        error: "generation task ended without an outcome".to_string(),
        text: String::new(),
    })
}
