//! Tangerine - Terminal chat for local models
//!
//! This library provides the core functionality for the Tangerine chat
//! client: session persistence, prompt construction, streaming generation
//! with cooperative cancellation, and the controller that ties them
//! together.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Conversation model and flat-file session storage
//! - `prompt`: Bounded-window prompt rendering
//! - `runtime`: Model runtime abstraction (Ollama HTTP backend, test fake)
//! - `generation`: Task-per-request streaming worker
//! - `controller`: Application state and command surface for the UI
//! - `config`: Last-used-model persistence
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tangerine::{ChatController, SessionStore};
//! use tangerine::runtime::OllamaRuntime;
//! use tangerine::generation::drain_events;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SessionStore::open_default()?;
//!     let runtime = Arc::new(OllamaRuntime::new("http://localhost:11434"));
//!     let mut controller = ChatController::new(store, runtime);
//!
//!     controller.load_model("llama3.2:latest").await?;
//!     let mut events = controller.send("Hello!")?;
//!     let outcome = drain_events(&mut events).await?;
//!     controller.finish(&outcome)?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod generation;
pub mod prompt;
pub mod runtime;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use controller::ChatController;
pub use error::{Result, TangerineError};
pub use generation::{GenerationEvent, GenerationOutcome};
pub use prompt::build_prompt;
pub use runtime::{GenerationRequest, ModelHandle, ModelRuntime};
pub use session::{Conversation, Sender, SessionStore, Turn};
