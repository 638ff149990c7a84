//! Session controller
//!
//! [`ChatController`] owns the application state the original kept in
//! ambient globals: the active conversation, its storage id, the loaded
//! model handle, the busy flag, and the generation parameters. The
//! presentation layer issues commands against it and consumes the event
//! channel each send returns; the controller never mutates state from the
//! worker task.

use crate::config::Config;
use crate::error::{Result, TangerineError};
use crate::generation::{spawn_generation, GenerationEvent, GenerationOutcome};
use crate::prompt::{build_prompt, DEFAULT_WINDOW_SIZE};
use crate::runtime::{
    context_size_for, GenerationRequest, ModelHandle, ModelRuntime, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE, MAX_MAX_TOKENS, MAX_TEMPERATURE, MIN_MAX_TOKENS,
};
use crate::session::{Conversation, Sender, SessionStore, SessionSummary};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// User-adjustable sampling parameters
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    /// Maximum tokens per completion
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Owns the active conversation and serializes generation requests
///
/// Exactly one conversation is active at a time, and at most one generation
/// is in flight; a second send while busy is rejected outright rather than
/// queued.
pub struct ChatController {
    store: SessionStore,
    runtime: Arc<dyn ModelRuntime>,
    conversation: Conversation,
    current_id: Option<String>,
    model: Option<ModelHandle>,
    busy: bool,
    cancel: Option<CancellationToken>,
    params: GenerationParams,
    window_size: usize,
    config_path: Option<PathBuf>,
}

impl ChatController {
    /// Create a controller over a store and runtime
    ///
    /// The controller starts with a fresh conversation, no loaded model,
    /// and default parameters. Model references are not remembered across
    /// runs unless a config path is attached with [`Self::with_config_path`].
    pub fn new(store: SessionStore, runtime: Arc<dyn ModelRuntime>) -> Self {
        Self {
            store,
            runtime,
            conversation: Conversation::new(),
            current_id: None,
            model: None,
            busy: false,
            cancel: None,
            params: GenerationParams::default(),
            window_size: DEFAULT_WINDOW_SIZE,
            config_path: None,
        }
    }

    /// Remember successful model loads in the config file at `path`
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// The active conversation
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Storage id of the active session, when it has been saved
    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    /// True while a generation is in flight
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Handle of the loaded model, if any
    pub fn model(&self) -> Option<&ModelHandle> {
        self.model.as_ref()
    }

    /// Current sampling parameters
    pub fn params(&self) -> GenerationParams {
        self.params
    }

    /// Set `max_tokens`, clamped to the accepted range
    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.params.max_tokens = max_tokens.clamp(MIN_MAX_TOKENS, MAX_MAX_TOKENS);
    }

    /// Set the sampling temperature, clamped to `0.0..=2.0`
    pub fn set_temperature(&mut self, temperature: f32) {
        self.params.temperature = temperature.clamp(0.0, MAX_TEMPERATURE);
    }

    /// System prompt of the active conversation
    pub fn system_prompt(&self) -> &str {
        self.conversation.system_prompt()
    }

    /// Replace the system prompt of the active conversation
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.conversation.set_system_prompt(prompt);
    }

    /// Load a model through the runtime
    ///
    /// The context size is derived from the current `max_tokens` setting.
    /// On success the handle replaces any previously loaded model and the
    /// reference is remembered in the config file (when one is attached);
    /// a failed config write is logged, never surfaced. Load errors are
    /// non-fatal: the previous model, if any, stays usable.
    pub async fn load_model(&mut self, model_ref: &str) -> Result<()> {
        let context_size = context_size_for(self.params.max_tokens);
        let handle = self.runtime.load(model_ref, context_size).await?;
        self.model = Some(handle);

        if let Some(path) = &self.config_path {
            let mut config = Config::load_from(path);
            config.last_model = Some(model_ref.to_string());
            if let Err(e) = config.save_to(path) {
                tracing::warn!("Failed to remember model in config: {}", e);
            }
        }

        Ok(())
    }

    /// Send a user message, starting one generation
    ///
    /// Rejected with [`TangerineError::GenerationInFlight`] while busy, with
    /// [`TangerineError::ModelNotLoaded`] before a model is loaded, and with
    /// [`TangerineError::EmptyMessage`] for whitespace-only input; rejection
    /// leaves the conversation unchanged.
    ///
    /// # Returns
    ///
    /// The event channel for this generation. Consume it until the
    /// `Finished` event, then pass the outcome to [`Self::finish`].
    pub fn send(&mut self, text: &str) -> Result<mpsc::UnboundedReceiver<GenerationEvent>> {
        if self.busy {
            return Err(TangerineError::GenerationInFlight.into());
        }
        let Some(model) = self.model.clone() else {
            return Err(TangerineError::ModelNotLoaded.into());
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TangerineError::EmptyMessage.into());
        }

        self.conversation.append_turn(Sender::User, trimmed);

        let prompt = build_prompt(&self.conversation, self.window_size);
        let request = GenerationRequest::new(prompt)
            .with_max_tokens(self.params.max_tokens)
            .with_temperature(self.params.temperature);

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        self.busy = true;

        tracing::debug!(
            "Starting generation ({} turns in conversation)",
            self.conversation.len()
        );
        Ok(spawn_generation(
            Arc::clone(&self.runtime),
            model,
            request,
            cancel,
        ))
    }

    /// Apply a generation's terminal outcome
    ///
    /// Clears the busy flag, appends the accumulated text as a single
    /// Assistant turn when non-empty (a zero-token cancellation appends
    /// nothing), and persists the session. The
    /// outcome's error string, if any, is the caller's to display; it never
    /// enters conversation history.
    pub fn finish(&mut self, outcome: &GenerationOutcome) -> Result<()> {
        self.busy = false;
        self.cancel = None;

        self.conversation
            .append_turn(Sender::Assistant, outcome.text());
        self.persist()
    }

    /// Request cancellation of the in-flight generation
    ///
    /// Cooperative: the worker observes the token between streamed tokens.
    /// A no-op when idle.
    pub fn request_stop(&self) {
        if let Some(cancel) = &self.cancel {
            tracing::debug!("Stop requested");
            cancel.cancel();
        }
    }

    /// Persist the active conversation
    ///
    /// Assigns and records the session id on first save. Conversations with
    /// no turns are not written.
    pub fn persist(&mut self) -> Result<()> {
        self.current_id = self.store.save(&self.conversation, self.current_id.as_deref())?;
        Ok(())
    }

    /// Start a fresh session
    ///
    /// The current conversation is persisted first (when it has turns),
    /// then state resets to an empty, unsaved conversation.
    pub fn new_session(&mut self) -> Result<()> {
        self.persist()?;
        self.conversation.clear();
        self.current_id = None;
        Ok(())
    }

    /// Switch to a stored session
    ///
    /// The current conversation is persisted before the switch.
    pub fn open_session(&mut self, id: &str) -> Result<()> {
        self.persist()?;
        let loaded = self.store.load(id)?;
        self.conversation = loaded;
        self.current_id = Some(id.to_string());
        Ok(())
    }

    /// Delete a stored session
    ///
    /// Deleting the active session also resets to a fresh conversation.
    ///
    /// # Returns
    ///
    /// `true` when the deleted session was the active one.
    pub fn delete_session(&mut self, id: &str) -> Result<bool> {
        self.store.delete(id)?;
        if self.current_id.as_deref() == Some(id) {
            self.conversation.clear();
            self.current_id = None;
            return Ok(true);
        }
        Ok(false)
    }

    /// Export the active conversation to a user-chosen path
    pub fn export<P: Into<PathBuf>>(&self, path: P) -> Result<PathBuf> {
        self.store.export(&self.conversation, path)
    }

    /// List stored sessions, most recent first
    pub fn sessions(&self) -> Result<Vec<SessionSummary>> {
        self.store.list()
    }
}
