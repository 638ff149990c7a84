//! In-process fake model runtime for unit and integration tests
//!
//! This module provides [`FakeRuntime`] and [`FakeRuntimeHandle`], an
//! in-process pair that replaces the HTTP runtime in tests.
//!
//! # Usage
//!
//! Call [`FakeRuntime::new`] to obtain a `(FakeRuntime, FakeRuntimeHandle)`
//! pair. Wire the [`FakeRuntime`] into the code under test. From the test
//! side, use the [`FakeRuntimeHandle`] to:
//!
//! - Script what the next generation will stream: `handle.script_tokens(..)`
//! - Script a mid-stream failure: `handle.script_failure(..)`
//! - Make the next load fail: `handle.fail_next_load(..)`
//! - Pace token delivery for cancellation tests: `handle.enable_gate()` then
//!   `handle.release_tokens(n)`
//! - Inspect what the code under test sent: `handle.requests()`,
//!   `handle.loads()`
//!
//! With the gate enabled, each scripted token is held back until a permit is
//! released, so a test can deliver exactly N tokens, cancel, and know no
//! further token was in flight.

use crate::error::{Result, TangerineError};
use crate::runtime::{GenerationRequest, ModelHandle, ModelRuntime, TokenStream};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// One scripted step of a fake generation
#[derive(Debug, Clone)]
enum FakeStep {
    Token(String),
    Fail(String),
}

/// State shared between the runtime and its handle
struct FakeState {
    scripts: Mutex<VecDeque<Vec<FakeStep>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    loads: Mutex<Vec<(String, u32)>>,
    load_failure: Mutex<Option<String>>,
    gate: Semaphore,
    gated: AtomicBool,
}

/// Scripted in-process implementation of [`ModelRuntime`]
///
/// Generations replay pre-scripted token sequences; loads succeed unless a
/// failure was scripted. Every call is recorded for inspection through the
/// paired [`FakeRuntimeHandle`].
pub struct FakeRuntime {
    state: Arc<FakeState>,
}

/// Test-side controls for a [`FakeRuntime`]
pub struct FakeRuntimeHandle {
    state: Arc<FakeState>,
}

impl FakeRuntime {
    /// Create a new `(FakeRuntime, FakeRuntimeHandle)` pair
    ///
    /// # Examples
    ///
    /// ```
    /// use tangerine::runtime::{FakeRuntime, ModelRuntime, GenerationRequest};
    /// use futures::StreamExt;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let (runtime, handle) = FakeRuntime::new();
    /// handle.script_tokens(&["Hello", ", world"]);
    ///
    /// let model = runtime.load("fake-model", 2048).await.unwrap();
    /// let request = GenerationRequest::new("prompt");
    /// let mut tokens = runtime.generate(&model, &request).await.unwrap();
    ///
    /// assert_eq!(tokens.next().await.unwrap().unwrap(), "Hello");
    /// assert_eq!(tokens.next().await.unwrap().unwrap(), ", world");
    /// assert!(tokens.next().await.is_none());
    /// # }
    /// ```
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Self, FakeRuntimeHandle) {
        let state = Arc::new(FakeState {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            loads: Mutex::new(Vec::new()),
            load_failure: Mutex::new(None),
            gate: Semaphore::new(0),
            gated: AtomicBool::new(false),
        });
        (
            Self {
                state: Arc::clone(&state),
            },
            FakeRuntimeHandle { state },
        )
    }
}

#[async_trait]
impl ModelRuntime for FakeRuntime {
    async fn load(&self, model_ref: &str, context_size: u32) -> Result<ModelHandle> {
        self.state
            .loads
            .lock()
            .expect("loads lock poisoned")
            .push((model_ref.to_string(), context_size));

        if let Some(error) = self
            .state
            .load_failure
            .lock()
            .expect("load_failure lock poisoned")
            .take()
        {
            return Err(TangerineError::ModelLoad(error).into());
        }

        Ok(ModelHandle {
            model_ref: model_ref.to_string(),
            context_size,
        })
    }

    async fn generate(
        &self,
        _handle: &ModelHandle,
        request: &GenerationRequest,
    ) -> Result<TokenStream> {
        self.state
            .requests
            .lock()
            .expect("requests lock poisoned")
            .push(request.clone());

        let steps = self
            .state
            .scripts
            .lock()
            .expect("scripts lock poisoned")
            .pop_front()
            .ok_or_else(|| TangerineError::Generation("no scripted generation".to_string()))?;

        let state = Arc::clone(&self.state);
        Ok(Box::pin(futures::stream::unfold(
            (steps.into_iter(), state),
            |(mut steps, state)| async move {
                let step = steps.next()?;
                if state.gated.load(Ordering::SeqCst) {
                    match state.gate.acquire().await {
                        Ok(permit) => permit.forget(),
                        Err(_) => return None,
                    }
                }
                let item = match step {
                    FakeStep::Token(token) => Ok(token),
                    FakeStep::Fail(error) => Err(TangerineError::Generation(error).into()),
                };
                Some((item, (steps, state)))
            },
        )))
    }
}

impl FakeRuntimeHandle {
    /// Script the next generation to stream the given tokens and finish
    pub fn script_tokens(&self, tokens: &[&str]) {
        let steps = tokens
            .iter()
            .map(|t| FakeStep::Token(t.to_string()))
            .collect();
        self.state
            .scripts
            .lock()
            .expect("scripts lock poisoned")
            .push_back(steps);
    }

    /// Script the next generation to stream tokens, then fail mid-stream
    pub fn script_failure(&self, tokens: &[&str], error: &str) {
        let mut steps: Vec<FakeStep> = tokens
            .iter()
            .map(|t| FakeStep::Token(t.to_string()))
            .collect();
        steps.push(FakeStep::Fail(error.to_string()));
        self.state
            .scripts
            .lock()
            .expect("scripts lock poisoned")
            .push_back(steps);
    }

    /// Make the next `load` call fail with the given error text
    pub fn fail_next_load(&self, error: &str) {
        *self
            .state
            .load_failure
            .lock()
            .expect("load_failure lock poisoned") = Some(error.to_string());
    }

    /// Hold back every scripted token until a permit is released
    pub fn enable_gate(&self) {
        self.state.gated.store(true, Ordering::SeqCst);
    }

    /// Release `n` gated tokens
    pub fn release_tokens(&self, n: usize) {
        self.state.gate.add_permits(n);
    }

    /// Generation requests received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.state
            .requests
            .lock()
            .expect("requests lock poisoned")
            .clone()
    }

    /// `(model_ref, context_size)` pairs passed to `load` so far
    pub fn loads(&self) -> Vec<(String, u32)> {
        self.state.loads.lock().expect("loads lock poisoned").clone()
    }
}
