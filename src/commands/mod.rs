/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `chat`     — Interactive chat with streaming responses
- `sessions` — Session listing, deletion, and export

These handlers are intentionally small and use the library components:
the session store, the controller, and the model runtime.
*/

pub mod chat;
pub mod sessions;
