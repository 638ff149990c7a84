//! Command-line interface definition for Tangerine
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat command and session management
//! subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tangerine - Terminal chat for local models
///
/// Talk to a locally served model with streaming responses and
/// flat-file session history.
#[derive(Parser, Debug, Clone)]
#[command(name = "tangerine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory for stored chat sessions
    #[arg(long, env = "TANGERINE_CHATS_DIR")]
    pub chats_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Tangerine
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Model reference to load at startup
        ///
        /// When omitted, the last used model (if any) is suggested but
        /// not loaded; use `/model` inside the chat to load one.
        #[arg(short, long)]
        model: Option<String>,

        /// Resume a stored session by id
        #[arg(short, long)]
        resume: Option<String>,

        /// Ollama-compatible server to generate with
        #[arg(long, env = "TANGERINE_HOST", default_value = "http://localhost:11434")]
        host: String,

        /// Maximum tokens per response (64-4096)
        #[arg(long, default_value_t = 512)]
        max_tokens: u32,

        /// Sampling temperature (0.0-2.0)
        #[arg(long, default_value_t = 0.7)]
        temperature: f32,
    },

    /// Manage stored chat sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List stored sessions, most recent first
    List,

    /// Delete a session
    Delete {
        /// Session id (as shown by `sessions list`)
        id: String,
    },

    /// Export a session to a JSON file
    Export {
        /// Session id (as shown by `sessions list`)
        id: String,

        /// Destination path; `.json` is appended when missing
        path: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
