//! Interactive chat handler
//!
//! Runs a readline loop against a [`ChatController`]. Streamed tokens are
//! printed as they arrive; Ctrl-C during a response requests cooperative
//! cancellation, and at the prompt it ends the session. Slash commands
//! cover session management without leaving the chat.

use crate::config::Config;
use crate::controller::ChatController;
use crate::error::{Result, TangerineError};
use crate::generation::{GenerationEvent, GenerationOutcome};
use crate::runtime::OllamaRuntime;
use crate::session::{Sender, SessionStore};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Options for the chat command, mirrored from the CLI
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Model reference to load at startup
    pub model: Option<String>,
    /// Session id to resume
    pub resume: Option<String>,
    /// Ollama-compatible server address
    pub host: String,
    /// Maximum tokens per response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// Slash commands understood by the chat loop
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    New,
    Sessions,
    Open(String),
    Delete(String),
    System(Option<String>),
    Model(String),
    Export(String),
    Params,
    Help,
    Exit,
    /// Not a slash command: send the line as a message
    None,
}

/// Parse a line into a slash command
fn parse_slash_command(line: &str) -> SlashCommand {
    let Some(rest) = line.strip_prefix('/') else {
        return SlashCommand::None;
    };
    let mut parts = rest.splitn(2, char::is_whitespace);
    let keyword = parts.next().unwrap_or("");
    let argument = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    match (keyword, argument) {
        ("new", _) => SlashCommand::New,
        ("sessions", _) => SlashCommand::Sessions,
        ("open", Some(id)) => SlashCommand::Open(id),
        ("delete", Some(id)) => SlashCommand::Delete(id),
        ("system", arg) => SlashCommand::System(arg),
        ("model", Some(model)) => SlashCommand::Model(model),
        ("export", Some(path)) => SlashCommand::Export(path),
        ("params", _) => SlashCommand::Params,
        ("help", _) | ("?", _) => SlashCommand::Help,
        ("exit", _) | ("quit", _) => SlashCommand::Exit,
        _ => SlashCommand::Help,
    }
}

fn print_system(message: &str) {
    println!("{} {}", "System:".dimmed(), message.dimmed());
}

fn print_error(message: &str) {
    println!("{} {}", "System:".red(), message.red());
}

fn print_help() {
    println!("Commands:");
    println!("  /new              Start a fresh session (current one is saved)");
    println!("  /sessions         List stored sessions");
    println!("  /open <id>        Switch to a stored session");
    println!("  /delete <id>      Delete a stored session");
    println!("  /system [text]    Show or replace the system prompt");
    println!("  /model <ref>      Load a model");
    println!("  /export <path>    Export this session to a JSON file");
    println!("  /params           Show generation parameters");
    println!("  /help             Show this help");
    println!("  /exit             Save and quit");
    println!();
    println!("Press Ctrl-C while a response is streaming to stop it.");
}

/// Print the turns of the active conversation, as when resuming
fn print_conversation(controller: &ChatController) {
    for turn in controller.conversation().turns() {
        let label = match turn.sender {
            Sender::User => "You:".yellow().bold(),
            Sender::Assistant => "AI:".cyan().bold(),
        };
        println!("{} {}", label, turn.text);
    }
}

/// Start interactive chat
///
/// # Arguments
///
/// * `options` - Chat options mirrored from the CLI
pub async fn run_chat(options: ChatOptions) -> Result<()> {
    tracing::info!("Starting interactive chat");

    let store = SessionStore::open_default()?;
    let runtime = Arc::new(OllamaRuntime::new(&options.host));

    let mut controller = ChatController::new(store, runtime);
    if let Ok(config_path) = Config::default_path() {
        controller = controller.with_config_path(config_path);
    }
    controller.set_max_tokens(options.max_tokens);
    controller.set_temperature(options.temperature);

    println!("{}", "tangerine".truecolor(255, 140, 0).bold());
    println!("Type a message to chat, or {} for commands.\n", "/help".cyan());

    match &options.model {
        Some(model) => load_model(&mut controller, model).await,
        None => {
            // Pre-fill only: the remembered model is suggested, never
            // auto-loaded.
            let config = Config::load();
            if let Some(last) = config.last_model {
                print_system(&format!(
                    "Last model remembered: {}. Use /model {} to load it.",
                    last, last
                ));
            }
        }
    }

    if let Some(id) = &options.resume {
        match controller.open_session(id) {
            Ok(()) => {
                print_system(&format!("Resumed session {}", id));
                print_conversation(&controller);
            }
            Err(e) => print_error(&e.to_string()),
        }
    }

    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = format!("{} ", ">>".truecolor(255, 140, 0));
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                match parse_slash_command(trimmed) {
                    SlashCommand::None => {
                        if let Err(e) = send_and_stream(&mut controller, trimmed).await {
                            print_error(&e.to_string());
                        }
                    }
                    SlashCommand::New => match controller.new_session() {
                        Ok(()) => print_system("Ready for a new conversation."),
                        Err(e) => print_error(&e.to_string()),
                    },
                    SlashCommand::Sessions => match controller.sessions() {
                        Ok(sessions) if sessions.is_empty() => {
                            print_system("No stored sessions.")
                        }
                        Ok(sessions) => {
                            for session in sessions {
                                println!(
                                    "  {}  {} ({} messages)",
                                    session.id.cyan(),
                                    session.title,
                                    session.message_count
                                );
                            }
                        }
                        Err(e) => print_error(&e.to_string()),
                    },
                    SlashCommand::Open(id) => match controller.open_session(&id) {
                        Ok(()) => {
                            print_system(&format!("Switched to session {}", id));
                            print_conversation(&controller);
                        }
                        Err(e) => print_error(&e.to_string()),
                    },
                    SlashCommand::Delete(id) => match controller.delete_session(&id) {
                        Ok(was_current) => {
                            print_system(&format!("Deleted session {}", id));
                            if was_current {
                                print_system("Ready for a new conversation.");
                            }
                        }
                        Err(e) => print_error(&e.to_string()),
                    },
                    SlashCommand::System(None) => {
                        print_system(&format!(
                            "System prompt: {}",
                            controller.system_prompt()
                        ));
                    }
                    SlashCommand::System(Some(text)) => {
                        controller.set_system_prompt(text);
                        print_system("System prompt updated.");
                    }
                    SlashCommand::Model(model) => {
                        load_model(&mut controller, &model).await;
                    }
                    SlashCommand::Export(path) => match controller.export(path) {
                        Ok(written) => {
                            print_system(&format!("Exported to {}", written.display()))
                        }
                        Err(e) => print_error(&e.to_string()),
                    },
                    SlashCommand::Params => {
                        let params = controller.params();
                        print_system(&format!(
                            "max_tokens={} temperature={:.2} model={}",
                            params.max_tokens,
                            params.temperature,
                            controller
                                .model()
                                .map(|m| m.model_ref.as_str())
                                .unwrap_or("<none>")
                        ));
                    }
                    SlashCommand::Help => print_help(),
                    SlashCommand::Exit => break,
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                print_error(&format!("Input error: {}", e));
                break;
            }
        }
    }

    if let Err(e) = controller.persist() {
        print_error(&e.to_string());
    }
    println!("Bye.");
    Ok(())
}

/// Load a model, reporting the result as system messages
async fn load_model(controller: &mut ChatController, model: &str) {
    print_system("Loading model into memory...");
    match controller.load_model(model).await {
        Ok(()) => print_system("Model ready!"),
        Err(e) => print_error(&e.to_string()),
    }
}

/// Send a message and stream the response to the terminal
///
/// Ctrl-C while streaming requests cooperative cancellation; the loop keeps
/// draining events until the worker's terminal outcome arrives.
async fn send_and_stream(controller: &mut ChatController, text: &str) -> Result<()> {
    let mut rx = match controller.send(text) {
        Ok(rx) => rx,
        Err(e) => {
            // Rejections leave state unchanged; a missing model gets a hint.
            if e.downcast_ref::<TangerineError>()
                .map(|e| matches!(e, TangerineError::ModelNotLoaded))
                .unwrap_or(false)
            {
                print_error("No model is loaded. Use /model <ref> first.");
                return Ok(());
            }
            return Err(e);
        }
    };

    print!("{} ", "AI:".cyan().bold());
    std::io::stdout().flush().ok();

    let outcome = consume_events(controller, &mut rx).await;
    println!();

    if matches!(outcome, GenerationOutcome::Cancelled { .. }) {
        print_system("Generation stopped.");
    }

    controller.finish(&outcome)?;

    if let Some(error) = outcome.error() {
        print_error(error);
    }
    Ok(())
}

/// Drain the event channel, printing tokens and watching for Ctrl-C
async fn consume_events(
    controller: &ChatController,
    rx: &mut mpsc::UnboundedReceiver<GenerationEvent>,
) -> GenerationOutcome {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(GenerationEvent::Token(token)) => {
                    print!("{}", token);
                    std::io::stdout().flush().ok();
                }
                Some(GenerationEvent::Finished(outcome)) => return outcome,
                None => {
                    return GenerationOutcome::Failed {
                        error: "generation task ended unexpectedly".to_string(),
                        text: String::new(),
                    };
                }
            },
            _ = tokio::signal::ctrl_c() => {
                controller.request_stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse_slash_command("hello there"), SlashCommand::None);
    }

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!(parse_slash_command("/new"), SlashCommand::New);
        assert_eq!(parse_slash_command("/sessions"), SlashCommand::Sessions);
        assert_eq!(parse_slash_command("/params"), SlashCommand::Params);
        assert_eq!(parse_slash_command("/help"), SlashCommand::Help);
        assert_eq!(parse_slash_command("/exit"), SlashCommand::Exit);
        assert_eq!(parse_slash_command("/quit"), SlashCommand::Exit);
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            parse_slash_command("/open 1700000000_hello"),
            SlashCommand::Open("1700000000_hello".to_string())
        );
        assert_eq!(
            parse_slash_command("/model llama3.2:latest"),
            SlashCommand::Model("llama3.2:latest".to_string())
        );
        assert_eq!(
            parse_slash_command("/export ~/chat backup"),
            SlashCommand::Export("~/chat backup".to_string())
        );
    }

    #[test]
    fn test_system_with_and_without_argument() {
        assert_eq!(parse_slash_command("/system"), SlashCommand::System(None));
        assert_eq!(
            parse_slash_command("/system Talk like a pirate."),
            SlashCommand::System(Some("Talk like a pirate.".to_string()))
        );
    }

    #[test]
    fn test_command_requiring_argument_falls_back_to_help() {
        assert_eq!(parse_slash_command("/open"), SlashCommand::Help);
        assert_eq!(parse_slash_command("/model"), SlashCommand::Help);
    }

    #[test]
    fn test_unknown_command_shows_help() {
        assert_eq!(parse_slash_command("/bogus"), SlashCommand::Help);
    }
}
