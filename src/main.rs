//! Tangerine - Terminal chat for local models
//!
#![doc = "Tangerine - Terminal chat for local models"]
#![doc = "Main entry point for the Tangerine chat client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tangerine::cli::{Cli, Commands, SessionCommand};
use tangerine::commands;
use tangerine::commands::chat::ChatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // If the user supplied a sessions directory on the CLI (or via env),
    // mirror it into TANGERINE_CHATS_DIR so the store initializer can pick
    // it up. This keeps callers unchanged while allowing
    // `SessionStore::open_default()` to honor an override.
    if let Some(chats_dir) = &cli.chats_dir {
        std::env::set_var(
            tangerine::session::store::CHATS_DIR_ENV,
            chats_dir.as_os_str(),
        );
        tracing::info!(
            "Using sessions directory override from CLI: {}",
            chats_dir.display()
        );
    }

    // Execute command
    match cli.command {
        Commands::Chat {
            model,
            resume,
            host,
            max_tokens,
            temperature,
        } => {
            tracing::info!("Starting interactive chat");
            if let Some(m) = &model {
                tracing::debug!("Loading model at startup: {}", m);
            }
            if let Some(r) = &resume {
                tracing::debug!("Resuming session: {}", r);
            }

            commands::chat::run_chat(ChatOptions {
                model,
                resume,
                host,
                max_tokens,
                temperature,
            })
            .await?;
            Ok(())
        }
        Commands::Sessions { command } => match command {
            SessionCommand::List => {
                commands::sessions::list_sessions()?;
                Ok(())
            }
            SessionCommand::Delete { id } => {
                commands::sessions::delete_session(&id)?;
                Ok(())
            }
            SessionCommand::Export { id, path } => {
                commands::sessions::export_session(&id, path)?;
                Ok(())
            }
        },
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "tangerine=debug"
    } else {
        "tangerine=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
