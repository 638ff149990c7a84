//! Session management commands
//!
//! Non-interactive access to the session store: listing, deletion, and
//! export without entering the chat loop.

use crate::error::Result;
use crate::session::SessionStore;
use colored::Colorize;
use prettytable::{format, Table};
use std::path::PathBuf;

/// List stored sessions, most recent first
pub fn list_sessions() -> Result<()> {
    let store = SessionStore::open_default()?;
    let sessions = store.list()?;

    if sessions.is_empty() {
        println!("{}", "No chat sessions found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Last Updated".bold()
    ]);

    for session in sessions {
        let title = if session.title.chars().count() > 40 {
            let head: String = session.title.chars().take(37).collect();
            format!("{}...", head)
        } else {
            session.title
        };
        let updated = session.modified.format("%Y-%m-%d %H:%M").to_string();

        table.add_row(prettytable::row![
            session.id.cyan(),
            title,
            session.message_count,
            updated
        ]);
    }

    println!("\nChat Sessions:");
    table.printstd();
    println!();
    println!(
        "Use {} to resume a session.",
        "tangerine chat --resume <ID>".cyan()
    );
    println!();

    Ok(())
}

/// Delete a session by id
///
/// Deleting an absent id succeeds quietly; the store's delete is
/// idempotent.
pub fn delete_session(id: &str) -> Result<()> {
    let store = SessionStore::open_default()?;
    store.delete(id)?;
    println!("{}", format!("Deleted session {}", id).green());
    Ok(())
}

/// Export a session to a JSON file
pub fn export_session(id: &str, path: PathBuf) -> Result<()> {
    let store = SessionStore::open_default()?;
    let conversation = store.load(id)?;
    let written = store.export(&conversation, path)?;
    println!(
        "{}",
        format!("Exported session {} to {}", id, written.display()).green()
    );
    Ok(())
}
