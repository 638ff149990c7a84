//! Flat-file session storage
//!
//! Each session is one pretty-printed JSON document in the sessions
//! directory, named `{unix_timestamp}_{slug}.json`. The store is stateless
//! between operations: every call touches the filesystem directly and no
//! in-memory cache is kept.

use crate::error::{Result, TangerineError};
use crate::session::{Conversation, Turn, DEFAULT_SYSTEM_PROMPT};
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the sessions directory
///
/// This makes it easy to point the binary at a scratch directory for tests
/// without touching the user's data directory.
pub const CHATS_DIR_ENV: &str = "TANGERINE_CHATS_DIR";

/// Version tag written into every session document
const SESSION_FORMAT_VERSION: u32 = 1;

/// Maximum length (in characters) of the slug embedded in a session id
const SLUG_MAX_CHARS: usize = 40;

/// On-disk session document
///
/// The same schema is used for stored sessions and for user-requested
/// exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionDocument {
    version: u32,
    #[serde(default)]
    title: String,
    #[serde(default = "default_system_prompt")]
    system: String,
    #[serde(default)]
    messages: Vec<Turn>,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl SessionDocument {
    fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            version: SESSION_FORMAT_VERSION,
            title: conversation.title(),
            system: conversation.system_prompt().to_string(),
            messages: conversation.turns().to_vec(),
        }
    }

    fn into_conversation(self) -> Conversation {
        Conversation::from_parts(self.system, self.messages)
    }
}

/// Metadata for one stored session, as shown in session listings
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Session id (the file stem)
    pub id: String,
    /// Human-readable title derived from the filename
    pub title: String,
    /// Last-modified time of the session file
    pub modified: DateTime<Utc>,
    /// Number of messages in the session
    pub message_count: usize,
}

/// Storage backend for chat sessions
///
/// All operations resolve paths under a single sessions directory; ids are
/// file stems.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at the given directory
    ///
    /// The directory is created if it does not exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use tangerine::session::SessionStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SessionStore::new(dir.path()).unwrap();
    /// assert!(store.dir().exists());
    /// ```
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create sessions directory {}", dir.display()))
            .map_err(|e| TangerineError::Storage(e.to_string()))?;
        Ok(Self { dir })
    }

    /// Create a store at the default platform location
    ///
    /// Honors the `TANGERINE_CHATS_DIR` environment variable; otherwise uses
    /// `chats/` under the platform data directory.
    pub fn open_default() -> Result<Self> {
        if let Ok(override_dir) = std::env::var(CHATS_DIR_ENV) {
            return Self::new(override_dir);
        }

        let proj_dirs = ProjectDirs::from("com", "tangerine", "tangerine")
            .ok_or_else(|| TangerineError::Storage("Could not determine data directory".into()))?;

        Self::new(proj_dirs.data_dir().join("chats"))
    }

    /// The directory this store reads and writes
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// List stored sessions, most recently modified first
    ///
    /// Non-JSON files in the directory are skipped. A session file that
    /// fails to parse still appears in the listing with a message count of
    /// zero, so a single corrupt file cannot hide the rest of the history.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read sessions directory {}", self.dir.display()))
            .map_err(|e| TangerineError::Storage(e.to_string()))?;

        let mut summaries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TangerineError::Storage(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            let message_count = std::fs::read_to_string(&path)
                .ok()
                .and_then(|contents| serde_json::from_str::<SessionDocument>(&contents).ok())
                .map(|doc| doc.messages.len())
                .unwrap_or(0);

            summaries.push(SessionSummary {
                id: stem.to_string(),
                title: display_title(stem),
                modified,
                message_count,
            });
        }

        summaries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(summaries)
    }

    /// Load a session by id
    ///
    /// # Errors
    ///
    /// Returns [`TangerineError::SessionNotFound`] when no session file
    /// exists for the id, and [`TangerineError::Storage`] for read or parse
    /// failures.
    pub fn load(&self, id: &str) -> Result<Conversation> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(TangerineError::SessionNotFound(id.to_string()).into());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session {}", path.display()))
            .map_err(|e| TangerineError::Storage(e.to_string()))?;

        let document: SessionDocument = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session {}", path.display()))
            .map_err(|e| TangerineError::Storage(e.to_string()))?;

        Ok(document.into_conversation())
    }

    /// Save a conversation, assigning a stable id on first save
    ///
    /// A conversation with no turns is not written; the existing id (if
    /// any) is passed back unchanged. On first save the id is derived from
    /// the current timestamp and a slug of the title, and reused for every
    /// subsequent save of the same session.
    ///
    /// # Arguments
    ///
    /// * `conversation` - The conversation to persist
    /// * `existing_id` - Id assigned by a previous save, if any
    ///
    /// # Returns
    ///
    /// The id the session is stored under, or `None` when nothing was
    /// written and no id existed.
    pub fn save(
        &self,
        conversation: &Conversation,
        existing_id: Option<&str>,
    ) -> Result<Option<String>> {
        if conversation.is_empty() {
            return Ok(existing_id.map(String::from));
        }

        let id = match existing_id {
            Some(id) => id.to_string(),
            None => derive_session_id(&conversation.title(), Utc::now().timestamp()),
        };

        let path = self.path_for(&id);
        let document = SessionDocument::from_conversation(conversation);
        let contents = serde_json::to_string_pretty(&document)
            .context("Failed to serialize session")
            .map_err(|e| TangerineError::Storage(e.to_string()))?;

        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write session {}", path.display()))
            .map_err(|e| TangerineError::Storage(e.to_string()))?;

        tracing::debug!("Saved session {} ({} turns)", id, conversation.len());
        Ok(Some(id))
    }

    /// Delete a session by id
    ///
    /// Deleting an id with no session file is a no-op, not an error.
    pub fn delete(&self, id: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => {
                tracing::debug!("Deleted session {}", id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TangerineError::Storage(format!(
                "Failed to delete session {}: {}",
                id, e
            ))
            .into()),
        }
    }

    /// Export a conversation to an arbitrary path
    ///
    /// Uses the same document schema as stored sessions. A `.json`
    /// extension is appended when the path does not already end in one.
    ///
    /// # Returns
    ///
    /// The path actually written.
    pub fn export<P: Into<PathBuf>>(&self, conversation: &Conversation, path: P) -> Result<PathBuf> {
        let mut path = path.into();
        let has_json_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if !has_json_ext {
            let mut name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_default();
            name.push(".json");
            path.set_file_name(name);
        }

        let document = SessionDocument::from_conversation(conversation);
        let contents = serde_json::to_string_pretty(&document)
            .context("Failed to serialize export")
            .map_err(|e| TangerineError::Storage(e.to_string()))?;

        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write export {}", path.display()))
            .map_err(|e| TangerineError::Storage(e.to_string()))?;

        Ok(path)
    }
}

/// Derive a session id from a title and a creation timestamp
///
/// The slug replaces spaces and path separators with underscores and is
/// capped at 40 characters.
fn derive_session_id(title: &str, timestamp: i64) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c == ' ' || c == '/' { '_' } else { c })
        .take(SLUG_MAX_CHARS)
        .collect();
    format!("{}_{}", timestamp, slug)
}

/// Derive the display title from a session file stem
///
/// The stem's leading timestamp segment is dropped and underscores become
/// spaces.
fn display_title(stem: &str) -> String {
    let after_ts = match stem.split_once('_') {
        Some((_, rest)) => rest,
        None => stem,
    };
    after_ts.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Sender;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    fn sample_conversation() -> Conversation {
        let mut conversation = Conversation::new();
        conversation.append_turn(Sender::User, "Hello there");
        conversation.append_turn(Sender::Assistant, "Hi! How can I help?");
        conversation
    }

    #[test]
    fn test_new_creates_directory() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("deep").join("chats");
        let store = SessionStore::new(&nested).expect("store");
        assert!(store.dir().exists());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let mut conversation = sample_conversation();
        conversation.set_system_prompt("Answer briefly.");

        let id = store
            .save(&conversation, None)
            .expect("save failed")
            .expect("id assigned");

        let loaded = store.load(&id).expect("load failed");
        assert_eq!(loaded.system_prompt(), "Answer briefly.");
        assert_eq!(loaded.turns(), conversation.turns());
    }

    #[test]
    fn test_save_empty_conversation_writes_nothing() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let result = store.save(&Conversation::new(), None).expect("save failed");
        assert!(result.is_none());
        assert!(store.list().expect("list failed").is_empty());
    }

    #[test]
    fn test_save_reuses_existing_id() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let mut conversation = sample_conversation();
        let id = store
            .save(&conversation, None)
            .expect("save failed")
            .expect("id assigned");

        conversation.append_turn(Sender::User, "Another question");
        let id2 = store
            .save(&conversation, Some(&id))
            .expect("resave failed")
            .expect("id kept");

        assert_eq!(id, id2);
        let sessions = store.list().expect("list failed");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].message_count, 3);
    }

    #[test]
    fn test_load_missing_session_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let err = store.load("1700000000_absent").unwrap_err();
        match err.downcast_ref::<TangerineError>() {
            Some(TangerineError::SessionNotFound(id)) => {
                assert_eq!(id, "1700000000_absent");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let id = store
            .save(&sample_conversation(), None)
            .expect("save failed")
            .expect("id assigned");

        store.delete(&id).expect("first delete failed");
        store.delete(&id).expect("second delete failed");
        store.delete("never_existed").expect("absent delete failed");
    }

    #[test]
    fn test_list_orders_by_modified_descending() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let mut first = Conversation::new();
        first.append_turn(Sender::User, "first session");
        let first_id = store.save(&first, None).unwrap().unwrap();

        sleep(Duration::from_millis(20));

        let mut second = Conversation::new();
        second.append_turn(Sender::User, "second session");
        let second_id = store.save(&second, None).unwrap().unwrap();

        let sessions = store.list().expect("list failed");
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, second_id);
        assert_eq!(sessions[1].id, first_id);
    }

    #[test]
    fn test_list_skips_non_json_files() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");
        std::fs::write(dir.path().join("notes.txt"), "not a session").expect("write");

        assert!(store.list().expect("list failed").is_empty());
    }

    #[test]
    fn test_list_keeps_corrupt_file_with_zero_count() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");
        std::fs::write(dir.path().join("1700000000_broken.json"), "{oops").expect("write");

        let sessions = store.list().expect("list failed");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].message_count, 0);
    }

    #[test]
    fn test_loads_document_written_by_original_app() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        // Byte-for-byte shape of a legacy session document.
        let legacy = r#"{
  "version": 1,
  "title": "Hello there",
  "system": "You are a helpful assistant.",
  "messages": [
    { "sender": "You", "message": "Hello there" },
    { "sender": "AI", "message": "Hi! How can I help?" }
  ]
}"#;
        std::fs::write(dir.path().join("1700000000_Hello_there.json"), legacy).expect("write");

        let loaded = store.load("1700000000_Hello_there").expect("load failed");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.turns()[0].sender, Sender::User);
        assert_eq!(loaded.turns()[1].sender, Sender::Assistant);
    }

    #[test]
    fn test_load_defaults_missing_system_prompt() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let partial = r#"{ "version": 1, "title": "t", "messages": [] }"#;
        std::fs::write(dir.path().join("1_t.json"), partial).expect("write");

        let loaded = store.load("1_t").expect("load failed");
        assert_eq!(loaded.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_export_appends_json_extension() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let target = dir.path().join("backup");
        let written = store
            .export(&sample_conversation(), &target)
            .expect("export failed");

        assert_eq!(written, dir.path().join("backup.json"));
        assert!(written.exists());
    }

    #[test]
    fn test_export_keeps_existing_extension() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let target = dir.path().join("backup.JSON");
        let written = store
            .export(&sample_conversation(), &target)
            .expect("export failed");
        assert_eq!(written, target);
    }

    #[test]
    fn test_export_document_matches_session_schema() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path()).expect("store");

        let written = store
            .export(&sample_conversation(), dir.path().join("out.json"))
            .expect("export failed");

        let contents = std::fs::read_to_string(written).expect("read");
        let value: serde_json::Value = serde_json::from_str(&contents).expect("parse");
        assert_eq!(value["version"], 1);
        assert_eq!(value["title"], "Hello there");
        assert_eq!(value["messages"][0]["sender"], "You");
        assert_eq!(value["messages"][1]["sender"], "AI");
    }

    #[test]
    fn test_derive_session_id_slugs_title() {
        let id = derive_session_id("notes on rust/async", 1700000000);
        assert_eq!(id, "1700000000_notes_on_rust_async");
    }

    #[test]
    fn test_derive_session_id_caps_slug_length() {
        let id = derive_session_id(&"a".repeat(100), 1700000000);
        assert_eq!(id.len(), "1700000000_".len() + 40);
    }

    #[test]
    fn test_display_title_drops_timestamp_segment() {
        assert_eq!(display_title("1700000000_Hello_there"), "Hello there");
        assert_eq!(display_title("untimestamped"), "untimestamped");
    }
}
