//! Thread persistence.
//!
//! One JSON file per thread holding the message log. The store is
//! append-only from the turn loop's point of view: completed turns are
//! appended after the terminal state, abandoned turns are never written.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::state::Message;
use super::types::ThreadId;
use crate::error::{Error, Result};

/// On-disk shape of a thread file
#[derive(Debug, Serialize, Deserialize)]
struct SavedThread {
    thread_id: ThreadId,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    messages: Vec<Message>,
}

pub struct ThreadStore {
    dir: PathBuf,
}

impl ThreadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, thread_id: &str) -> PathBuf {
        // Thread ids come from callers; keep only the filename-safe part
        let safe: String = thread_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    /// Append completed-turn messages to the thread's log
    pub fn append(&self, thread_id: &str, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(thread_id);
        let now = chrono::Utc::now();

        let mut saved = match read_thread(&path)? {
            Some(saved) => saved,
            None => SavedThread {
                thread_id: thread_id.to_string(),
                created_at: now,
                updated_at: now,
                messages: Vec::new(),
            },
        };

        saved.messages.extend_from_slice(messages);
        saved.updated_at = now;

        let json = serde_json::to_string_pretty(&saved)?;
        fs::write(&path, json)?;
        debug!(thread = %thread_id, appended = messages.len(), total = saved.messages.len(), "Thread persisted");
        Ok(())
    }

    /// Load a thread's message log; missing thread is an empty log
    pub fn load(&self, thread_id: &str) -> Result<Vec<Message>> {
        match read_thread(&self.path_for(thread_id))? {
            Some(saved) => Ok(saved.messages),
            None => Ok(Vec::new()),
        }
    }

    /// List persisted thread ids, most recently updated first
    pub fn list(&self) -> Result<Vec<ThreadId>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut threads: Vec<(chrono::DateTime<chrono::Utc>, ThreadId)> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_thread(&path) {
                Ok(Some(saved)) => threads.push((saved.updated_at, saved.thread_id)),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable thread file"),
            }
        }

        threads.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(threads.into_iter().map(|(_, id)| id).collect())
    }

    /// Delete a persisted thread
    pub fn delete(&self, thread_id: &str) -> Result<()> {
        let path = self.path_for(thread_id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

fn read_thread(path: &Path) -> Result<Option<SavedThread>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)?;
    let saved = serde_json::from_str(&json).map_err(Error::Serialization)?;
    Ok(Some(saved))
}
