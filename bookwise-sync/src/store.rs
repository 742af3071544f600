//! Local note storage seam.

use crate::error::SyncResult;
use crate::note::Note;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keyed local note store the engine reconciles against.
///
/// Implementations report their own failures as
/// [`SyncError::LocalStore`](crate::SyncError::LocalStore).
#[async_trait]
pub trait LocalNoteStore: Send + Sync {
    async fn get(&self, id: &str) -> SyncResult<Option<Note>>;

    /// Inserts or replaces the note with the same id.
    async fn put(&self, note: &Note) -> SyncResult<()>;

    /// Physically removes a note. Removing an unknown id is not an error.
    async fn delete(&self, id: &str) -> SyncResult<()>;

    /// Notes with `update_time` strictly greater than `timestamp_ms`,
    /// tombstones included.
    async fn query_newer_than(&self, timestamp_ms: i64) -> SyncResult<Vec<Note>>;
}

// ── MemoryNoteStore ─────────────────────────────────────────────

/// In-memory [`LocalNoteStore`].
#[derive(Default)]
pub struct MemoryNoteStore {
    notes: RwLock<HashMap<String, Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        Self {
            notes: RwLock::new(notes.into_iter().map(|n| (n.id.clone(), n)).collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.notes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notes.read().await.is_empty()
    }

    /// All notes ordered by id.
    pub async fn snapshot(&self) -> Vec<Note> {
        let mut all: Vec<Note> = self.notes.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

#[async_trait]
impl LocalNoteStore for MemoryNoteStore {
    async fn get(&self, id: &str) -> SyncResult<Option<Note>> {
        Ok(self.notes.read().await.get(id).cloned())
    }

    async fn put(&self, note: &Note) -> SyncResult<()> {
        self.notes
            .write()
            .await
            .insert(note.id.clone(), note.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> SyncResult<()> {
        self.notes.write().await.remove(id);
        Ok(())
    }

    async fn query_newer_than(&self, timestamp_ms: i64) -> SyncResult<Vec<Note>> {
        let mut newer: Vec<Note> = self
            .notes
            .read()
            .await
            .values()
            .filter(|n| n.update_time > timestamp_ms)
            .cloned()
            .collect();
        newer.sort_by_key(|n| n.update_time);
        Ok(newer)
    }
}
