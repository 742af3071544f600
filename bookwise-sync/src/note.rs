//! Note record and its remote envelope.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key prefix shared by every remote note object.
pub const NOTES_PREFIX: &str = "notes/";

/// Suffix of every remote note object key.
pub const NOTE_KEY_SUFFIX: &str = ".json";

/// Content type of uploaded envelopes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A synchronized reading note. Timestamps are epoch milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default, rename = "eBookId")]
    pub ebook_id: String,
    #[serde(default, rename = "eBookName")]
    pub ebook_name: String,
    /// Note body.
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub chapter_name: String,
    /// Serialized selection anchors.
    #[serde(default)]
    pub dom_source: String,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub update_time: i64,
    #[serde(default)]
    pub tag: String,
    /// Tombstone time; `None` while the note is live.
    #[serde(default)]
    pub is_delete: Option<i64>,
}

impl Note {
    /// Creates an empty live note with a fresh v4 id.
    pub fn new(now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            create_time: now_ms,
            update_time: now_ms,
            ..Default::default()
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.is_delete.is_some()
    }

    /// Marks the note deleted at `now_ms`.
    pub fn tombstone(&mut self, now_ms: i64) {
        self.is_delete = Some(now_ms);
        self.update_time = now_ms;
    }

    /// Remote object key for this note.
    pub fn key(&self) -> String {
        note_key(&self.id)
    }
}

/// `notes/<id>.json`
pub fn note_key(id: &str) -> String {
    format!("{NOTES_PREFIX}{id}{NOTE_KEY_SUFFIX}")
}

/// Inverse of [`note_key`]. `None` for keys outside the note layout.
pub fn note_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(NOTES_PREFIX)?
        .strip_suffix(NOTE_KEY_SUFFIX)
        .filter(|id| !id.is_empty())
}

/// Remote object payload: `{note, assets}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteEnvelope {
    pub note: Note,
    /// Reserved for attachment references. Always empty.
    #[serde(default)]
    pub assets: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    note: &'a Note,
    assets: &'a [serde_json::Value],
}

impl NoteEnvelope {
    /// Serializes `note` exactly as given. Identical notes give identical bytes.
    pub fn encode(note: &Note) -> SyncResult<String> {
        Ok(serde_json::to_string(&EnvelopeRef { note, assets: &[] })?)
    }

    pub fn decode(body: &str) -> SyncResult<Self> {
        serde_json::from_str(body).map_err(|e| SyncError::Parse(e.to_string()))
    }
}
