//! Last-write-wins note sync between a local store and an R2/S3 bucket.
//!
//! - [`Note`] / [`NoteEnvelope`]: the synchronized record and its remote form
//! - [`LocalNoteStore`]: local persistence seam, with [`MemoryNoteStore`]
//! - [`conflict`]: the LWW rule
//! - [`SyncEngine`]: full cycles, single-note upload, delete propagation

pub mod conflict;
pub mod engine;
pub mod error;
pub mod note;
pub mod store;

pub use conflict::{Resolution, resolve, should_apply_remote};
pub use engine::{SyncEngine, SyncOptions, SyncReport};
pub use error::{SyncError, SyncResult};
pub use note::{NOTES_PREFIX, Note, NoteEnvelope, note_id_from_key, note_key};
pub use store::{LocalNoteStore, MemoryNoteStore};
