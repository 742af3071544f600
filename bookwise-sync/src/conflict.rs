//! Last-write-wins conflict resolution.

use crate::note::Note;

/// Local effect of reconciling one remote note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Local copy is newer or equal; leave it.
    KeepLocal,
    /// Store the remote note as-is.
    Upsert,
    /// Remote is a newer tombstone; remove the local copy.
    Remove,
}

/// Remote wins when there is no local copy, or when its `update_time` is
/// strictly greater. Ties keep local. Tombstones follow the same rule.
pub fn should_apply_remote(local: Option<&Note>, remote: &Note) -> bool {
    match local {
        None => true,
        Some(local) => remote.update_time > local.update_time,
    }
}

pub fn resolve(local: Option<&Note>, remote: &Note) -> Resolution {
    if !should_apply_remote(local, remote) {
        Resolution::KeepLocal
    } else if remote.is_deleted() {
        Resolution::Remove
    } else {
        Resolution::Upsert
    }
}
