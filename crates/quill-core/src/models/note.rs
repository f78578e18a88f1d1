//! Note model and paginated listing shape

use serde::{Deserialize, Serialize};

/// Sentinel `updated_at` for offline-created notes so they sort first in any
/// updated-descending view until the server assigns real timestamps.
pub const FAR_FUTURE_UPDATED_AT: &str = "9999-12-31T23:59:59";

/// A note as exchanged with the remote service.
///
/// `id` is either server-assigned or a client-generated provisional value
/// (current Unix time in seconds) for notes created while offline.
/// Timestamps are ISO-8601-ish strings as the remote sends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub creator_username: String,
}

impl Note {
    /// Synthesize a provisional note for an offline create.
    ///
    /// The id has seconds resolution: two offline creates within the same
    /// second collide. Known limitation carried from the id scheme.
    #[must_use]
    pub fn provisional(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: crate::util::unix_timestamp_now(),
            title: title.into(),
            description: description.into(),
            created_at: String::new(),
            updated_at: FAR_FUTURE_UPDATED_AT.to_string(),
            creator_name: String::new(),
            creator_username: String::new(),
        }
    }
}

/// One page of the remote note listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesPage {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Note>,
}

/// A note as stored in the local cache, with sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedNote {
    #[serde(flatten)]
    pub note: Note,
    /// Has unsynced local changes
    pub dirty: bool,
    /// Tombstoned locally, pending remote delete
    pub deleted: bool,
    /// Original client-side id when this record started life offline
    pub provisional_id: Option<i64>,
}

impl CachedNote {
    /// Wrap a server-confirmed note (no unsynced state).
    #[must_use]
    pub fn clean(note: Note) -> Self {
        Self {
            note,
            dirty: false,
            deleted: false,
            provisional_id: None,
        }
    }

    /// Wrap a note carrying unsynced local changes.
    #[must_use]
    pub fn dirty(note: Note) -> Self {
        Self {
            note,
            dirty: true,
            deleted: false,
            provisional_id: None,
        }
    }
}
