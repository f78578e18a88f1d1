//! Pending mutation log entries for offline-first sync

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Note;

/// Kind of queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl ActionKind {
    /// Stable string form stored in the queue table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown action kind: {other}"))),
        }
    }
}

/// One not-yet-acknowledged mutation, delivered at least once.
///
/// Appended by the repository when an online operation fails, consumed in
/// FIFO order by the sync manager, removed only after the remote call
/// succeeds or the action is judged permanently inapplicable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    /// Queue row id (0 until persisted)
    pub id: i64,
    /// Target note id; tracks the provisional id until remap
    pub note_id: Option<i64>,
    pub kind: ActionKind,
    /// Serialized note snapshot for create/update, absent for delete
    pub payload: Option<String>,
    /// Enqueue timestamp (Unix ms), the FIFO ordering key
    pub enqueued_at: i64,
}

impl PendingAction {
    /// Queue a create carrying the provisional note snapshot.
    pub fn create(note: &Note) -> Result<Self> {
        Ok(Self {
            id: 0,
            note_id: Some(note.id),
            kind: ActionKind::Create,
            payload: Some(serde_json::to_string(note)?),
            enqueued_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Queue an update carrying the edited note snapshot.
    pub fn update(note: &Note) -> Result<Self> {
        Ok(Self {
            id: 0,
            note_id: Some(note.id),
            kind: ActionKind::Update,
            payload: Some(serde_json::to_string(note)?),
            enqueued_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Queue a delete for the given note id.
    #[must_use]
    pub fn delete(note_id: i64) -> Self {
        Self {
            id: 0,
            note_id: Some(note_id),
            kind: ActionKind::Delete,
            payload: None,
            enqueued_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Deserialize the note snapshot, if any.
    pub fn payload_note(&self) -> Result<Option<Note>> {
        match &self.payload {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    /// Point this action at a new note id after a provisional id remap.
    ///
    /// Rewrites both the `note_id` column and the id embedded in the payload
    /// snapshot so a retargeted update still hits the server-assigned record.
    pub fn retarget(&mut self, old_id: i64, new_id: i64) -> Result<()> {
        if self.note_id == Some(old_id) {
            self.note_id = Some(new_id);
        }
        if let Some(json) = &self.payload {
            let mut note: Note = serde_json::from_str(json)?;
            if note.id == old_id {
                note.id = new_id;
                self.payload = Some(serde_json::to_string(&note)?);
            }
        }
        Ok(())
    }
}
