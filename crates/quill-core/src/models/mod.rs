//! Data models for quill-core

mod note;
mod pending_action;

pub use note::{CachedNote, Note, NotesPage, FAR_FUTURE_UPDATED_AT};
pub use pending_action::{ActionKind, PendingAction};
