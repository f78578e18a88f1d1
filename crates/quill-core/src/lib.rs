//! quill-core - Core library for Quill
//!
//! This crate contains the shared models, local cache, remote client, and
//! offline-first sync engine used by all Quill interfaces.

pub mod api;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod repository;
pub mod sync;
pub mod util;

pub use connectivity::ConnectivityMonitor;
pub use error::{Error, Result};
pub use events::{NoteEvent, NoteEventBus};
pub use models::{CachedNote, Note, NotesPage};
pub use repository::NoteRepository;
pub use sync::{SyncHandle, SyncManager};
