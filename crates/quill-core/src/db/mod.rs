//! Database layer for Quill

mod action_queue;
mod connection;
mod migrations;
mod note_store;

pub use action_queue::PendingActionQueue;
pub use connection::Database;
pub use note_store::LocalNoteStore;
