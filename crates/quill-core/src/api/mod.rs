//! Remote note service interface and reqwest client

mod client;
mod error;

use std::future::Future;

pub use client::NotesApiClient;
pub use error::{user_message, ApiError, ApiErrorBody, ApiErrorDetail, ApiResult};

use crate::models::{Note, NotesPage};

/// Optional filters for the remote search endpoint.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub updated_gte: Option<String>,
    pub updated_lte: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Paginated CRUD over the remote note service.
///
/// Authentication (bearer token supply and refresh) is an external concern;
/// implementations receive a token and 401 handling stays with the caller's
/// token manager.
pub trait NoteApi: Send + Sync {
    /// Fetch one page of the note listing.
    fn list_notes(
        &self,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> impl Future<Output = ApiResult<NotesPage>> + Send;

    /// Fetch one page of notes matching the filter.
    fn filter_notes(&self, filter: NoteFilter) -> impl Future<Output = ApiResult<NotesPage>> + Send;

    /// Create a note; the server assigns the id.
    fn create_note(
        &self,
        title: &str,
        description: &str,
    ) -> impl Future<Output = ApiResult<Note>> + Send;

    /// Fetch a single note by id.
    fn get_note(&self, id: i64) -> impl Future<Output = ApiResult<Note>> + Send;

    /// Replace a note's title and description.
    fn update_note(
        &self,
        id: i64,
        title: &str,
        description: &str,
    ) -> impl Future<Output = ApiResult<Note>> + Send;

    /// Delete a note; success has an empty body.
    fn delete_note(&self, id: i64) -> impl Future<Output = ApiResult<()>> + Send;
}
