//! Remote-first note operations with offline fallbacks
//!
//! Every operation tries the remote service first. When the service is
//! unreachable the operation degrades to the local cache and, for mutations,
//! records a pending action so the next sync pass replays it.

use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{ApiError, NoteApi, NoteFilter};
use crate::db::LocalNoteStore;
use crate::error::{Error, Result};
use crate::events::{NoteEvent, NoteEventBus};
use crate::models::{CachedNote, Note, NotesPage};
use crate::sync::SyncHandle;
use crate::util::normalize_text_option;

/// Marker URLs for locally-paginated fallback listings. Consumers treat any
/// non-null `next`/`previous` as "another page exists".
const OFFLINE_NEXT: &str = "offline://next";
const OFFLINE_PREVIOUS: &str = "offline://previous";

/// Front door for note reads and writes.
pub struct NoteRepository<A> {
    api: Arc<A>,
    store: LocalNoteStore,
    sync: SyncHandle,
    events: NoteEventBus,
}

impl<A> Clone for NoteRepository<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            store: self.store.clone(),
            sync: self.sync.clone(),
            events: self.events.clone(),
        }
    }
}

impl<A: NoteApi> NoteRepository<A> {
    #[must_use]
    pub fn new(api: Arc<A>, store: LocalNoteStore, sync: SyncHandle, events: NoteEventBus) -> Self {
        Self {
            api,
            store,
            sync,
            events,
        }
    }

    /// Subscribe to note mutation events published by this repository.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<NoteEvent> {
        self.events.subscribe()
    }

    /// Live view of the cached listing, newest first.
    #[must_use]
    pub fn observe(&self) -> tokio::sync::watch::Receiver<Vec<CachedNote>> {
        self.store.observe()
    }

    /// Fetch one listing page, remote first.
    ///
    /// A reachable service refreshes the cache and the page is returned
    /// verbatim. Otherwise the cached listing is sliced into an equivalent
    /// page; an empty cache while offline is an error.
    pub async fn list(&self, page: u32, page_size: u32) -> Result<NotesPage> {
        match self.api.list_notes(Some(page), Some(page_size)).await {
            Ok(remote) => {
                let records: Vec<CachedNote> = remote
                    .results
                    .iter()
                    .cloned()
                    .map(CachedNote::clean)
                    .collect();
                self.store.upsert_all(&records).await?;
                Ok(remote)
            }
            Err(error) => {
                tracing::debug!("listing from cache, remote unavailable: {error}");
                self.local_page(page, page_size).await
            }
        }
    }

    /// Search notes by substring, matching either title or description.
    ///
    /// The remote filter endpoint matches one field per call, so this runs a
    /// title query and a description query and unions the results by id,
    /// title matches first. One failed leg degrades to the other; when both
    /// fail the title leg's error is returned. Search has no offline
    /// fallback.
    pub async fn search(
        &self,
        query: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<NotesPage> {
        let Some(query) = normalize_text_option(Some(query.to_string())) else {
            return Err(Error::InvalidInput("Empty search query".to_string()));
        };

        let by_title = self
            .api
            .filter_notes(NoteFilter {
                title: Some(query.clone()),
                page,
                page_size,
                ..NoteFilter::default()
            })
            .await;
        let by_description = self
            .api
            .filter_notes(NoteFilter {
                description: Some(query),
                page,
                page_size,
                ..NoteFilter::default()
            })
            .await;

        let (by_title, by_description) = match (by_title, by_description) {
            (Err(title_error), Err(_)) => return Err(title_error.into()),
            pages => pages,
        };

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        let mut next = None;
        let mut previous = None;
        for page in [by_title.ok(), by_description.ok()].into_iter().flatten() {
            if next.is_none() {
                next = page.next;
            }
            if previous.is_none() {
                previous = page.previous;
            }
            for note in page.results {
                if seen.insert(note.id) {
                    results.push(note);
                }
            }
        }

        Ok(NotesPage {
            count: results.len() as i64,
            next,
            previous,
            results,
        })
    }

    /// Fetch a single note, remote first, falling back to the cache.
    pub async fn get(&self, id: i64) -> Result<Note> {
        match self.api.get_note(id).await {
            Ok(note) => {
                self.store.upsert(&CachedNote::clean(note.clone())).await?;
                Ok(note)
            }
            Err(error) => {
                tracing::debug!("reading note {id} from cache: {error}");
                match self.store.get_by_id(id).await? {
                    Some(record) if !record.deleted => Ok(record.note),
                    _ => Err(Error::NotFound(id)),
                }
            }
        }
    }

    /// Create a note.
    ///
    /// When the service is unreachable a provisional note is cached dirty
    /// and a create is queued; the next sync pass trades the provisional id
    /// for the server-assigned one. Rejections from a reachable service
    /// (validation, auth) are returned as-is, not queued.
    pub async fn create(&self, title: &str, description: &str) -> Result<Note> {
        match self.api.create_note(title, description).await {
            Ok(note) => {
                self.store.upsert(&CachedNote::clean(note.clone())).await?;
                self.events.publish(NoteEvent::Created(note.clone()));
                Ok(note)
            }
            Err(ApiError::Transport(reason)) => {
                tracing::debug!("creating provisional note, remote unreachable: {reason}");
                let note = Note::provisional(title, description);
                let mut record = CachedNote::dirty(note.clone());
                record.provisional_id = Some(note.id);
                self.store.upsert(&record).await?;
                self.sync.enqueue_create(&note);
                self.events.publish(NoteEvent::Created(note.clone()));
                Ok(note)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Update a note's title and description.
    ///
    /// On failure the cached copy (fetched before the network call) is
    /// edited in place, marked dirty, and an update is queued. The record's
    /// `updated_at` is left as-is, so a genuinely newer remote edit can
    /// still win the next merge before the queued update replays. Fails
    /// only when there is no cached copy to edit.
    pub async fn update(&self, id: i64, title: &str, description: &str) -> Result<Note> {
        let existing = self.store.get_by_id(id).await?;

        match self.api.update_note(id, title, description).await {
            Ok(note) => {
                self.store.upsert(&CachedNote::clean(note.clone())).await?;
                self.events.publish(NoteEvent::Updated(note.clone()));
                Ok(note)
            }
            Err(error) => {
                let Some(mut record) = existing else {
                    return Err(match error {
                        ApiError::Status { .. } => error.into(),
                        _ => Error::NotFound(id),
                    });
                };
                tracing::debug!("editing note {id} locally, remote unavailable: {error}");
                record.note.title = title.to_string();
                record.note.description = description.to_string();
                record.dirty = true;
                self.store.upsert(&record).await?;
                self.sync.enqueue_update(&record.note);
                self.events.publish(NoteEvent::Updated(record.note.clone()));
                Ok(record.note)
            }
        }
    }

    /// Delete a note.
    ///
    /// Any remote failure tombstones the cached copy and queues the delete,
    /// so deletion always succeeds from the caller's point of view.
    pub async fn delete(&self, id: i64) -> Result<()> {
        match self.api.delete_note(id).await {
            Ok(()) => {
                self.store.hard_delete(id).await?;
            }
            Err(error) => {
                tracing::debug!("tombstoning note {id}, remote delete failed: {error}");
                self.store.mark_deleted(id).await?;
                self.sync.enqueue_delete(id);
            }
        }
        self.events.publish(NoteEvent::Deleted(id));
        Ok(())
    }

    /// Slice the cached listing into a page shaped like a remote response.
    async fn local_page(&self, page: u32, page_size: u32) -> Result<NotesPage> {
        let active = self.store.list_active().await?;
        if active.is_empty() {
            return Err(Error::NoCachedData);
        }

        let total = active.len();
        let page = page.max(1) as usize;
        let page_size = page_size.max(1) as usize;
        let from = (page - 1) * page_size;
        let to = (from + page_size).min(total);

        let results: Vec<Note> = if from < total {
            active[from..to].iter().map(|r| r.note.clone()).collect()
        } else {
            Vec::new()
        };

        Ok(NotesPage {
            count: total as i64,
            next: (to < total).then(|| OFFLINE_NEXT.to_string()),
            previous: (page > 1).then(|| OFFLINE_PREVIOUS.to_string()),
            results,
        })
    }
}
