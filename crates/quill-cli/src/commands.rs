//! Command implementations over the quill-core repository

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quill_core::api::NotesApiClient;
use quill_core::db::{Database, LocalNoteStore, PendingActionQueue};
use quill_core::models::Note;
use quill_core::{NoteEventBus, NoteRepository, SyncManager};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::CliError;

const API_URL_VAR: &str = "QUILL_API_URL";
const API_TOKEN_VAR: &str = "QUILL_API_TOKEN";

/// Everything a command needs: the repository for note operations, the
/// manager for explicit sync, the queue for status reporting.
pub struct App {
    pub repo: NoteRepository<NotesApiClient>,
    pub manager: SyncManager<NotesApiClient>,
    pub queue: PendingActionQueue,
}

pub async fn open(db_path: &Path) -> Result<App, CliError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!("using database at {}", db_path.display());
    let db = Arc::new(Mutex::new(Database::open(db_path).await?));
    let store = LocalNoteStore::new(db.clone()).await?;
    let queue = PendingActionQueue::new(db);
    let api = Arc::new(client_from_env()?);

    let manager = SyncManager::new(api.clone(), store.clone(), queue.clone());
    let repo = NoteRepository::new(api, store, manager.handle(), NoteEventBus::new());

    Ok(App {
        repo,
        manager,
        queue,
    })
}

pub fn resolve_db_path(override_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = override_path {
        return Ok(path);
    }
    dirs::data_dir()
        .map(|dir| dir.join("quill").join("quill.db"))
        .ok_or(CliError::NoDataDir)
}

fn client_from_env() -> Result<NotesApiClient, CliError> {
    let url = env::var(API_URL_VAR).map_err(|_| CliError::RemoteNotConfigured)?;
    let token = env::var(API_TOKEN_VAR).map_err(|_| CliError::RemoteNotConfigured)?;
    NotesApiClient::new(url, token).map_err(|error| CliError::RemoteConfig(error.to_string()))
}

pub async fn run_add(app: &App, title: &str, description: &str) -> Result<(), CliError> {
    let note = app.repo.create(title, description).await?;
    app.manager.handle().flush().await;
    println!("Created note {}", note.id);
    Ok(())
}

pub async fn run_list(app: &App, page: u32, page_size: u32, as_json: bool) -> Result<(), CliError> {
    let listing = app.repo.list(page, page_size).await?;

    if as_json {
        let items: Vec<NoteListItem> = listing.results.iter().map(note_to_list_item).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    for line in format_note_lines(&listing.results) {
        println!("{line}");
    }
    println!("{} of {} notes", listing.results.len(), listing.count);
    if listing.next.is_some() {
        println!("More on page {}", page + 1);
    }
    Ok(())
}

pub async fn run_search(
    app: &App,
    query: &str,
    page: Option<u32>,
    page_size: Option<u32>,
    as_json: bool,
) -> Result<(), CliError> {
    let matches = app.repo.search(query, page, page_size).await?;

    if as_json {
        let items: Vec<NoteListItem> = matches.results.iter().map(note_to_list_item).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if matches.results.is_empty() {
        println!("No notes matched '{query}'");
        return Ok(());
    }
    for line in format_note_lines(&matches.results) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_edit(app: &App, id: i64, title: &str, description: &str) -> Result<(), CliError> {
    let note = app.repo.update(id, title, description).await?;
    app.manager.handle().flush().await;
    println!("Updated note {}", note.id);
    Ok(())
}

pub async fn run_delete(app: &App, id: i64) -> Result<(), CliError> {
    app.repo.delete(id).await?;
    app.manager.handle().flush().await;
    println!("Deleted note {id}");
    Ok(())
}

pub async fn run_sync(app: &App) -> Result<(), CliError> {
    tracing::info!("running sync pass");
    app.manager.run_sync().await;

    let remaining = app.queue.list_all().await?.len();
    if remaining == 0 {
        println!("Sync complete");
    } else {
        println!("Sync finished with {remaining} actions still pending");
    }
    Ok(())
}

/// Stable JSON shape for `--json` output; scripts depend on these fields.
#[derive(Debug, Serialize)]
struct NoteListItem {
    id: i64,
    title: String,
    description: String,
    created_at: String,
    updated_at: String,
}

fn note_to_list_item(note: &Note) -> NoteListItem {
    NoteListItem {
        id: note.id,
        title: note.title.clone(),
        description: note.description.clone(),
        created_at: note.created_at.clone(),
        updated_at: note.updated_at.clone(),
    }
}

fn format_note_lines(notes: &[Note]) -> Vec<String> {
    notes
        .iter()
        .map(|note| format!("{:>12}  {:<19}  {}", note.id, note.updated_at, note.title))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_aligns_id_and_timestamp() {
        let note = Note {
            id: 42,
            title: "Groceries".to_string(),
            description: "milk".to_string(),
            created_at: "2026-01-01T00:00:00".to_string(),
            updated_at: "2026-01-02T11:30:00".to_string(),
            creator_name: String::new(),
            creator_username: String::new(),
        };

        let lines = format_note_lines(std::slice::from_ref(&note));
        assert_eq!(lines[0], "          42  2026-01-02T11:30:00  Groceries");
    }

    #[test]
    fn json_output_keeps_note_fields() {
        let note = Note {
            id: 7,
            title: "t".to_string(),
            description: "d".to_string(),
            created_at: "2026-01-01T00:00:00".to_string(),
            updated_at: "2026-01-02T00:00:00".to_string(),
            creator_name: "Sam".to_string(),
            creator_username: "sam".to_string(),
        };

        let json = serde_json::to_value(note_to_list_item(&note)).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["title"], "t");
        assert_eq!(json["updated_at"], "2026-01-02T00:00:00");
        // Creator fields are not part of the CLI output contract
        assert!(json.get("creator_name").is_none());
    }

    #[test]
    fn db_path_override_wins() {
        let path = resolve_db_path(Some(PathBuf::from("/tmp/custom.db"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.db"));
    }
}
