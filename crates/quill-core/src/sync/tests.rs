use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::Mutex;

use crate::api::{ApiError, ApiResult, NoteApi, NoteFilter};
use crate::connectivity::ConnectivityMonitor;
use crate::db::{Database, LocalNoteStore, PendingActionQueue};
use crate::models::{CachedNote, Note, NotesPage, PendingAction};

use super::SyncManager;

/// In-memory stand-in for the remote service.
///
/// Holds server-side note state behind a mutex, an `online` switch that turns
/// every call into a transport error, and a log of mutation calls.
pub(crate) struct MockApi {
    notes: StdMutex<HashMap<i64, Note>>,
    online: AtomicBool,
    next_id: AtomicI64,
    calls: StdMutex<Vec<String>>,
}

impl MockApi {
    pub(crate) fn new() -> Self {
        Self {
            notes: StdMutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            next_id: AtomicI64::new(100),
            calls: StdMutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn seed(&self, note: Note) {
        self.notes.lock().unwrap().insert(note.id, note);
    }

    pub(crate) fn server_note(&self, id: i64) -> Option<Note> {
        self.notes.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn server_len(&self) -> usize {
        self.notes.lock().unwrap().len()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check_online(&self) -> ApiResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ApiError::Transport("connection refused".to_string()))
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn page(results: Vec<Note>) -> NotesPage {
        NotesPage {
            count: results.len() as i64,
            next: None,
            previous: None,
            results,
        }
    }
}

pub(crate) fn server_note(id: i64, title: &str, updated_at: &str) -> Note {
    Note {
        id,
        title: title.to_string(),
        description: format!("{title} body"),
        created_at: "2026-02-01T00:00:00".to_string(),
        updated_at: updated_at.to_string(),
        creator_name: "Sam".to_string(),
        creator_username: "sam".to_string(),
    }
}

impl NoteApi for MockApi {
    async fn list_notes(&self, _page: Option<u32>, _page_size: Option<u32>) -> ApiResult<NotesPage> {
        self.check_online()?;
        let mut results: Vec<Note> = self.notes.lock().unwrap().values().cloned().collect();
        results.sort_by_key(|n| n.id);
        Ok(Self::page(results))
    }

    async fn filter_notes(&self, filter: NoteFilter) -> ApiResult<NotesPage> {
        self.check_online()?;
        let results: Vec<Note> = self
            .notes
            .lock()
            .unwrap()
            .values()
            .filter(|n| {
                filter
                    .title
                    .as_ref()
                    .is_none_or(|t| n.title.contains(t.as_str()))
                    && filter
                        .description
                        .as_ref()
                        .is_none_or(|d| n.description.contains(d.as_str()))
            })
            .cloned()
            .collect();
        Ok(Self::page(results))
    }

    async fn create_note(&self, title: &str, description: &str) -> ApiResult<Note> {
        self.check_online()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.record(format!("create {title}"));
        let note = Note {
            id,
            title: title.to_string(),
            description: description.to_string(),
            created_at: "2026-02-01T00:00:00".to_string(),
            updated_at: "2026-02-01T00:00:00".to_string(),
            creator_name: "Sam".to_string(),
            creator_username: "sam".to_string(),
        };
        self.notes.lock().unwrap().insert(id, note.clone());
        Ok(note)
    }

    async fn get_note(&self, id: i64) -> ApiResult<Note> {
        self.check_online()?;
        self.notes
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                message: "Note not found.".to_string(),
            })
    }

    async fn update_note(&self, id: i64, title: &str, description: &str) -> ApiResult<Note> {
        self.check_online()?;
        self.record(format!("update {id}"));
        let mut notes = self.notes.lock().unwrap();
        let Some(note) = notes.get_mut(&id) else {
            return Err(ApiError::Status {
                status: 404,
                message: "Note not found.".to_string(),
            });
        };
        note.title = title.to_string();
        note.description = description.to_string();
        note.updated_at = "2026-02-02T00:00:00".to_string();
        Ok(note.clone())
    }

    async fn delete_note(&self, id: i64) -> ApiResult<()> {
        self.check_online()?;
        self.record(format!("delete {id}"));
        if self.notes.lock().unwrap().remove(&id).is_some() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: 404,
                message: "Note not found.".to_string(),
            })
        }
    }
}

pub(crate) struct Harness {
    pub(crate) api: Arc<MockApi>,
    pub(crate) store: LocalNoteStore,
    pub(crate) queue: PendingActionQueue,
    pub(crate) manager: SyncManager<MockApi>,
}

pub(crate) async fn harness() -> Harness {
    let db = Arc::new(Mutex::new(Database::open_in_memory().await.unwrap()));
    let store = LocalNoteStore::new(db.clone()).await.unwrap();
    let queue = PendingActionQueue::new(db);
    let api = Arc::new(MockApi::new());
    let manager = SyncManager::new(api.clone(), store.clone(), queue.clone());
    Harness {
        api,
        store,
        queue,
        manager,
    }
}

/// Poll the queue until it holds `expected` actions, for handle-based
/// enqueues that land through the writer task.
pub(crate) async fn wait_for_pending(queue: &PendingActionQueue, expected: usize) {
    for _ in 0..200 {
        if queue.list_all().await.unwrap().len() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("queue never reached {expected} pending actions");
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_mutations_converge_in_one_pass() {
    let h = harness().await;
    h.api.seed(server_note(1, "keep", "2026-01-01T00:00:00"));
    h.api.seed(server_note(2, "doomed", "2026-01-01T00:00:00"));

    // Offline: edit note 1, delete note 2, create a third
    let mut edited = server_note(1, "keep edited", "2026-01-01T00:00:00");
    edited.updated_at = crate::models::FAR_FUTURE_UPDATED_AT.to_string();
    h.store.upsert(&CachedNote::dirty(edited.clone())).await.unwrap();
    h.queue
        .enqueue(&PendingAction::update(&edited).unwrap())
        .await
        .unwrap();

    h.store.mark_deleted(2).await.unwrap();
    h.queue.enqueue(&PendingAction::delete(2)).await.unwrap();

    let created = Note::provisional("new note", "written offline");
    let mut record = CachedNote::dirty(created.clone());
    record.provisional_id = Some(created.id);
    h.store.upsert(&record).await.unwrap();
    h.queue
        .enqueue(&PendingAction::create(&created).unwrap())
        .await
        .unwrap();

    h.manager.run_sync().await;

    assert!(h.queue.list_all().await.unwrap().is_empty());
    assert!(h.store.get_dirty().await.unwrap().is_empty());
    assert_eq!(h.api.server_note(1).unwrap().title, "keep edited");
    assert!(h.api.server_note(2).is_none());
    assert_eq!(h.api.server_len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn replaying_an_empty_queue_makes_no_mutation_calls() {
    let h = harness().await;
    h.api.seed(server_note(1, "steady", "2026-01-01T00:00:00"));

    h.manager.run_sync().await;
    h.manager.run_sync().await;

    assert!(h.api.calls().is_empty());
    assert_eq!(h.store.list_active().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn create_remap_retargets_later_actions_in_same_pass() {
    let h = harness().await;

    let provisional = Note::provisional("draft", "v1");
    let provisional_id = provisional.id;
    let mut record = CachedNote::dirty(provisional.clone());
    record.provisional_id = Some(provisional_id);
    h.store.upsert(&record).await.unwrap();

    let mut edited = provisional.clone();
    edited.description = "v2".to_string();

    h.queue
        .enqueue(&PendingAction::create(&provisional).unwrap())
        .await
        .unwrap();
    h.queue
        .enqueue(&PendingAction::update(&edited).unwrap())
        .await
        .unwrap();
    h.queue
        .enqueue(&PendingAction::delete(provisional_id))
        .await
        .unwrap();

    h.manager.run_sync().await;

    // Server only ever saw its own id (100), never the provisional one
    assert_eq!(
        h.api.calls(),
        vec![
            "create draft".to_string(),
            "update 100".to_string(),
            "delete 100".to_string(),
        ]
    );
    assert!(h.queue.list_all().await.unwrap().is_empty());
    assert!(h.store.get_by_id(provisional_id).await.unwrap().is_none());
    assert!(h.store.get_by_id(100).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn acknowledged_create_clears_provisional_state() {
    let h = harness().await;

    let provisional = Note::provisional("draft", "v1");
    h.queue
        .enqueue(&PendingAction::create(&provisional).unwrap())
        .await
        .unwrap();

    h.manager.run_sync().await;

    assert!(h.store.get_by_id(provisional.id).await.unwrap().is_none());
    let record = h.store.get_by_id(100).await.unwrap().unwrap();
    assert!(!record.dirty);
    assert_eq!(record.provisional_id, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn merge_prefers_newer_remote_over_stale_dirty_local() {
    let h = harness().await;
    h.api
        .seed(server_note(1, "remote wins", "2026-03-01T00:00:00"));

    let local = server_note(1, "stale local", "2026-02-01T00:00:00");
    h.store.upsert(&CachedNote::dirty(local)).await.unwrap();

    h.manager.run_sync().await;

    let record = h.store.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(record.note.title, "remote wins");
    assert!(!record.dirty);
}

#[tokio::test(flavor = "multi_thread")]
async fn merge_keeps_newer_dirty_local_over_stale_remote() {
    let h = harness().await;
    h.api
        .seed(server_note(1, "stale remote", "2026-02-01T00:00:00"));

    let local = server_note(1, "local wins", "2026-03-01T00:00:00");
    h.store
        .upsert(&CachedNote::dirty(local.clone()))
        .await
        .unwrap();

    // Queue is empty, so phase 1 pushes nothing and the merge decides
    h.manager.run_sync().await;

    let record = h.store.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(record.note.title, "local wins");
    assert!(record.dirty);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_actions_stay_queued_for_the_next_pass() {
    let h = harness().await;
    h.api.set_online(false);

    let note = server_note(1, "unsendable", "2026-01-01T00:00:00");
    h.queue
        .enqueue(&PendingAction::update(&note).unwrap())
        .await
        .unwrap();

    h.manager.run_sync().await;
    assert_eq!(h.queue.list_all().await.unwrap().len(), 1);

    h.api.seed(server_note(1, "unsendable", "2026-01-01T00:00:00"));
    h.api.set_online(true);
    h.manager.run_sync().await;

    assert!(h.queue.list_all().await.unwrap().is_empty());
    assert_eq!(h.api.server_note(1).unwrap().title, "unsendable");
}

#[tokio::test(flavor = "multi_thread")]
async fn unreadable_payload_is_dropped_not_retried() {
    let h = harness().await;

    let mut broken = PendingAction::create(&server_note(1, "x", "")).unwrap();
    broken.payload = Some("{not json".to_string());
    h.queue.enqueue(&broken).await.unwrap();

    h.manager.run_sync().await;

    assert!(h.queue.list_all().await.unwrap().is_empty());
    assert!(h.api.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn handle_enqueues_in_call_order() {
    let h = harness().await;
    let handle = h.manager.handle();

    let first = Note::provisional("first", "a");
    let second = Note::provisional("second", "b");
    handle.enqueue_create(&first);
    handle.enqueue_update(&second);
    handle.enqueue_delete(9);
    handle.flush().await;

    let actions = h.queue.list_all().await.unwrap();
    assert_eq!(actions.len(), 3);
    assert_eq!(actions[0].payload_note().unwrap().unwrap().title, "first");
    assert_eq!(actions[1].payload_note().unwrap().unwrap().title, "second");
    assert_eq!(actions[2].note_id, Some(9));
}

#[tokio::test(flavor = "multi_thread")]
async fn connectivity_transition_triggers_a_pass() {
    let h = harness().await;
    h.api.set_online(false);

    let note = Note::provisional("pending", "offline");
    h.queue
        .enqueue(&PendingAction::create(&note).unwrap())
        .await
        .unwrap();

    let monitor = ConnectivityMonitor::new(false);
    let _loop_task = h.manager.start(&monitor);

    h.api.set_online(true);
    monitor.set_connected(true);

    wait_for_pending(&h.queue, 0).await;
    assert_eq!(h.api.server_len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn pull_failure_does_not_undo_the_drain() {
    let h = harness().await;
    let note = Note::provisional("only create", "body");
    h.queue
        .enqueue(&PendingAction::create(&note).unwrap())
        .await
        .unwrap();

    h.manager.run_sync().await;
    assert!(h.queue.list_all().await.unwrap().is_empty());

    // A later offline pass neither re-creates nor corrupts anything
    h.api.set_online(false);
    h.manager.run_sync().await;
    assert_eq!(h.api.server_len(), 1);
}
