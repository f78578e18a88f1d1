//! Connectivity-driven synchronization engine
//!
//! When connectivity returns, one pass runs: pending actions drain against
//! the remote service in FIFO order (remapping provisional ids as creates are
//! acknowledged), then the latest remote page is pulled and merged into the
//! local cache with last-write-wins on `updated_at`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::api::{ApiError, NoteApi};
use crate::connectivity::ConnectivityMonitor;
use crate::db::{LocalNoteStore, PendingActionQueue};
use crate::error::{Error, Result};
use crate::models::{ActionKind, CachedNote, Note, PendingAction};

enum QueueMessage {
    Persist(PendingAction),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget enqueue handle for repositories.
///
/// Sends append requests to a single writer task, so callers never block on
/// queue I/O while FIFO order by call order is preserved.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<QueueMessage>,
}

impl SyncHandle {
    pub fn enqueue_create(&self, note: &Note) {
        self.send(PendingAction::create(note));
    }

    pub fn enqueue_update(&self, note: &Note) {
        self.send(PendingAction::update(note));
    }

    pub fn enqueue_delete(&self, note_id: i64) {
        self.send(Ok(PendingAction::delete(note_id)));
    }

    /// Wait until every action enqueued so far has been written to the
    /// durable queue. Short-lived processes call this before exiting.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(QueueMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    fn send(&self, action: Result<PendingAction>) {
        match action {
            Ok(action) => {
                if self.tx.send(QueueMessage::Persist(action)).is_err() {
                    tracing::warn!("pending action dropped: queue writer has shut down");
                }
            }
            Err(error) => tracing::warn!("failed to snapshot note for queueing: {error}"),
        }
    }
}

/// A provisional id that received its server-assigned replacement.
#[derive(Debug, Clone, Copy)]
struct Remap {
    old_id: i64,
    new_id: i64,
}

struct SyncInner<A> {
    api: Arc<A>,
    store: LocalNoteStore,
    queue: PendingActionQueue,
    // Serializes manual triggers against connectivity-driven passes
    pass_lock: Mutex<()>,
    enqueue_tx: mpsc::UnboundedSender<QueueMessage>,
}

/// Drives sync passes and owns the pending-queue writer task.
pub struct SyncManager<A> {
    inner: Arc<SyncInner<A>>,
}

impl<A> Clone for SyncManager<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: NoteApi + 'static> SyncManager<A> {
    /// Create the manager and spawn the queue writer task.
    #[must_use]
    pub fn new(api: Arc<A>, store: LocalNoteStore, queue: PendingActionQueue) -> Self {
        let (enqueue_tx, mut enqueue_rx) = mpsc::unbounded_channel::<QueueMessage>();

        let writer_queue = queue.clone();
        tokio::spawn(async move {
            while let Some(message) = enqueue_rx.recv().await {
                match message {
                    QueueMessage::Persist(action) => {
                        if let Err(error) = writer_queue.enqueue(&action).await {
                            tracing::warn!("failed to persist pending action: {error}");
                        }
                    }
                    QueueMessage::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Self {
            inner: Arc::new(SyncInner {
                api,
                store,
                queue,
                pass_lock: Mutex::new(()),
                enqueue_tx,
            }),
        }
    }

    /// Handle for repositories to append pending actions without blocking.
    #[must_use]
    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            tx: self.inner.enqueue_tx.clone(),
        }
    }

    /// Spawn the loop that runs one pass per observed `connected` state.
    ///
    /// Transitions arriving mid-pass coalesce into at most one follow-up
    /// pass; two passes never run concurrently.
    pub fn start(&self, monitor: &ConnectivityMonitor) -> JoinHandle<()> {
        let inner = self.inner.clone();
        let mut connectivity = monitor.observe();
        tokio::spawn(async move {
            loop {
                let connected = *connectivity.borrow_and_update();
                if connected {
                    inner.run_pass().await;
                }
                if connectivity.changed().await.is_err() {
                    tracing::debug!("connectivity monitor dropped, stopping sync loop");
                    break;
                }
            }
        })
    }

    /// Run one synchronization pass now. Errors are logged, never surfaced.
    pub async fn run_sync(&self) {
        self.inner.run_pass().await;
    }
}

impl<A: NoteApi> SyncInner<A> {
    async fn run_pass(&self) {
        let _guard = self.pass_lock.lock().await;
        if let Err(error) = self.drain_queue().await {
            tracing::warn!("sync pass aborted while draining queue: {error}");
            return;
        }
        // Phase 2 failures abort only phase 2; drained actions stay drained.
        if let Err(error) = self.pull_and_merge().await {
            tracing::debug!("pull-and-merge skipped: {error}");
        }
    }

    /// Phase 1: push pending actions in FIFO order.
    async fn drain_queue(&self) -> Result<()> {
        let mut pending = self.queue.list_all().await?;
        if pending.is_empty() {
            return Ok(());
        }

        let mut processed = Vec::new();
        let mut index = 0;
        while index < pending.len() {
            let action = pending[index].clone();
            tracing::debug!(
                "processing pending action id={} kind={} note_id={:?}",
                action.id,
                action.kind,
                action.note_id
            );

            match self.process_action(&action).await {
                Ok(remap) => {
                    processed.push(action.id);
                    if let Some(remap) = remap {
                        // Retarget queued rows and the rest of this batch
                        // before any later action is attempted.
                        self.queue.remap_note_id(remap.old_id, remap.new_id).await?;
                        for later in pending.iter_mut().skip(index + 1) {
                            if let Err(error) = later.retarget(remap.old_id, remap.new_id) {
                                tracing::warn!(
                                    "failed to retarget pending action id={}: {error}",
                                    later.id
                                );
                            }
                        }
                    }
                }
                // Transient failure: leave queued for the next pass, keep
                // going so one stuck action doesn't block distinct notes.
                Err(error) => {
                    tracing::debug!("pending action id={} left queued: {error}", action.id);
                }
            }
            index += 1;
        }

        self.queue.remove_by_ids(&processed).await
    }

    /// Returns a remap when a create came back under a different server id.
    async fn process_action(&self, action: &PendingAction) -> Result<Option<Remap>> {
        match action.kind {
            ActionKind::Create => {
                // A snapshot that cannot be read can never be replayed
                let Some(note) = Self::readable_payload(action) else {
                    return Ok(None);
                };
                let created = self.api.create_note(&note.title, &note.description).await?;

                let remap = (created.id != note.id).then(|| {
                    tracing::debug!(
                        "replacing provisional note id={} with server id={}",
                        note.id,
                        created.id
                    );
                    Remap {
                        old_id: note.id,
                        new_id: created.id,
                    }
                });
                if let Some(remap) = remap {
                    self.store.hard_delete(remap.old_id).await?;
                }
                // Server copy replaces the provisional record outright
                self.store.upsert(&CachedNote::clean(created)).await?;
                Ok(remap)
            }
            ActionKind::Update => {
                let Some(note) = Self::readable_payload(action) else {
                    return Ok(None);
                };
                match self
                    .api
                    .update_note(note.id, &note.title, &note.description)
                    .await
                {
                    Ok(updated) => {
                        self.store.upsert(&CachedNote::clean(updated)).await?;
                        Ok(None)
                    }
                    // 2xx with no body: acknowledged, nothing to upsert
                    Err(ApiError::EmptyBody) => Ok(None),
                    Err(error) => Err(error.into()),
                }
            }
            ActionKind::Delete => {
                let Some(note_id) = action.note_id else {
                    return Ok(None);
                };
                self.api.delete_note(note_id).await.map_err(Error::from)?;
                self.store.hard_delete(note_id).await?;
                Ok(None)
            }
        }
    }

    /// Missing or malformed payloads are permanently inapplicable; drop them
    /// from the queue instead of retrying forever.
    fn readable_payload(action: &PendingAction) -> Option<Note> {
        match action.payload_note() {
            Ok(Some(note)) => Some(note),
            Ok(None) => {
                tracing::warn!("pending {} id={} has no payload", action.kind, action.id);
                None
            }
            Err(error) => {
                tracing::warn!(
                    "pending {} id={} payload unreadable: {error}",
                    action.kind,
                    action.id
                );
                None
            }
        }
    }

    /// Phase 2: pull the first remote page and merge last-write-wins.
    async fn pull_and_merge(&self) -> Result<()> {
        let page = self.api.list_notes(None, None).await.map_err(Error::from)?;
        self.merge_remote(page.results).await
    }

    async fn merge_remote(&self, remote: Vec<Note>) -> Result<()> {
        let dirty: HashMap<i64, CachedNote> = self
            .store
            .get_dirty()
            .await?
            .into_iter()
            .map(|record| (record.note.id, record))
            .collect();

        let mut records = Vec::with_capacity(remote.len());
        for note in remote {
            match dirty.get(&note.id) {
                // Lexicographic ISO-8601 compare; correct only while both
                // sides use identical-width formats.
                Some(local) if note.updated_at <= local.note.updated_at => {
                    records.push(local.clone());
                }
                _ => records.push(CachedNote::clean(note)),
            }
        }

        // Notes absent from this page are left untouched; merge never deletes.
        self.store.upsert_all(&records).await
    }
}

#[cfg(test)]
pub(crate) mod tests;
