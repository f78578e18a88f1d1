//! Durable FIFO log of not-yet-acknowledged mutations

use std::sync::Arc;

use libsql::{params, Value};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{ActionKind, Note, PendingAction};

use super::connection::Database;

/// Persistent queue of pending actions.
///
/// The queue is the durability boundary: once enqueued, an action survives
/// process restart until explicitly removed. Ordering is by enqueue timestamp
/// with the rowid as tiebreaker.
#[derive(Clone)]
pub struct PendingActionQueue {
    db: Arc<Mutex<Database>>,
}

impl PendingActionQueue {
    #[must_use]
    pub const fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Append an action, preserving insertion order. Returns the queue row id.
    pub async fn enqueue(&self, action: &PendingAction) -> Result<i64> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let note_id = action.note_id.map_or(Value::Null, Value::Integer);
        let payload = action
            .payload
            .clone()
            .map_or(Value::Null, Value::Text);
        conn.execute(
            "INSERT INTO pending_actions (note_id, action, payload_json, timestamp)
             VALUES (?, ?, ?, ?)",
            params![note_id, action.kind.as_str(), payload, action.enqueued_at],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    /// All queued actions, oldest first.
    pub async fn list_all(&self) -> Result<Vec<PendingAction>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT id, note_id, action, payload_json, timestamp
                 FROM pending_actions ORDER BY timestamp ASC, id ASC",
                (),
            )
            .await?;

        let mut actions = Vec::new();
        while let Some(row) = rows.next().await? {
            actions.push(Self::parse_action(&row)?);
        }
        Ok(actions)
    }

    /// Remove processed actions in one batch. Ids not listed keep their
    /// original order for retry.
    pub async fn remove_by_ids(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM pending_actions WHERE id IN ({placeholders})");
        let values: Vec<Value> = ids.iter().copied().map(Value::Integer).collect();

        let db = self.db.lock().await;
        db.connection().execute(&sql, values).await?;
        Ok(())
    }

    /// Retarget every queued action from a provisional note id to the
    /// server-assigned one, in place, without reordering.
    ///
    /// Create/update payload snapshots embed the note id too, so those are
    /// rewritten alongside the `note_id` column.
    pub async fn remap_note_id(&self, old_id: i64, new_id: i64) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut rows = conn
            .query(
                "SELECT id, payload_json FROM pending_actions
                 WHERE note_id = ? AND payload_json IS NOT NULL",
                params![old_id],
            )
            .await?;
        let mut payloads: Vec<(i64, String)> = Vec::new();
        while let Some(row) = rows.next().await? {
            payloads.push((row.get(0)?, row.get(1)?));
        }

        conn.execute(
            "UPDATE pending_actions SET note_id = ? WHERE note_id = ?",
            params![new_id, old_id],
        )
        .await?;

        for (row_id, json) in payloads {
            let mut note: Note = serde_json::from_str(&json)?;
            if note.id == old_id {
                note.id = new_id;
                conn.execute(
                    "UPDATE pending_actions SET payload_json = ? WHERE id = ?",
                    params![serde_json::to_string(&note)?, row_id],
                )
                .await?;
            }
        }
        Ok(())
    }

    /// Drop every queued action.
    pub async fn clear(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM pending_actions", ())
            .await?;
        Ok(())
    }

    fn parse_action(row: &libsql::Row) -> Result<PendingAction> {
        let note_id = match row.get_value(1)? {
            Value::Null => None,
            Value::Integer(value) => Some(value),
            other => {
                return Err(Error::Database(format!(
                    "unexpected note_id value: {other:?}"
                )))
            }
        };
        let payload = match row.get_value(3)? {
            Value::Null => None,
            Value::Text(value) => Some(value),
            other => {
                return Err(Error::Database(format!(
                    "unexpected payload_json value: {other:?}"
                )))
            }
        };
        let kind: ActionKind = row.get::<String>(2)?.parse()?;

        Ok(PendingAction {
            id: row.get(0)?,
            note_id,
            kind,
            payload,
            enqueued_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn setup() -> PendingActionQueue {
        let db = Arc::new(Mutex::new(Database::open_in_memory().await.unwrap()));
        PendingActionQueue::new(db)
    }

    fn note(id: i64) -> Note {
        Note {
            id,
            title: "t".to_string(),
            description: "d".to_string(),
            created_at: String::new(),
            updated_at: "2026-01-01T00:00:00".to_string(),
            creator_name: String::new(),
            creator_username: String::new(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enqueue_preserves_fifo_order() {
        let queue = setup().await;

        // Identical timestamps still order by rowid
        let mut first = PendingAction::create(&note(1)).unwrap();
        let mut second = PendingAction::update(&note(1)).unwrap();
        let mut third = PendingAction::delete(1);
        first.enqueued_at = 1000;
        second.enqueued_at = 1000;
        third.enqueued_at = 1000;

        queue.enqueue(&first).await.unwrap();
        queue.enqueue(&second).await.unwrap();
        queue.enqueue(&third).await.unwrap();

        let kinds: Vec<ActionKind> = queue
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|a| a.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ActionKind::Create, ActionKind::Update, ActionKind::Delete]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remove_by_ids_keeps_unlisted_actions() {
        let queue = setup().await;
        let first = queue
            .enqueue(&PendingAction::create(&note(1)).unwrap())
            .await
            .unwrap();
        queue
            .enqueue(&PendingAction::delete(2))
            .await
            .unwrap();

        queue.remove_by_ids(&[first]).await.unwrap();

        let remaining = queue.list_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].note_id, Some(2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remap_rewrites_note_id_and_payload() {
        let queue = setup().await;
        let provisional = note(1_700_000_000);
        queue
            .enqueue(&PendingAction::update(&provisional).unwrap())
            .await
            .unwrap();
        queue
            .enqueue(&PendingAction::delete(provisional.id))
            .await
            .unwrap();
        queue
            .enqueue(&PendingAction::delete(77))
            .await
            .unwrap();

        queue.remap_note_id(provisional.id, 42).await.unwrap();

        let actions = queue.list_all().await.unwrap();
        assert_eq!(actions[0].note_id, Some(42));
        assert_eq!(actions[0].payload_note().unwrap().unwrap().id, 42);
        assert_eq!(actions[1].note_id, Some(42));
        // Unrelated action untouched
        assert_eq!(actions[2].note_id, Some(77));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn queue_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("quill.db");

        {
            let db = Arc::new(Mutex::new(Database::open(&path).await.unwrap()));
            let queue = PendingActionQueue::new(db);
            queue
                .enqueue(&PendingAction::create(&note(5)).unwrap())
                .await
                .unwrap();
        }

        let db = Arc::new(Mutex::new(Database::open(&path).await.unwrap()));
        let queue = PendingActionQueue::new(db);
        let actions = queue.list_all().await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].note_id, Some(5));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clear_empties_queue() {
        let queue = setup().await;
        queue.enqueue(&PendingAction::delete(1)).await.unwrap();

        queue.clear().await.unwrap();

        assert!(queue.list_all().await.unwrap().is_empty());
    }
}
