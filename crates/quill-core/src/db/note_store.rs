//! Local note cache with sync bookkeeping

use std::sync::Arc;

use libsql::{params, Value};
use tokio::sync::{watch, Mutex};

use crate::error::{Error, Result};
use crate::models::{CachedNote, Note};

use super::connection::Database;

/// Persistent keyed collection of cached notes.
///
/// Callers own all business logic; the store only reads and writes rows.
/// Mutations are serialized through the shared database mutex, and every
/// mutation republishes the active listing to `observe()` subscribers.
#[derive(Clone)]
pub struct LocalNoteStore {
    db: Arc<Mutex<Database>>,
    listing: Arc<watch::Sender<Vec<CachedNote>>>,
}

impl LocalNoteStore {
    /// Create a store over the shared database, priming the live listing.
    pub async fn new(db: Arc<Mutex<Database>>) -> Result<Self> {
        let (listing, _rx) = watch::channel(Vec::new());
        let store = Self {
            db,
            listing: Arc::new(listing),
        };
        store.refresh().await?;
        Ok(store)
    }

    /// Live view of non-deleted records sorted by `updated_at` descending.
    ///
    /// The receiver holds the current listing immediately and is notified on
    /// every store mutation.
    pub fn observe(&self) -> watch::Receiver<Vec<CachedNote>> {
        self.listing.subscribe()
    }

    /// Insert or replace a record by id. The write wins unconditionally;
    /// conflict resolution happens before calling.
    pub async fn upsert(&self, record: &CachedNote) -> Result<()> {
        {
            let db = self.db.lock().await;
            Self::write_record(db.connection(), record).await?;
        }
        self.refresh().await
    }

    /// Insert or replace a batch of records by id.
    pub async fn upsert_all(&self, records: &[CachedNote]) -> Result<()> {
        {
            let db = self.db.lock().await;
            for record in records {
                Self::write_record(db.connection(), record).await?;
            }
        }
        self.refresh().await
    }

    /// Fetch a record by id, tombstoned or not.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<CachedNote>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT id, title, description, created_at, updated_at,
                        creator_name, creator_username, dirty, deleted, provisional_id
                 FROM notes WHERE id = ? LIMIT 1",
                params![id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_record(&row)?)),
            None => Ok(None),
        }
    }

    /// Tombstone a record: deleted and dirty, row kept for the remote delete.
    pub async fn mark_deleted(&self, id: i64) -> Result<()> {
        {
            let db = self.db.lock().await;
            db.connection()
                .execute(
                    "UPDATE notes SET deleted = 1, dirty = 1 WHERE id = ?",
                    params![id],
                )
                .await?;
        }
        self.refresh().await
    }

    /// Physically remove a record.
    pub async fn hard_delete(&self, id: i64) -> Result<()> {
        {
            let db = self.db.lock().await;
            db.connection()
                .execute("DELETE FROM notes WHERE id = ?", params![id])
                .await?;
        }
        self.refresh().await
    }

    /// All records with unsynced local changes, tombstones included.
    pub async fn get_dirty(&self) -> Result<Vec<CachedNote>> {
        let db = self.db.lock().await;
        Self::collect(
            db.connection(),
            "SELECT id, title, description, created_at, updated_at,
                    creator_name, creator_username, dirty, deleted, provisional_id
             FROM notes WHERE dirty = 1",
        )
        .await
    }

    /// Non-deleted records ordered by `updated_at` descending.
    pub async fn list_active(&self) -> Result<Vec<CachedNote>> {
        let db = self.db.lock().await;
        Self::collect(
            db.connection(),
            "SELECT id, title, description, created_at, updated_at,
                    creator_name, creator_username, dirty, deleted, provisional_id
             FROM notes WHERE deleted = 0 ORDER BY updated_at DESC",
        )
        .await
    }

    async fn refresh(&self) -> Result<()> {
        let active = self.list_active().await?;
        self.listing.send_replace(active);
        Ok(())
    }

    async fn write_record(conn: &libsql::Connection, record: &CachedNote) -> Result<()> {
        let provisional = record
            .provisional_id
            .map_or(Value::Null, Value::Integer);
        conn.execute(
            "INSERT OR REPLACE INTO notes
                 (id, title, description, created_at, updated_at,
                  creator_name, creator_username, dirty, deleted, provisional_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.note.id,
                record.note.title.as_str(),
                record.note.description.as_str(),
                record.note.created_at.as_str(),
                record.note.updated_at.as_str(),
                record.note.creator_name.as_str(),
                record.note.creator_username.as_str(),
                i64::from(record.dirty),
                i64::from(record.deleted),
                provisional,
            ],
        )
        .await?;
        Ok(())
    }

    async fn collect(conn: &libsql::Connection, sql: &str) -> Result<Vec<CachedNote>> {
        let mut rows = conn.query(sql, ()).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }
        Ok(records)
    }

    fn parse_record(row: &libsql::Row) -> Result<CachedNote> {
        let provisional_id = match row.get_value(9)? {
            Value::Null => None,
            Value::Integer(value) => Some(value),
            other => {
                return Err(Error::Database(format!(
                    "unexpected provisional_id value: {other:?}"
                )))
            }
        };

        Ok(CachedNote {
            note: Note {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
                creator_name: row.get(5)?,
                creator_username: row.get(6)?,
            },
            dirty: row.get::<i32>(7)? != 0,
            deleted: row.get::<i32>(8)? != 0,
            provisional_id,
        })
    }
}
