//! Outbox repository implementation

use crate::error::{Error, Result};
use crate::models::{
    DeadLetter, FileBlob, FormData, OutboxId, PendingSubmission, QueuedFile, QueuedSubmission,
    SubmissionPayload,
};
use crate::util::unix_millis_now;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ENTRY_COLUMNS: &str = "id, form_type, project_id, submitted_by_id, data, file_name, \
     file_content_type, file_field, file_bytes, created_at, attempts, last_error";

/// Trait for outbox storage operations
pub trait OutboxRepository {
    /// Persist a new submission at the tail of the queue
    fn enqueue(&self, payload: &SubmissionPayload, file: Option<&QueuedFile>) -> Result<OutboxId>;

    /// Load one queued submission, including its file bytes
    fn get(&self, id: OutboxId) -> Result<Option<QueuedSubmission>>;

    /// Ids of every queued submission in insertion order
    fn queued_ids(&self) -> Result<Vec<OutboxId>>;

    /// Summaries of queued submissions in insertion order
    fn pending(&self) -> Result<Vec<PendingSubmission>>;

    /// Number of queued submissions
    fn count(&self) -> Result<usize>;

    /// Delete a queued submission; returns whether it existed
    fn remove(&self, id: OutboxId) -> Result<bool>;

    /// Record a failed attempt and return the new attempt count
    fn record_failure(&self, id: OutboxId, message: &str) -> Result<u32>;

    /// Move a queued submission into the dead-letter table
    fn dead_letter(&self, id: OutboxId) -> Result<()>;

    /// Parked submissions, most recently parked first
    fn dead_letters(&self) -> Result<Vec<DeadLetter>>;

    /// Number of parked submissions
    fn dead_letter_count(&self) -> Result<usize>;

    /// Put a parked submission back at the tail of the queue with a fresh id
    fn requeue_dead_letter(&self, id: OutboxId) -> Result<OutboxId>;
}

/// `SQLite` implementation of `OutboxRepository`
pub struct SqliteOutboxRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteOutboxRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn count_rows(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Raw column values of an outbox row
struct EntryRow {
    id: i64,
    form_type: String,
    project_id: String,
    submitted_by_id: String,
    data: String,
    file_name: Option<String>,
    file_content_type: Option<String>,
    file_field: Option<String>,
    file_bytes: Option<Vec<u8>>,
    created_at: i64,
    attempts: u32,
    last_error: Option<String>,
}

impl EntryRow {
    fn parse(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            form_type: row.get(1)?,
            project_id: row.get(2)?,
            submitted_by_id: row.get(3)?,
            data: row.get(4)?,
            file_name: row.get(5)?,
            file_content_type: row.get(6)?,
            file_field: row.get(7)?,
            file_bytes: row.get(8)?,
            created_at: row.get(9)?,
            attempts: row.get(10)?,
            last_error: row.get(11)?,
        })
    }

    fn into_submission(self) -> Result<QueuedSubmission> {
        let data: FormData = serde_json::from_str(&self.data)?;
        let file = match (self.file_name, self.file_bytes) {
            (Some(name), Some(bytes)) => Some(QueuedFile::new(
                self.file_field,
                FileBlob::new(name, self.file_content_type, bytes),
            )),
            _ => None,
        };

        Ok(QueuedSubmission {
            id: OutboxId::new(self.id),
            payload: SubmissionPayload {
                form_type: self.form_type.parse()?,
                project_id: self.project_id,
                submitted_by_id: self.submitted_by_id,
                data,
            },
            file,
            created_at: self.created_at,
            attempts: self.attempts,
            last_error: self.last_error,
        })
    }
}

impl OutboxRepository for SqliteOutboxRepository<'_> {
    fn enqueue(&self, payload: &SubmissionPayload, file: Option<&QueuedFile>) -> Result<OutboxId> {
        let data = serde_json::to_string(&payload.data)?;

        self.conn.execute(
            "INSERT INTO outbox (form_type, project_id, submitted_by_id, data, file_name,
                file_content_type, file_field, file_bytes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                payload.form_type.as_str(),
                payload.project_id,
                payload.submitted_by_id,
                data,
                file.map(|file| file.blob.name.as_str()),
                file.and_then(|file| file.blob.content_type.as_deref()),
                file.and_then(|file| file.field.as_deref()),
                file.map(|file| file.blob.bytes.as_slice()),
                unix_millis_now(),
            ],
        )?;

        Ok(OutboxId::new(self.conn.last_insert_rowid()))
    }

    fn get(&self, id: OutboxId) -> Result<Option<QueuedSubmission>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM outbox WHERE id = ?1"),
                params![id.get()],
                EntryRow::parse,
            )
            .optional()?;

        row.map(EntryRow::into_submission).transpose()
    }

    fn queued_ids(&self) -> Result<Vec<OutboxId>> {
        let mut stmt = self.conn.prepare("SELECT id FROM outbox ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(OutboxId::new))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn pending(&self) -> Result<Vec<PendingSubmission>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, form_type, project_id, submitted_by_id, file_name, created_at,
                    attempts, last_error
             FROM outbox
             ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(id, form_type, project_id, submitted_by_id, file_name, created_at, attempts, last_error)| {
                    Ok(PendingSubmission {
                        id: OutboxId::new(id),
                        form_type: form_type.parse()?,
                        project_id,
                        submitted_by_id,
                        file_name,
                        created_at,
                        attempts,
                        last_error,
                    })
                },
            )
            .collect()
    }

    fn count(&self) -> Result<usize> {
        self.count_rows("outbox")
    }

    fn remove(&self, id: OutboxId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM outbox WHERE id = ?1", params![id.get()])?;
        Ok(rows > 0)
    }

    fn record_failure(&self, id: OutboxId, message: &str) -> Result<u32> {
        let attempts = self
            .conn
            .query_row(
                "UPDATE outbox SET attempts = attempts + 1, last_error = ?1
                 WHERE id = ?2
                 RETURNING attempts",
                params![message, id.get()],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;

        attempts.ok_or_else(|| Error::NotFound(format!("outbox item {id}")))
    }

    fn dead_letter(&self, id: OutboxId) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let moved = tx.execute(
            &format!(
                "INSERT INTO outbox_dead_letters ({ENTRY_COLUMNS}, dead_at)
                 SELECT {ENTRY_COLUMNS}, ?1 FROM outbox WHERE id = ?2"
            ),
            params![unix_millis_now(), id.get()],
        )?;
        if moved == 0 {
            return Err(Error::NotFound(format!("outbox item {id}")));
        }
        tx.execute("DELETE FROM outbox WHERE id = ?1", params![id.get()])?;
        tx.commit()?;
        Ok(())
    }

    fn dead_letters(&self) -> Result<Vec<DeadLetter>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, form_type, project_id, attempts, last_error, dead_at
             FROM outbox_dead_letters
             ORDER BY dead_at DESC, id DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, form_type, project_id, attempts, last_error, dead_at)| {
                Ok(DeadLetter {
                    id: OutboxId::new(id),
                    form_type: form_type.parse()?,
                    project_id,
                    attempts,
                    last_error,
                    dead_at,
                })
            })
            .collect()
    }

    fn dead_letter_count(&self) -> Result<usize> {
        self.count_rows("outbox_dead_letters")
    }

    fn requeue_dead_letter(&self, id: OutboxId) -> Result<OutboxId> {
        let tx = self.conn.unchecked_transaction()?;
        let moved = tx.execute(
            "INSERT INTO outbox (form_type, project_id, submitted_by_id, data, file_name,
                file_content_type, file_field, file_bytes, created_at)
             SELECT form_type, project_id, submitted_by_id, data, file_name,
                file_content_type, file_field, file_bytes, ?1
             FROM outbox_dead_letters WHERE id = ?2",
            params![unix_millis_now(), id.get()],
        )?;
        if moved == 0 {
            return Err(Error::NotFound(format!("dead letter {id}")));
        }
        let new_id = OutboxId::new(tx.last_insert_rowid());
        tx.execute(
            "DELETE FROM outbox_dead_letters WHERE id = ?1",
            params![id.get()],
        )?;
        tx.commit()?;
        Ok(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::FormType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn payload(location: &str) -> SubmissionPayload {
        let mut data = FormData::new();
        data.insert("location".into(), json!(location));
        SubmissionPayload::new(FormType::NearMissReports, "proj-1", "user-1", data)
    }

    #[test]
    fn test_enqueue_and_get() {
        let db = setup();
        let repo = SqliteOutboxRepository::new(db.connection());

        let file = QueuedFile::new(
            Some("photo".into()),
            FileBlob::new("scaffold.jpg", Some("image/jpeg".into()), vec![1, 2, 3]),
        );
        let id = repo.enqueue(&payload("Tower B"), Some(&file)).unwrap();

        let item = repo.get(id).unwrap().unwrap();
        assert_eq!(item.id, id);
        assert_eq!(item.payload, payload("Tower B"));
        assert_eq!(item.file, Some(file));
        assert_eq!(item.attempts, 0);
        assert!(item.last_error.is_none());
    }

    #[test]
    fn test_ids_are_fifo_and_never_reused() {
        let db = setup();
        let repo = SqliteOutboxRepository::new(db.connection());

        let first = repo.enqueue(&payload("A"), None).unwrap();
        let second = repo.enqueue(&payload("B"), None).unwrap();
        assert!(repo.remove(second).unwrap());

        let third = repo.enqueue(&payload("C"), None).unwrap();
        assert!(third > second);
        assert_eq!(repo.queued_ids().unwrap(), vec![first, third]);
    }

    #[test]
    fn test_count_and_remove() {
        let db = setup();
        let repo = SqliteOutboxRepository::new(db.connection());

        let id = repo.enqueue(&payload("A"), None).unwrap();
        repo.enqueue(&payload("B"), None).unwrap();
        assert_eq!(repo.count().unwrap(), 2);

        assert!(repo.remove(id).unwrap());
        assert!(!repo.remove(id).unwrap());
        assert_eq!(repo.count().unwrap(), 1);
        assert!(repo.get(id).unwrap().is_none());
    }

    #[test]
    fn test_record_failure_counts_attempts() {
        let db = setup();
        let repo = SqliteOutboxRepository::new(db.connection());

        let id = repo.enqueue(&payload("A"), None).unwrap();
        assert_eq!(repo.record_failure(id, "timeout").unwrap(), 1);
        assert_eq!(repo.record_failure(id, "HTTP 500").unwrap(), 2);

        let pending = repo.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("HTTP 500"));

        assert!(repo.record_failure(OutboxId::new(999), "x").is_err());
    }

    #[test]
    fn test_dead_letter_round_trip() {
        let db = setup();
        let repo = SqliteOutboxRepository::new(db.connection());

        let id = repo.enqueue(&payload("A"), None).unwrap();
        repo.record_failure(id, "row violates policy").unwrap();
        repo.dead_letter(id).unwrap();

        assert_eq!(repo.count().unwrap(), 0);
        assert_eq!(repo.dead_letter_count().unwrap(), 1);
        let parked = repo.dead_letters().unwrap();
        assert_eq!(parked[0].id, id);
        assert_eq!(parked[0].attempts, 1);

        let requeued = repo.requeue_dead_letter(id).unwrap();
        assert!(requeued > id);
        assert_eq!(repo.dead_letter_count().unwrap(), 0);
        let item = repo.get(requeued).unwrap().unwrap();
        assert_eq!(item.attempts, 0);
        assert_eq!(item.payload, payload("A"));
    }
}
