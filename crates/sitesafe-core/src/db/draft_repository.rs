//! Draft repository implementation

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::{DraftId, DraftInput, DraftRecord, DraftSummary, FileBlob, FormData};
use crate::util::unix_millis_now;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for draft storage operations
pub trait DraftRepository {
    /// Insert a new draft, or overwrite `existing` when given
    fn save(&self, existing: Option<DraftId>, input: &DraftInput) -> Result<DraftId>;

    /// Get a draft with its files
    fn get(&self, id: DraftId) -> Result<Option<DraftRecord>>;

    /// List draft summaries, most recently saved first
    fn list(&self) -> Result<Vec<DraftSummary>>;

    /// Delete one draft; returns whether it existed
    fn delete(&self, id: DraftId) -> Result<bool>;

    /// Delete several drafts; returns how many existed
    fn delete_many(&self, ids: &[DraftId]) -> Result<usize>;
}

/// `SQLite` implementation of `DraftRepository`
pub struct SqliteDraftRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDraftRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn load_files(&self, id: DraftId) -> Result<BTreeMap<String, FileBlob>> {
        let mut stmt = self.conn.prepare(
            "SELECT field, file_name, content_type, bytes FROM draft_files WHERE draft_id = ?1",
        )?;
        let files = stmt
            .query_map(params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    FileBlob::new(
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ),
                ))
            })?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok(files)
    }
}

impl DraftRepository for SqliteDraftRepository<'_> {
    fn save(&self, existing: Option<DraftId>, input: &DraftInput) -> Result<DraftId> {
        let data = serde_json::to_string(&input.data)?;
        let now = unix_millis_now();
        let tx = self.conn.unchecked_transaction()?;

        let id = if let Some(id) = existing {
            let rows = tx.execute(
                "UPDATE drafts SET form_type = ?1, project_id = ?2, data = ?3, saved_at = ?4
                 WHERE id = ?5",
                params![input.form_type.as_str(), input.project_id, data, now, id],
            )?;
            if rows == 0 {
                return Err(Error::NotFound(format!("draft {id}")));
            }
            tx.execute("DELETE FROM draft_files WHERE draft_id = ?1", params![id])?;
            id
        } else {
            tx.execute(
                "INSERT INTO drafts (form_type, project_id, data, saved_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![input.form_type.as_str(), input.project_id, data, now],
            )?;
            tx.last_insert_rowid()
        };

        for (field, blob) in &input.files {
            tx.execute(
                "INSERT INTO draft_files (draft_id, field, file_name, content_type, bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, field, blob.name, blob.content_type, blob.bytes],
            )?;
        }

        tx.commit()?;
        tracing::debug!("Saved draft {id}");
        Ok(id)
    }

    fn get(&self, id: DraftId) -> Result<Option<DraftRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT form_type, project_id, data, saved_at FROM drafts WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((form_type, project_id, data, saved_at)) = row else {
            return Ok(None);
        };

        let data: FormData = serde_json::from_str(&data)?;
        Ok(Some(DraftRecord {
            id,
            form_type: form_type.parse()?,
            project_id,
            data,
            files: self.load_files(id)?,
            saved_at,
        }))
    }

    fn list(&self) -> Result<Vec<DraftSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.form_type, d.project_id, d.saved_at,
                    (SELECT COUNT(*) FROM draft_files f WHERE f.draft_id = d.id)
             FROM drafts d
             ORDER BY d.saved_at DESC, d.id DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, form_type, project_id, saved_at, file_count)| {
                Ok(DraftSummary {
                    id,
                    form_type: form_type.parse()?,
                    project_id,
                    file_count: usize::try_from(file_count).unwrap_or_default(),
                    saved_at,
                })
            })
            .collect()
    }

    fn delete(&self, id: DraftId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM drafts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn delete_many(&self, ids: &[DraftId]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut deleted = 0;
        for id in ids {
            deleted += tx.execute("DELETE FROM drafts WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(deleted)
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

    fn input(topic: &str) -> DraftInput {
        let mut data = FormData::new();
        data.insert("topic".into(), json!(topic));
        DraftInput::new(FormType::DailyTrainingTalks, "proj-1", data)
    }

    #[test]
    fn test_save_and_get_with_files() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());

        let blob = FileBlob::new("talk.jpg", Some("image/jpeg".into()), vec![9, 9]);
        let id = repo
            .save(None, &input("Ladders").with_file("photo", blob.clone()))
            .unwrap();

        let draft = repo.get(id).unwrap().unwrap();
        assert_eq!(draft.form_type, FormType::DailyTrainingTalks);
        assert_eq!(draft.data["topic"], "Ladders");
        assert_eq!(draft.files.get("photo"), Some(&blob));
    }

    #[test]
    fn test_save_existing_replaces_contents() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());

        let blob = FileBlob::new("talk.jpg", None, vec![1]);
        let id = repo
            .save(None, &input("Ladders").with_file("photo", blob))
            .unwrap();
        let same = repo.save(Some(id), &input("Harnesses")).unwrap();
        assert_eq!(same, id);

        let draft = repo.get(id).unwrap().unwrap();
        assert_eq!(draft.data["topic"], "Harnesses");
        assert!(draft.files.is_empty());
    }

    #[test]
    fn test_save_missing_draft_is_not_found() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());

        let result = repo.save(Some(42), &input("Ladders"));
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_and_delete_many() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());

        let first = repo.save(None, &input("One")).unwrap();
        let second = repo
            .save(
                None,
                &input("Two").with_file("photo", FileBlob::new("a.png", None, vec![1])),
            )
            .unwrap();
        let third = repo.save(None, &input("Three")).unwrap();

        let listed = repo.list().unwrap();
        assert_eq!(listed.len(), 3);
        let with_file = listed.iter().find(|draft| draft.id == second).unwrap();
        assert_eq!(with_file.file_count, 1);

        assert_eq!(repo.delete_many(&[first, second, 999]).unwrap(), 2);
        assert_eq!(
            repo.list().unwrap().into_iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![third]
        );

        let orphaned: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM draft_files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphaned, 0);
    }

    #[test]
    fn test_delete() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());

        let id = repo.save(None, &input("One")).unwrap();
        assert!(repo.delete(id).unwrap());
        assert!(!repo.delete(id).unwrap());
        assert!(repo.get(id).unwrap().is_none());
    }
}
