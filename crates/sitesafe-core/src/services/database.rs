//! Shared handle to the device-local database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::db::{Database, DraftRepository, SqliteDraftRepository};
use crate::models::{DraftId, DraftInput, DraftRecord, DraftSummary};
use crate::Result;

/// Thread-safe service over the single local `SQLite` connection.
///
/// The outbox and the drafts store share this handle, so there is exactly one
/// writer per database file.
#[derive(Clone, Debug)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
    quarantined: Vec<PathBuf>,
}

impl DatabaseService {
    /// Open the database at `db_path`, creating it when missing.
    ///
    /// A file that is not a database is moved aside together with its `-wal`
    /// and `-shm` sidecars, and a fresh one is created. Reports queued in the
    /// old file stay in that backup; see [`Self::quarantined_backups`].
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let db = match Database::open(&db_path) {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::error!(
                    "Local database at {} is unreadable: {}. Moving it aside.",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path)?
            }
            Err(error) => return Err(error),
        };

        let quarantined = Self::find_quarantined_backups(&db_path)?;
        if !quarantined.is_empty() {
            tracing::warn!(
                "{} quarantined database backup(s) beside {} may hold unsent reports",
                quarantined.len(),
                db_path.display()
            );
        }

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
            quarantined,
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
            db_path: None,
            quarantined: Vec::new(),
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Unreadable database files that were moved aside, oldest first.
    ///
    /// Anything that was still queued when the file broke lives on in these
    /// backups, never in the fresh database.
    pub fn quarantined_backups(&self) -> &[PathBuf] {
        &self.quarantined
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().await
    }

    fn is_corrupted_db_error(error: &crate::Error) -> bool {
        error
            .to_string()
            .to_ascii_lowercase()
            .contains("file is not a database")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<Option<PathBuf>> {
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(None);
        };
        if !db_path.exists() {
            return Ok(None);
        }

        let timestamp = chrono::Utc::now().timestamp_millis();
        let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));
        std::fs::rename(db_path, &backup_path)?;
        tracing::error!(
            "Moved corrupted local database from {} to {}",
            db_path.display(),
            backup_path.display()
        );

        for suffix in ["-wal", "-shm"] {
            let sidecar = db_path.with_file_name(format!("{base_name}{suffix}"));
            if sidecar.exists() {
                let moved = backup_path.with_file_name(format!(
                    "{base_name}.corrupt-{timestamp}{suffix}"
                ));
                std::fs::rename(&sidecar, &moved)?;
                tracing::warn!("Moved {} to {}", sidecar.display(), moved.display());
            }
        }

        Ok(Some(backup_path))
    }

    /// Backups written by an earlier quarantine of `db_path`, oldest first.
    fn find_quarantined_backups(db_path: &Path) -> Result<Vec<PathBuf>> {
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(Vec::new());
        };
        let prefix = format!("{base_name}.corrupt-");
        let parent = match db_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut backups: Vec<(i64, PathBuf)> = std::fs::read_dir(parent)?
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let stamp = name.strip_prefix(&prefix)?.parse::<i64>().ok()?;
                Some((stamp, entry.path()))
            })
            .collect();
        backups.sort();
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// Save a draft, replacing `existing` when given.
    pub async fn save_draft(&self, existing: Option<DraftId>, input: &DraftInput) -> Result<DraftId> {
        let db = self.db.lock().await;
        let repo = SqliteDraftRepository::new(db.connection());
        repo.save(existing, input)
    }

    /// Fetch a draft with its files.
    pub async fn get_draft(&self, id: DraftId) -> Result<Option<DraftRecord>> {
        let db = self.db.lock().await;
        let repo = SqliteDraftRepository::new(db.connection());
        repo.get(id)
    }

    /// List drafts newest-first.
    pub async fn list_drafts(&self) -> Result<Vec<DraftSummary>> {
        let db = self.db.lock().await;
        let repo = SqliteDraftRepository::new(db.connection());
        repo.list()
    }

    /// Delete one draft.
    pub async fn delete_draft(&self, id: DraftId) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = SqliteDraftRepository::new(db.connection());
        repo.delete(id)
    }

    /// Delete several drafts at once.
    pub async fn delete_drafts(&self, ids: &[DraftId]) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = SqliteDraftRepository::new(db.connection());
        repo.delete_many(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormData, FormType};
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_draft_roundtrip() {
        let service = DatabaseService::open_in_memory().unwrap();

        let input = DraftInput::new(FormType::GoodPractices, "proj-1", FormData::new());
        let id = service.save_draft(None, &input).await.unwrap();

        let drafts = service.list_drafts().await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, id);
        assert!(service.delete_draft(id).await.unwrap());
        assert!(service.get_draft(id).await.unwrap().is_none());
    }

    #[test]
    fn detects_corrupted_database_errors() {
        assert!(DatabaseService::is_corrupted_db_error(&crate::Error::Storage(
            "file is not a database".to_string()
        )));
        assert!(!DatabaseService::is_corrupted_db_error(
            &crate::Error::InvalidInput("bad".to_string())
        ));
    }

    fn corrupt_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("sitesafe.db.corrupt-"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn open_path_moves_unreadable_file_aside() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("sitesafe.db");
        std::fs::write(&db_path, vec![0xAB; 4096]).unwrap();

        let service = DatabaseService::open_path(&db_path).unwrap();
        assert_eq!(service.db_path(), Some(db_path.as_path()));
        assert_eq!(corrupt_files(tmp.path()).len(), 1);
        assert_eq!(service.quarantined_backups().len(), 1);
    }

    #[test]
    fn quarantine_keeps_wal_and_shm_beside_the_backup() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("sitesafe.db");
        std::fs::write(&db_path, b"main").unwrap();
        std::fs::write(tmp.path().join("sitesafe.db-wal"), b"wal").unwrap();
        std::fs::write(tmp.path().join("sitesafe.db-shm"), b"shm").unwrap();

        let backup = DatabaseService::quarantine_corrupted_db_files(&db_path)
            .unwrap()
            .unwrap();
        assert!(!db_path.exists());
        assert!(!tmp.path().join("sitesafe.db-wal").exists());
        assert!(!tmp.path().join("sitesafe.db-shm").exists());

        let backup_name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(
            corrupt_files(tmp.path()),
            vec![
                backup_name.clone(),
                format!("{backup_name}-shm"),
                format!("{backup_name}-wal"),
            ]
        );
        let wal = std::fs::read(tmp.path().join(format!("{backup_name}-wal"))).unwrap();
        assert_eq!(wal, b"wal");

        // Sidecars are not counted as separate backups.
        let found = DatabaseService::find_quarantined_backups(&db_path).unwrap();
        assert_eq!(found, vec![backup]);
    }

    #[test]
    fn quarantined_backups_are_reported_on_later_opens() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("sitesafe.db");
        std::fs::write(&db_path, vec![0xAB; 4096]).unwrap();
        drop(DatabaseService::open_path(&db_path).unwrap());

        let reopened = DatabaseService::open_path(&db_path).unwrap();
        assert_eq!(reopened.quarantined_backups().len(), 1);

        let clean = tempdir().unwrap();
        let fresh = DatabaseService::open_path(clean.path().join("sitesafe.db")).unwrap();
        assert!(fresh.quarantined_backups().is_empty());
    }
}
