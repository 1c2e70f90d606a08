//! In-memory backend with failure injection for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{ObjectStore, RecordReview, RecordStore};
use crate::models::{FileBlob, FormRecord, NewFormRecord, Project, StatusUpdate};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, FileBlob>,
    records: Vec<NewFormRecord>,
    projects: Vec<Project>,
    /// Records as the review side sees them, newest first
    stored_records: Vec<FormRecord>,
    fail_all_uploads: bool,
    fail_all_inserts: bool,
    failing_file_names: BTreeSet<String>,
    upload_calls: usize,
    insert_calls: usize,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.with_state(|state| state.fail_all_uploads = fail);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.with_state(|state| state.fail_all_inserts = fail);
    }

    /// Reject uploads of one particular file name.
    pub fn fail_uploads_named(&self, file_name: &str) {
        self.with_state(|state| {
            state.failing_file_names.insert(file_name.to_string());
        });
    }

    pub fn add_project(&self, project: Project) {
        self.with_state(|state| state.projects.insert(0, project));
    }

    pub fn add_stored_record(&self, record: FormRecord) {
        self.with_state(|state| state.stored_records.insert(0, record));
    }

    pub fn stored_records(&self) -> Vec<FormRecord> {
        self.with_state(|state| state.stored_records.clone())
    }

    pub fn records(&self) -> Vec<NewFormRecord> {
        self.with_state(|state| state.records.clone())
    }

    pub fn object_paths(&self) -> Vec<String> {
        self.with_state(|state| state.objects.keys().cloned().collect())
    }

    pub fn upload_calls(&self) -> usize {
        self.with_state(|state| state.upload_calls)
    }

    pub fn insert_calls(&self) -> usize {
        self.with_state(|state| state.insert_calls)
    }
}

impl ObjectStore for MemoryBackend {
    async fn upload(&self, path: &str, blob: &FileBlob) -> Result<()> {
        tokio::task::yield_now().await;
        self.with_state(|state| {
            state.upload_calls += 1;
            if state.fail_all_uploads || state.failing_file_names.contains(&blob.name) {
                return Err(Error::Upload("storage quota exceeded (413)".to_string()));
            }
            state.objects.insert(path.to_string(), blob.clone());
            Ok(())
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://files.test/public/{path}")
    }
}

impl RecordStore for MemoryBackend {
    async fn insert_form_record(&self, record: &NewFormRecord) -> Result<()> {
        tokio::task::yield_now().await;
        self.with_state(|state| {
            state.insert_calls += 1;
            if state.fail_all_inserts {
                return Err(Error::Insert(
                    "new row violates row-level security policy (403)".to_string(),
                ));
            }
            state.records.push(record.clone());
            Ok(())
        })
    }
}

impl RecordReview for MemoryBackend {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.with_state(|state| state.projects.clone()))
    }

    async fn list_form_records(&self, project_id: Option<&str>) -> Result<Vec<FormRecord>> {
        Ok(self.with_state(|state| {
            state
                .stored_records
                .iter()
                .filter(|record| project_id.is_none_or(|id| record.project_id == id))
                .cloned()
                .collect()
        }))
    }

    async fn fetch_form_record(&self, record_id: &str) -> Result<Option<FormRecord>> {
        Ok(self.with_state(|state| {
            state
                .stored_records
                .iter()
                .find(|record| record.id == record_id)
                .cloned()
        }))
    }

    async fn update_record_status(
        &self,
        record: &mut FormRecord,
        update: StatusUpdate,
    ) -> Result<()> {
        record.apply_status_update(update);
        self.with_state(|state| -> Result<()> {
            let stored = state
                .stored_records
                .iter_mut()
                .find(|stored| stored.id == record.id)
                .ok_or_else(|| Error::Remote(format!("no record {} (404)", record.id)))?;
            stored.clone_from(record);
            Ok(())
        })
    }

    async fn delete_form_record(&self, record_id: &str) -> Result<()> {
        self.with_state(|state| {
            state.stored_records.retain(|record| record.id != record_id);
        });
        Ok(())
    }
}
