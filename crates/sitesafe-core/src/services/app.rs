//! Top-level coordinator that owns the session context.

use std::sync::Arc;

use chrono::Local;
use serde_json::Value;

use crate::models::{
    DraftId, DraftInput, FileBlob, FormData, FormRecord, FormType, Project, RecordStatus,
    StatusUpdate, User,
};
use crate::outbox::{Outbox, RetryPolicy, SyncReport};
use crate::remote::{ObjectStore, RecordReview, RecordStore};
use crate::schema::{FormSchema, PROJECT_FIELD};
use crate::services::{
    BulkSubmitReport, DatabaseService, FormSubmission, SubmissionService, SubmitOutcome,
};
use crate::state::{AppContext, Connectivity, StatusSnapshot};
use crate::{Error, Result};

/// Owns the [`AppContext`], the outbox, the drafts store and the submission
/// service. Connectivity changes go through [`SafetyApp::set_online`].
pub struct SafetyApp<B> {
    context: AppContext,
    db: DatabaseService,
    outbox: Outbox<B>,
    submissions: SubmissionService<B>,
}

impl<B: ObjectStore + RecordStore> SafetyApp<B> {
    pub fn new(db: DatabaseService, backend: Arc<B>, policy: RetryPolicy) -> Self {
        let outbox = Outbox::new(db.clone(), Arc::clone(&backend)).with_retry_policy(policy);
        let submissions = SubmissionService::new(db.clone(), outbox.clone(), backend);
        Self {
            context: AppContext::default(),
            db,
            outbox,
            submissions,
        }
    }

    pub const fn context(&self) -> &AppContext {
        &self.context
    }

    pub const fn outbox(&self) -> &Outbox<B> {
        &self.outbox
    }

    pub fn set_current_user(&mut self, user: Option<User>) {
        self.context.current_user = user;
    }

    pub fn select_project(&mut self, project: Option<Project>) {
        self.context.selected_project = project;
    }

    /// Record a connectivity change. Going from offline to online starts a
    /// sync pass and returns its report.
    pub async fn set_online(&mut self, online: bool) -> Result<Option<SyncReport>> {
        let previous = self.context.connectivity;
        self.context.connectivity = Connectivity::from_online(online);

        match (previous.is_online(), online) {
            (false, true) => {
                tracing::info!("Connection restored; syncing queued reports");
                self.outbox.try_sync().await
            }
            (true, false) => {
                tracing::info!("Connection lost; new reports will be queued");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// App came to the foreground or was refreshed.
    pub async fn resume(&self) -> Result<Option<SyncReport>> {
        if !self.context.connectivity.is_online() {
            return Ok(None);
        }
        self.outbox.try_sync().await
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        self.outbox
            .store()
            .snapshot(self.context.connectivity.is_online(), self.outbox.is_syncing())
            .await
    }

    fn signed_in_user(&self) -> Result<&User> {
        self.context
            .current_user
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("No signed-in user".to_string()))
    }

    /// Starting values for a blank form of `form_type`. Forms with a
    /// project selector start on the selected project.
    pub fn new_form(&self, form_type: FormType) -> FormData {
        let author = self
            .context
            .current_user
            .as_ref()
            .map_or("", |user| user.full_name.as_str());
        let schema = FormSchema::for_form_type(form_type);
        let mut data = schema.initial_values(author, &Local::now());

        if let (Some(project), Some(field)) = (
            self.context.selected_project.as_ref(),
            schema.field(PROJECT_FIELD),
        ) {
            data.insert(field.name.clone(), Value::String(project.name.clone()));
        }
        data
    }

    /// Submit a form as the signed-in user.
    pub async fn submit(
        &self,
        form_type: FormType,
        project_id: &str,
        data: FormData,
        files: Vec<(String, FileBlob)>,
    ) -> Result<SubmitOutcome> {
        let user = self.signed_in_user()?;
        let mut form = FormSubmission::new(form_type, project_id, user.id.clone(), data);
        form.files.extend(files);
        self.submissions
            .submit(&form, self.context.connectivity)
            .await
    }

    pub async fn save_draft(&self, existing: Option<DraftId>, input: &DraftInput) -> Result<DraftId> {
        self.db.save_draft(existing, input).await
    }

    /// Submit saved drafts as the signed-in user. Requires connectivity.
    pub async fn submit_drafts(&self, ids: &[DraftId]) -> Result<BulkSubmitReport> {
        let user = self.signed_in_user()?;
        self.submissions
            .submit_drafts(ids, &user.id, self.context.connectivity)
            .await
    }
}

/// Reviewing reports that already reached the backend. Every call here
/// needs connectivity; nothing is queued.
impl<B: ObjectStore + RecordStore + RecordReview> SafetyApp<B> {
    const fn require_online(&self) -> Result<()> {
        if self.context.connectivity.is_online() {
            Ok(())
        } else {
            Err(Error::Offline)
        }
    }

    pub async fn projects(&self) -> Result<Vec<Project>> {
        self.require_online()?;
        self.outbox.backend().list_projects().await
    }

    /// Select the project whose row id or project code is `key`.
    pub async fn select_project_by_key(&mut self, key: &str) -> Result<Project> {
        let project = self
            .projects()
            .await?
            .into_iter()
            .find(|project| project.id == key || project.project_id.eq_ignore_ascii_case(key))
            .ok_or_else(|| Error::NotFound(format!("project {key}")))?;
        self.select_project(Some(project.clone()));
        Ok(project)
    }

    /// Records for the selected project, or every record when none is selected.
    pub async fn records(&self) -> Result<Vec<FormRecord>> {
        self.require_online()?;
        let project_id = self
            .context
            .selected_project
            .as_ref()
            .map(|project| project.id.as_str());
        self.outbox.backend().list_form_records(project_id).await
    }

    /// Move a record to `status`, signed by the current user.
    pub async fn update_record_status(
        &self,
        record_id: &str,
        status: RecordStatus,
        notes: &str,
    ) -> Result<FormRecord> {
        self.require_online()?;
        let user = self.signed_in_user()?;
        let backend = self.outbox.backend();
        let mut record = backend
            .fetch_form_record(record_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("record {record_id}")))?;

        let update = StatusUpdate::now(user.full_name.clone(), status, notes);
        backend.update_record_status(&mut record, update).await?;
        tracing::info!("Record {record_id} moved to {status}");
        Ok(record)
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<()> {
        self.require_online()?;
        self.outbox.backend().delete_form_record(record_id).await?;
        tracing::info!("Deleted record {record_id}");
        Ok(())
    }
}
