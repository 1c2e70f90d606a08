//! Form submission: direct when online, through the outbox when offline.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::models::{
    DraftId, DraftRecord, FileBlob, FormData, FormType, NewFormRecord, OutboxId, QueuedFile,
    RecordStatus, SubmissionPayload,
};
use crate::outbox::Outbox;
use crate::remote::{upload_path, ObjectStore, RecordStore};
use crate::schema::FormSchema;
use crate::services::DatabaseService;
use crate::state::Connectivity;
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// A completed form ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    pub form_type: FormType,
    pub project_id: String,
    pub submitted_by_id: String,
    pub data: FormData,
    /// Attached files keyed by the form field they belong to
    pub files: BTreeMap<String, FileBlob>,
}

impl FormSubmission {
    pub fn new(
        form_type: FormType,
        project_id: impl Into<String>,
        submitted_by_id: impl Into<String>,
        data: FormData,
    ) -> Self {
        Self {
            form_type,
            project_id: project_id.into(),
            submitted_by_id: submitted_by_id.into(),
            data,
            files: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, field: impl Into<String>, blob: FileBlob) -> Self {
        self.files.insert(field.into(), blob);
        self
    }

    pub fn from_draft(draft: DraftRecord, submitted_by_id: impl Into<String>) -> Self {
        Self {
            form_type: draft.form_type,
            project_id: draft.project_id,
            submitted_by_id: submitted_by_id.into(),
            data: draft.data,
            files: draft.files,
        }
    }

    /// The attachment kept when queueing offline: the file for the earliest
    /// field in the form layout, else the first by field name.
    fn primary_file(&self, schema: &FormSchema) -> Option<(String, FileBlob)> {
        let attached = |name: &str| self.files.get(name).filter(|blob| !blob.is_empty());

        schema
            .fields
            .iter()
            .find_map(|field| attached(&field.name).map(|blob| (field.name.clone(), blob.clone())))
            .or_else(|| {
                self.files
                    .iter()
                    .find(|(_, blob)| !blob.is_empty())
                    .map(|(field, blob)| (field.clone(), blob.clone()))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Delivered to the backend immediately, as this record
    Submitted(NewFormRecord),
    /// Stored in the outbox for a later sync pass
    Queued(OutboxId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkSubmitReport {
    pub succeeded: Vec<DraftId>,
    pub failed: Vec<(DraftId, String)>,
    /// Submitted drafts that could not be deleted afterwards. They are
    /// already on the backend; submitting them again would duplicate them.
    pub cleanup_failed: Vec<(DraftId, String)>,
}

pub struct SubmissionService<B> {
    db: DatabaseService,
    outbox: Outbox<B>,
    backend: Arc<B>,
}

impl<B: ObjectStore + RecordStore> SubmissionService<B> {
    pub fn new(db: DatabaseService, outbox: Outbox<B>, backend: Arc<B>) -> Self {
        Self {
            db,
            outbox,
            backend,
        }
    }

    /// Validate and send a form, or queue it when offline.
    ///
    /// A failed direct submission returns [`Error::Upload`] or
    /// [`Error::Insert`]; it is never queued.
    pub async fn submit(
        &self,
        form: &FormSubmission,
        connectivity: Connectivity,
    ) -> Result<SubmitOutcome> {
        let schema = FormSchema::for_form_type(form.form_type);
        schema
            .validate(&form.data, &form.files)
            .map_err(Error::Validation)?;

        if connectivity.is_online() {
            let record = self.submit_direct(form).await?;
            return Ok(SubmitOutcome::Submitted(record));
        }

        let attached = form.files.values().filter(|blob| !blob.is_empty()).count();
        if attached > 1 {
            tracing::warn!(
                "Offline {} report keeps 1 of {attached} attachments",
                form.form_type
            );
        }

        let payload = SubmissionPayload::new(
            form.form_type,
            form.project_id.clone(),
            form.submitted_by_id.clone(),
            form.data.clone(),
        );
        let file = form
            .primary_file(&schema)
            .map(|(field, blob)| QueuedFile::new(Some(field), blob));
        let id = self.outbox.enqueue(&payload, file).await?;
        Ok(SubmitOutcome::Queued(id))
    }

    /// Upload every attachment, then insert the record with status Open.
    /// Returns the record as sent, attachment URLs included.
    pub async fn submit_direct(&self, form: &FormSubmission) -> Result<NewFormRecord> {
        let mut data = form.data.clone();

        for (field, blob) in form.files.iter().filter(|(_, blob)| !blob.is_empty()) {
            let path = upload_path(&form.submitted_by_id, &blob.name, unix_millis_now());
            self.backend.upload(&path, blob).await?;
            data.insert(field.clone(), Value::String(self.backend.public_url(&path)));
        }

        let record = NewFormRecord {
            form_type: form.form_type,
            project_id: form.project_id.clone(),
            submitted_by_id: form.submitted_by_id.clone(),
            data,
            status: RecordStatus::Open,
        };
        self.backend.insert_form_record(&record).await?;

        tracing::info!(
            "Submitted {} report for project {}",
            form.form_type,
            form.project_id
        );
        Ok(record)
    }

    /// Submit saved drafts directly, deleting each one that goes through.
    ///
    /// A draft whose record was inserted counts as submitted even when
    /// deleting it locally fails; that failure lands in `cleanup_failed`.
    pub async fn submit_drafts(
        &self,
        ids: &[DraftId],
        submitted_by_id: &str,
        connectivity: Connectivity,
    ) -> Result<BulkSubmitReport> {
        if !connectivity.is_online() {
            return Err(Error::Offline);
        }

        let mut report = BulkSubmitReport::default();
        for &id in ids {
            match self.submit_draft(id, submitted_by_id).await {
                Ok(()) => {
                    report.succeeded.push(id);
                    if let Err(error) = self.db.delete_draft(id).await {
                        tracing::error!("Draft {id} was submitted but not deleted: {error}");
                        report.cleanup_failed.push((id, error.to_string()));
                    }
                }
                Err(error) if error.is_local_storage() => return Err(error),
                Err(error) => {
                    tracing::warn!("Draft {id} was not submitted: {error}");
                    report.failed.push((id, error.to_string()));
                }
            }
        }
        Ok(report)
    }

    async fn submit_draft(&self, id: DraftId, submitted_by_id: &str) -> Result<()> {
        let draft = self
            .db
            .get_draft(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("draft {id}")))?;

        let form = FormSubmission::from_draft(draft, submitted_by_id);
        FormSchema::for_form_type(form.form_type)
            .validate(&form.data, &form.files)
            .map_err(Error::Validation)?;

        self.submit_direct(&form).await?;
        Ok(())
    }
}
