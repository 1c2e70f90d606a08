//! Durable offline outbox with a single-flight sync pass.
//!
//! Submissions made without connectivity are written to the local database and
//! flushed later, oldest first. A failed item stays queued and is retried in
//! full on the next pass; nothing is dropped. Only a failure of the local
//! database itself is returned to the caller.


use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::db::{OutboxRepository, SqliteOutboxRepository};
use crate::models::{
    DeadLetter, FormData, FormType, NewFormRecord, OutboxId, PendingSubmission, QueuedFile,
    QueuedSubmission, RecordStatus, SubmissionPayload,
};
use crate::remote::{upload_path, ObjectStore, RecordStore};
use crate::schema::FormSchema;
use crate::services::DatabaseService;
use crate::state::StatusSnapshot;
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// Data key used when neither the item nor its form names a photo field.
pub const FALLBACK_ATTACHMENT_FIELD: &str = "attachmentUrl";

/// When a repeatedly failing item stops being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const RETRY_FOREVER: Self = Self { max_attempts: None };

    /// Park an item in the dead-letter table once it has failed `attempts` times.
    pub const fn dead_letter_after(attempts: u32) -> Self {
        let attempts = if attempts == 0 { 1 } else { attempts };
        Self {
            max_attempts: Some(attempts),
        }
    }

    const fn is_exhausted(self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts >= max,
            None => false,
        }
    }
}

/// Outcome of delivering one queued item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "error", rename_all = "snake_case")]
pub enum SyncAttemptResult {
    Success,
    FileUploadFailed(String),
    RecordInsertFailed(String),
}

impl SyncAttemptResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::FileUploadFailed(message) | Self::RecordInsertFailed(message) => Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub id: OutboxId,
    pub form_type: FormType,
    #[serde(flatten)]
    pub result: SyncAttemptResult,
    pub dead_lettered: bool,
}

/// Summary of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Failed items that were moved to the dead-letter table this pass
    pub dead_lettered: usize,
    pub outcomes: Vec<ItemOutcome>,
}

/// Field in the record data that receives the uploaded file's URL.
///
/// The item's own field wins; then the first data key mentioning "photo";
/// then the form's first photo field; then [`FALLBACK_ATTACHMENT_FIELD`].
pub fn attachment_field(form_type: FormType, explicit: Option<&str>, data: &FormData) -> String {
    if let Some(field) = explicit.filter(|field| !field.trim().is_empty()) {
        return field.to_string();
    }
    if let Some(key) = data
        .keys()
        .find(|key| key.to_ascii_lowercase().contains("photo"))
    {
        return key.clone();
    }
    FormSchema::for_form_type(form_type)
        .first_photo_field()
        .map_or_else(
            || FALLBACK_ATTACHMENT_FIELD.to_string(),
            |field| field.name.clone(),
        )
}

/// The local half of the outbox: the queue and dead-letter tables.
///
/// Needs no backend, so tools that only inspect or rearrange the queue can
/// open it without any remote configuration.
#[derive(Clone, Debug)]
pub struct OutboxStore {
    db: DatabaseService,
}

impl OutboxStore {
    pub const fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub const fn database(&self) -> &DatabaseService {
        &self.db
    }

    /// Durably queue a submission. Fails only with [`Error::Storage`].
    pub async fn enqueue(
        &self,
        payload: &SubmissionPayload,
        file: Option<QueuedFile>,
    ) -> Result<OutboxId> {
        let db = self.db.lock().await;
        let repo = SqliteOutboxRepository::new(db.connection());
        let id = repo
            .enqueue(payload, file.as_ref())
            .map_err(Error::into_storage)?;

        tracing::info!(
            "Queued {} report {id} for project {}",
            payload.form_type,
            payload.project_id
        );
        Ok(id)
    }

    /// Number of queued submissions.
    pub async fn count(&self) -> Result<usize> {
        let db = self.db.lock().await;
        SqliteOutboxRepository::new(db.connection())
            .count()
            .map_err(Error::into_storage)
    }

    /// Queued submissions in the order they will be sent.
    pub async fn pending(&self) -> Result<Vec<PendingSubmission>> {
        let db = self.db.lock().await;
        SqliteOutboxRepository::new(db.connection())
            .pending()
            .map_err(Error::into_storage)
    }

    pub async fn dead_letters(&self) -> Result<Vec<DeadLetter>> {
        let db = self.db.lock().await;
        SqliteOutboxRepository::new(db.connection())
            .dead_letters()
            .map_err(Error::into_storage)
    }

    pub async fn dead_letter_count(&self) -> Result<usize> {
        let db = self.db.lock().await;
        SqliteOutboxRepository::new(db.connection())
            .dead_letter_count()
            .map_err(Error::into_storage)
    }

    /// Move a parked submission back to the tail of the queue.
    pub async fn requeue_dead_letter(&self, id: OutboxId) -> Result<OutboxId> {
        let db = self.db.lock().await;
        let new_id = SqliteOutboxRepository::new(db.connection()).requeue_dead_letter(id)?;
        tracing::info!("Requeued dead letter {id} as {new_id}");
        Ok(new_id)
    }

    /// Queue depth, dead letters and quarantined backups as a snapshot.
    pub async fn snapshot(&self, online: bool, syncing: bool) -> Result<StatusSnapshot> {
        let pending = self.count().await?;
        let dead_letters = self.dead_letter_count().await?;
        Ok(StatusSnapshot::new(online, pending, dead_letters, syncing)
            .with_quarantined(self.db.quarantined_backups().len()))
    }
}

/// The offline queue and its sync process.
pub struct Outbox<B> {
    store: OutboxStore,
    backend: Arc<B>,
    policy: RetryPolicy,
    pass_lock: Arc<Mutex<()>>,
}

impl<B> Clone for Outbox<B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            backend: Arc::clone(&self.backend),
            policy: self.policy,
            pass_lock: Arc::clone(&self.pass_lock),
        }
    }
}

impl<B: ObjectStore + RecordStore> Outbox<B> {
    pub fn new(db: DatabaseService, backend: Arc<B>) -> Self {
        Self {
            store: OutboxStore::new(db),
            backend,
            policy: RetryPolicy::RETRY_FOREVER,
            pass_lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn store(&self) -> &OutboxStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn enqueue(
        &self,
        payload: &SubmissionPayload,
        file: Option<QueuedFile>,
    ) -> Result<OutboxId> {
        self.store.enqueue(payload, file).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    pub async fn pending(&self) -> Result<Vec<PendingSubmission>> {
        self.store.pending().await
    }

    pub async fn dead_letters(&self) -> Result<Vec<DeadLetter>> {
        self.store.dead_letters().await
    }

    pub async fn dead_letter_count(&self) -> Result<usize> {
        self.store.dead_letter_count().await
    }

    pub async fn requeue_dead_letter(&self, id: OutboxId) -> Result<OutboxId> {
        self.store.requeue_dead_letter(id).await
    }

    /// Whether a sync pass is running right now.
    pub fn is_syncing(&self) -> bool {
        self.pass_lock.try_lock().is_err()
    }

    /// Flush every queued item. Waits for a running pass to finish first.
    pub async fn sync(&self) -> Result<SyncReport> {
        let _pass = self.pass_lock.lock().await;
        self.run_pass().await
    }

    /// Flush every queued item unless a pass is already running, in which
    /// case return `None` without doing anything.
    pub async fn try_sync(&self) -> Result<Option<SyncReport>> {
        let Ok(_pass) = self.pass_lock.try_lock() else {
            tracing::debug!("Sync pass already running; skipping");
            return Ok(None);
        };
        self.run_pass().await.map(Some)
    }

    async fn run_pass(&self) -> Result<SyncReport> {
        let ids = {
            let db = self.store.db.lock().await;
            SqliteOutboxRepository::new(db.connection())
                .queued_ids()
                .map_err(Error::into_storage)?
        };

        let mut report = SyncReport::default();
        if ids.is_empty() {
            return Ok(report);
        }
        tracing::info!("Syncing {} queued report(s)", ids.len());

        for id in ids {
            let item = {
                let db = self.store.db.lock().await;
                SqliteOutboxRepository::new(db.connection())
                    .get(id)
                    .map_err(Error::into_storage)?
            };
            let Some(item) = item else {
                continue;
            };

            let result = self.deliver(&item).await;
            let dead_lettered = self.settle(&item, &result).await?;

            if result.is_success() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
            if dead_lettered {
                report.dead_lettered += 1;
            }
            report.outcomes.push(ItemOutcome {
                id,
                form_type: item.payload.form_type,
                result,
                dead_lettered,
            });
        }

        tracing::info!(
            "Sync pass finished: {} succeeded, {} failed",
            report.succeeded,
            report.failed
        );
        Ok(report)
    }

    /// Upload the item's file, then insert its record.
    async fn deliver(&self, item: &QueuedSubmission) -> SyncAttemptResult {
        let payload = &item.payload;
        let mut data = payload.data.clone();

        if let Some(file) = &item.file {
            let path = upload_path(&payload.submitted_by_id, &file.blob.name, unix_millis_now());
            if let Err(error) = self.backend.upload(&path, &file.blob).await {
                return SyncAttemptResult::FileUploadFailed(error.to_string());
            }
            tracing::debug!("Uploaded attachment for outbox item {}", item.id);

            let field = attachment_field(payload.form_type, file.field.as_deref(), &data);
            data.insert(field, Value::String(self.backend.public_url(&path)));
        }

        let record = NewFormRecord {
            form_type: payload.form_type,
            project_id: payload.project_id.clone(),
            submitted_by_id: payload.submitted_by_id.clone(),
            data,
            status: RecordStatus::Open,
        };
        match self.backend.insert_form_record(&record).await {
            Ok(()) => SyncAttemptResult::Success,
            Err(error) => SyncAttemptResult::RecordInsertFailed(error.to_string()),
        }
    }

    /// Apply a delivery result to the local queue. Returns whether the item
    /// was dead-lettered.
    async fn settle(&self, item: &QueuedSubmission, result: &SyncAttemptResult) -> Result<bool> {
        let db = self.store.db.lock().await;
        let repo = SqliteOutboxRepository::new(db.connection());

        let Some(message) = result.error_message() else {
            repo.remove(item.id).map_err(Error::into_storage)?;
            tracing::debug!("Delivered outbox item {}", item.id);
            return Ok(false);
        };

        let attempts = repo
            .record_failure(item.id, message)
            .map_err(Error::into_storage)?;
        tracing::warn!(
            "Outbox item {} ({}) failed on attempt {attempts}: {message}",
            item.id,
            item.payload.form_type
        );

        if !self.policy.is_exhausted(attempts) {
            return Ok(false);
        }
        repo.dead_letter(item.id).map_err(Error::into_storage)?;
        tracing::warn!(
            "Outbox item {} moved to dead letters after {attempts} attempts",
            item.id
        );
        Ok(true)
    }
}
