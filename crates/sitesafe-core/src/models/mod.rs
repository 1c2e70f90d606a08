//! Data models for SiteSafe

mod draft;
mod form;
mod outbox;
mod record;
mod user;

pub use draft::{DraftId, DraftInput, DraftRecord, DraftSummary};
pub use form::{FileBlob, FormData, FormType, SubmissionPayload};
pub use outbox::{DeadLetter, OutboxId, PendingSubmission, QueuedFile, QueuedSubmission};
pub use record::{
    FormRecord, FormRecordRow, NewFormRecord, RecordStatus, StatusUpdate, UserField, UserRef,
};
pub use user::{Project, ProjectRow, ProjectStatus, Severity, User, UserRole};
