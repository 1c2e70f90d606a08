//! Remote backend seams and the hosted implementation.

pub mod auth;
mod supabase;

#[cfg(test)]
pub(crate) mod memory;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::models::{FileBlob, FormRecord, NewFormRecord, Project, StatusUpdate};
use crate::util::{compact_text, sanitize_file_name};
use crate::Result;

pub use supabase::SupabaseBackend;

/// Remote tables the app reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Projects,
    FormRecords,
    Users,
    TrainingMaterials,
    Notifications,
    SafetyDrills,
    WorkerDrills,
}

impl Table {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::FormRecords => "form_records",
            Self::Users => "users",
            Self::TrainingMaterials => "training_materials",
            Self::Notifications => "notifications",
            Self::SafetyDrills => "safety_drills",
            Self::WorkerDrills => "worker_drills",
        }
    }
}

/// Blob storage for report attachments.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Store `blob` at `path`. Fails with [`crate::Error::Upload`].
    async fn upload(&self, path: &str, blob: &FileBlob) -> Result<()>;

    /// Publicly readable URL for an object path.
    fn public_url(&self, path: &str) -> String;
}

/// Structured record storage.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Insert one form record. Fails with [`crate::Error::Insert`].
    async fn insert_form_record(&self, record: &NewFormRecord) -> Result<()>;
}

/// Reports already on the backend, as reviewers see them.
#[allow(async_fn_in_trait)]
pub trait RecordReview {
    /// Projects, newest first.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Form records, newest first, optionally restricted to one project.
    async fn list_form_records(&self, project_id: Option<&str>) -> Result<Vec<FormRecord>>;

    async fn fetch_form_record(&self, record_id: &str) -> Result<Option<FormRecord>>;

    /// Append `update` to the record's history, move it to the update's
    /// status and persist both.
    async fn update_record_status(&self, record: &mut FormRecord, update: StatusUpdate)
        -> Result<()>;

    async fn delete_form_record(&self, record_id: &str) -> Result<()>;
}

/// Object path for a report attachment:
/// `uploads/{submitted_by_id}/{timestamp_ms}_{sanitized name}`.
pub fn upload_path(submitted_by_id: &str, file_name: &str, timestamp_ms: i64) -> String {
    format!(
        "uploads/{submitted_by_id}/{timestamp_ms}_{}",
        sanitize_file_name(file_name)
    )
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

/// Render a backend error body as `message (status)`.
pub(crate) fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_path_sanitizes_file_name() {
        assert_eq!(
            upload_path("user-1", "site photo.jpg", 1_700_000_000_000),
            "uploads/user-1/1700000000000_site_photo.jpg"
        );
    }

    #[test]
    fn parse_api_error_prefers_message_fields() {
        let message = parse_api_error(
            StatusCode::FORBIDDEN,
            r#"{"message":"new row violates row-level security policy"}"#,
        );
        assert_eq!(message, "new row violates row-level security policy (403)");
    }

    #[test]
    fn parse_api_error_falls_back_to_body_or_status() {
        assert_eq!(
            parse_api_error(StatusCode::PAYLOAD_TOO_LARGE, "quota exceeded"),
            "quota exceeded (413)"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "  "),
            "HTTP 502"
        );
    }
}
