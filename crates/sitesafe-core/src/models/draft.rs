//! Local draft model

use std::collections::BTreeMap;

use serde::Serialize;

use super::form::{FileBlob, FormData, FormType};

/// Local autoincrement draft identifier.
pub type DraftId = i64;

/// An incomplete form saved on this device.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRecord {
    pub id: DraftId,
    pub form_type: FormType,
    pub project_id: String,
    pub data: FormData,
    /// Files attached so far, keyed by form field
    pub files: BTreeMap<String, FileBlob>,
    /// Last save timestamp (Unix ms)
    pub saved_at: i64,
}

/// Draft contents supplied by the caller when saving.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftInput {
    pub form_type: FormType,
    pub project_id: String,
    pub data: FormData,
    pub files: BTreeMap<String, FileBlob>,
}

impl DraftInput {
    pub fn new(form_type: FormType, project_id: impl Into<String>, data: FormData) -> Self {
        Self {
            form_type,
            project_id: project_id.into(),
            data,
            files: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, field: impl Into<String>, blob: FileBlob) -> Self {
        self.files.insert(field.into(), blob);
        self
    }
}

/// Row for draft listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftSummary {
    pub id: DraftId,
    pub form_type: FormType,
    pub project_id: String,
    pub file_count: usize,
    pub saved_at: i64,
}

impl From<&DraftRecord> for DraftSummary {
    fn from(draft: &DraftRecord) -> Self {
        Self {
            id: draft.id,
            form_type: draft.form_type,
            project_id: draft.project_id.clone(),
            file_count: draft.files.len(),
            saved_at: draft.saved_at,
        }
    }
}
