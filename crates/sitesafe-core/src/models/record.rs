//! Structured form record model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::form::{FormData, FormType};
use crate::error::Error;

/// Lifecycle status of a submitted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecordStatus {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Closed,
}

impl RecordStatus {
    pub const ALL: [Self; 3] = [Self::Open, Self::InProgress, Self::Closed];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = Error;

    /// Accepts the display label in any case, with `-` or `_` for spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown record status: {}", s.trim())))
    }
}

/// A resolved reference to a user: always carries both id and display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub full_name: String,
}

impl UserRef {
    /// Display name used when a reference cannot be resolved.
    pub const UNKNOWN_NAME: &'static str = "Unknown user";

    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
        }
    }
}

/// A user reference as the backend returns it: a bare id for plain selects,
/// an expanded object when the query joins the users table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UserField {
    Expanded {
        id: String,
        #[serde(default)]
        full_name: Option<String>,
    },
    Id(String),
}

impl UserField {
    /// Resolve to a [`UserRef`], consulting `lookup` for a display name
    /// when the backend only returned the identifier.
    pub fn resolve(self, lookup: impl Fn(&str) -> Option<String>) -> UserRef {
        let (id, full_name) = match self {
            Self::Expanded { id, full_name } => (id, full_name),
            Self::Id(id) => (id, None),
        };
        let full_name = full_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| lookup(&id))
            .unwrap_or_else(|| UserRef::UNKNOWN_NAME.to_string());
        UserRef { id, full_name }
    }
}

/// One entry in a report's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub updated_by: String,
    pub timestamp: String,
    pub status: RecordStatus,
    pub notes: String,
}

impl StatusUpdate {
    pub fn now(updated_by: impl Into<String>, status: RecordStatus, notes: impl Into<String>) -> Self {
        Self {
            updated_by: updated_by.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            status,
            notes: notes.into(),
        }
    }
}

/// A structured record ready to be inserted into the `form_records` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFormRecord {
    pub form_type: FormType,
    pub project_id: String,
    pub submitted_by_id: String,
    pub data: FormData,
    pub status: RecordStatus,
}

/// A report as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormRecord {
    pub id: String,
    pub form_type: FormType,
    pub project_id: String,
    pub submitted_by: UserRef,
    pub data: FormData,
    pub submitted_at: String,
    pub status: RecordStatus,
    pub updates: Vec<StatusUpdate>,
}

impl FormRecord {
    /// Append a status update and move the record to its status.
    pub fn apply_status_update(&mut self, update: StatusUpdate) {
        self.status = update.status;
        self.updates.push(update);
    }
}

/// Wire shape of a `form_records` row before the submitter is resolved.
#[derive(Debug, Clone, Deserialize)]
pub struct FormRecordRow {
    pub id: String,
    pub form_type: FormType,
    pub project_id: String,
    pub submitted_by_id: UserField,
    #[serde(default)]
    pub data: FormData,
    pub submitted_at: String,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub updates: Option<Vec<StatusUpdate>>,
}

impl FormRecordRow {
    pub fn resolve(self, lookup: impl Fn(&str) -> Option<String>) -> FormRecord {
        FormRecord {
            id: self.id,
            form_type: self.form_type,
            project_id: self.project_id,
            submitted_by: self.submitted_by_id.resolve(lookup),
            data: self.data,
            submitted_at: self.submitted_at,
            status: self.status,
            updates: self.updates.unwrap_or_default(),
        }
    }
}
