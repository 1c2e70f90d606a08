//! Form submission model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Field name to value mapping captured by a form.
pub type FormData = serde_json::Map<String, serde_json::Value>;

/// The safety modules a report can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormType {
    #[serde(rename = "Safety Observations")]
    SafetyObservations,
    #[serde(rename = "Induction Training")]
    InductionTraining,
    #[serde(rename = "Daily Training Talks")]
    DailyTrainingTalks,
    #[serde(rename = "First Aid Cases")]
    FirstAidCases,
    #[serde(rename = "PEP Talks")]
    PepTalks,
    #[serde(rename = "Special Technical Training")]
    SpecialTechnicalTraining,
    #[serde(rename = "Safety Advisory")]
    SafetyAdvisory,
    #[serde(rename = "Stop Work Orders")]
    StopWorkOrders,
    #[serde(rename = "Rectifications")]
    Rectifications,
    #[serde(rename = "Near Miss Reports")]
    NearMissReports,
    #[serde(rename = "Dangerous Occurrences")]
    DangerousOccurrences,
    #[serde(rename = "SIC Meetings")]
    SicMeetings,
    #[serde(rename = "Good Practices")]
    GoodPractices,
    #[serde(rename = "Reports")]
    Reports,
}

impl FormType {
    /// Every form type, in module-menu order.
    pub const ALL: [Self; 14] = [
        Self::SafetyObservations,
        Self::InductionTraining,
        Self::DailyTrainingTalks,
        Self::FirstAidCases,
        Self::PepTalks,
        Self::SpecialTechnicalTraining,
        Self::SafetyAdvisory,
        Self::StopWorkOrders,
        Self::Rectifications,
        Self::NearMissReports,
        Self::DangerousOccurrences,
        Self::SicMeetings,
        Self::GoodPractices,
        Self::Reports,
    ];

    /// Display name, also used as the stored and wire value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SafetyObservations => "Safety Observations",
            Self::InductionTraining => "Induction Training",
            Self::DailyTrainingTalks => "Daily Training Talks",
            Self::FirstAidCases => "First Aid Cases",
            Self::PepTalks => "PEP Talks",
            Self::SpecialTechnicalTraining => "Special Technical Training",
            Self::SafetyAdvisory => "Safety Advisory",
            Self::StopWorkOrders => "Stop Work Orders",
            Self::Rectifications => "Rectifications",
            Self::NearMissReports => "Near Miss Reports",
            Self::DangerousOccurrences => "Dangerous Occurrences",
            Self::SicMeetings => "SIC Meetings",
            Self::GoodPractices => "Good Practices",
            Self::Reports => "Reports",
        }
    }

    /// Three-letter upper-case prefix used for generated report identifiers.
    pub fn id_prefix(self) -> String {
        self.as_str()
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .take(3)
            .collect::<String>()
            .to_uppercase()
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|form_type| form_type.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown form type: {wanted}")))
    }
}

/// A binary file attached to a form, held in memory until uploaded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBlob {
    /// Original file name
    pub name: String,
    /// MIME type, when known
    pub content_type: Option<String>,
    /// Raw bytes
    pub bytes: Vec<u8>,
}

impl FileBlob {
    pub fn new(
        name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for FileBlob {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FileBlob")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The structured part of a submission: what was filed, where, and by whom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub form_type: FormType,
    pub project_id: String,
    pub submitted_by_id: String,
    pub data: FormData,
}

impl SubmissionPayload {
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
        }
    }
}
