//! Typed form schemas and schema-driven validation.
//!
//! Every [`FormType`] has a fixed list of [`FieldSpec`]s. The field kind is a
//! closed enum, so validation and prefilling branch on the kind rather than
//! on field-name strings.

mod builtin;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value;

use crate::models::{FileBlob, FormData, FormType};

/// Name of the field whose options are filled from the project list.
pub const PROJECT_FIELD: &str = "project";

/// The kinds of input a form field can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Select(Vec<String>),
    /// `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM`
    Date,
    /// A file upload; the stored value is the public URL
    Photo,
    /// Generated by the app, never typed by the user
    ReadOnly,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub placeholder: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            placeholder: None,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
}

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&rendered)
    }
}

/// The field layout of one form type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSchema {
    pub form_type: FormType,
    pub fields: Vec<FieldSpec>,
}

impl FormSchema {
    /// Built-in schema for `form_type`. Modules without a layout yet get an
    /// empty schema.
    pub fn for_form_type(form_type: FormType) -> Self {
        Self {
            form_type,
            fields: builtin::fields(form_type),
        }
    }

    /// Whether the module has any fields to fill in.
    pub fn is_configured(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// First field of kind [`FieldKind::Photo`], if any.
    pub fn first_photo_field(&self) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|field| field.kind == FieldKind::Photo)
    }

    /// Replace the options of the project selector with live project names.
    #[must_use]
    pub fn with_project_options(mut self, project_names: &[String]) -> Self {
        for field in &mut self.fields {
            if field.name == PROJECT_FIELD {
                field.kind = FieldKind::Select(project_names.to_vec());
            }
        }
        self
    }

    /// Values a blank form starts with: generated report ids, the author's
    /// name, and the current time for date fields.
    ///
    /// Date fields show the wall-clock time of `now`; report ids use its
    /// Unix milliseconds, so they do not depend on the device's offset.
    pub fn initial_values<Tz: TimeZone>(&self, author_name: &str, now: &DateTime<Tz>) -> FormData {
        let local = now.naive_local();
        let mut data = FormData::new();
        for field in &self.fields {
            let value = match field.kind {
                FieldKind::ReadOnly => {
                    let lowered = field.name.to_ascii_lowercase();
                    if lowered.contains("id") {
                        format!(
                            "{}{}",
                            self.form_type.id_prefix(),
                            now.timestamp_millis()
                        )
                    } else if lowered.contains("by") {
                        author_name.to_string()
                    } else {
                        String::new()
                    }
                }
                FieldKind::Date => local.format("%Y-%m-%dT%H:%M").to_string(),
                _ => String::new(),
            };
            data.insert(field.name.clone(), Value::String(value));
        }
        data
    }

    /// Check `data` (and the files attached alongside it) against the schema.
    pub fn validate(
        &self,
        data: &FormData,
        files: &BTreeMap<String, FileBlob>,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        for field in &self.fields {
            let value = data.get(&field.name).filter(|value| !is_blank(value));
            let has_file = files.get(&field.name).is_some_and(|blob| !blob.is_empty());

            let Some(value) = value else {
                if field.required && !(field.kind == FieldKind::Photo && has_file) {
                    errors.insert(&field.name, "This field is required");
                }
                continue;
            };

            if let Some(message) = check_kind(&field.kind, value) {
                errors.insert(&field.name, message);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn check_kind(kind: &FieldKind, value: &Value) -> Option<String> {
    match kind {
        FieldKind::Select(options) => {
            let text = value.as_str()?;
            if options.is_empty() || options.iter().any(|option| option == text) {
                None
            } else {
                Some(format!("'{text}' is not one of the allowed options"))
            }
        }
        FieldKind::Number => {
            let numeric = value.is_number()
                || value
                    .as_str()
                    .is_some_and(|text| text.trim().parse::<f64>().is_ok());
            (!numeric).then(|| "Must be a number".to_string())
        }
        FieldKind::Date => {
            let Some(text) = value.as_str() else {
                return Some("Must be a date".to_string());
            };
            (!is_valid_date(text.trim())).then(|| "Must be a date (YYYY-MM-DD)".to_string())
        }
        FieldKind::Text | FieldKind::TextArea | FieldKind::Photo | FieldKind::ReadOnly => None,
    }
}

fn is_valid_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use serde_json::json;

    fn near_miss_data() -> FormData {
        let Value::Object(data) = json!({
            "reportId": "NEA1",
            "reportedBy": "Asha Rao",
            "date": "2026-10-18T09:30",
            "location": "Tower B, level 4",
            "description": "Unsecured plank fell from scaffold",
            "potentialSeverity": "High",
        }) else {
            unreachable!()
        };
        data
    }

    #[test]
    fn every_form_type_has_a_schema() {
        for form_type in FormType::ALL {
            let schema = FormSchema::for_form_type(form_type);
            assert_eq!(schema.form_type, form_type);
        }
        assert!(FormSchema::for_form_type(FormType::NearMissReports).is_configured());
        assert!(!FormSchema::for_form_type(FormType::Reports).is_configured());
    }

    #[test]
    fn valid_data_passes() {
        let schema = FormSchema::for_form_type(FormType::NearMissReports);
        assert!(schema.validate(&near_miss_data(), &BTreeMap::new()).is_ok());
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let schema = FormSchema::for_form_type(FormType::NearMissReports);
        let mut data = near_miss_data();
        data.remove("location");
        data.insert("description".into(), json!("   "));

        let errors = schema.validate(&data, &BTreeMap::new()).unwrap_err();
        assert_eq!(errors.get("location"), Some("This field is required"));
        assert_eq!(errors.get("description"), Some("This field is required"));
        assert_eq!(errors.fields().count(), 2);
    }

    #[test]
    fn select_number_and_date_kinds_are_checked() {
        let schema = FormSchema::for_form_type(FormType::NearMissReports);
        let mut data = near_miss_data();
        data.insert("potentialSeverity".into(), json!("Catastrophic"));
        data.insert("date".into(), json!("18/10/2026"));

        let errors = schema.validate(&data, &BTreeMap::new()).unwrap_err();
        assert!(errors.get("potentialSeverity").is_some());
        assert!(errors.get("date").is_some());

        let training = FormSchema::for_form_type(FormType::DailyTrainingTalks);
        let Value::Object(talk) = json!({
            "date": "2026-10-18",
            "topic": "Working at height",
            "attendees": "twelve",
        }) else {
            unreachable!()
        };
        let errors = training.validate(&talk, &BTreeMap::new()).unwrap_err();
        assert_eq!(errors.get("attendees"), Some("Must be a number"));
    }

    #[test]
    fn required_photo_is_satisfied_by_attached_file() {
        let schema = FormSchema::for_form_type(FormType::Rectifications);
        let Value::Object(data) = json!({
            "date": "2026-10-18",
            "issueDescription": "Missing guard rail",
            "actionTaken": "Rail installed",
        }) else {
            unreachable!()
        };

        let errors = schema.validate(&data, &BTreeMap::new()).unwrap_err();
        assert!(errors.get("beforePhoto").is_some());

        let mut files = BTreeMap::new();
        files.insert(
            "beforePhoto".to_string(),
            FileBlob::new("before.jpg", None, vec![0xFF, 0xD8]),
        );
        assert!(schema.validate(&data, &files).is_ok());
    }

    #[test]
    fn project_options_come_from_live_projects() {
        let schema = FormSchema::for_form_type(FormType::SafetyObservations)
            .with_project_options(&["Metro Line 4".to_string()]);
        assert_eq!(
            schema.field(PROJECT_FIELD).map(|field| &field.kind),
            Some(&FieldKind::Select(vec!["Metro Line 4".to_string()]))
        );
    }

    #[test]
    fn initial_values_prefill_generated_fields() {
        let schema = FormSchema::for_form_type(FormType::NearMissReports);
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let data = schema.initial_values("Asha Rao", &now);

        assert!(data["reportId"].as_str().unwrap().starts_with("NEA"));
        assert_eq!(data["reportedBy"], "Asha Rao");
        assert_eq!(data["date"], "2026-10-18T09:30");
        assert_eq!(data["location"], "");
    }

    #[test]
    fn report_ids_use_unix_time_and_dates_use_wall_clock() {
        let schema = FormSchema::for_form_type(FormType::NearMissReports);
        let india = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let now = india.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let data = schema.initial_values("Asha Rao", &now);

        assert_eq!(data["date"], "2026-10-18T09:30");
        let utc_ms = Utc
            .with_ymd_and_hms(2026, 10, 18, 4, 0, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(data["reportId"], format!("NEA{utc_ms}"));
    }
}
