//! User and project models

use serde::{Deserialize, Serialize};

use super::record::{UserField, UserRef};

/// Role assigned at sign-up; decides which dashboard a user lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "Site Safety Officer")]
    SiteSafetyOfficer,
    #[serde(rename = "HO middle Managers")]
    HoMiddleManager,
    #[serde(rename = "Top Managers")]
    TopManager,
    #[serde(rename = "Workers")]
    Worker,
}

/// A user profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub employee_id: String,
    #[serde(default)]
    pub emergency_contact: String,
    pub role: UserRole,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProjectStatus {
    #[default]
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Severity {
    #[default]
    Safe,
    Medium,
    Critical,
}

/// A construction project that reports are filed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub status: ProjectStatus,
    pub severity: Severity,
    pub location: String,
    pub department: String,
    pub created_by: UserRef,
    pub created_at: String,
}

/// Wire shape of a `projects` row before the creator is resolved.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub department: String,
    pub created_by: UserField,
    pub created_at: String,
}

impl ProjectRow {
    pub fn resolve(self, lookup: impl Fn(&str) -> Option<String>) -> Project {
        Project {
            id: self.id,
            name: self.name,
            project_id: self.project_id,
            status: self.status,
            severity: self.severity,
            location: self.location,
            department: self.department,
            created_by: self.created_by.resolve(lookup),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_role_uses_backend_labels() {
        let role: UserRole = serde_json::from_str("\"HO middle Managers\"").unwrap();
        assert_eq!(role, UserRole::HoMiddleManager);
        assert_eq!(
            serde_json::to_string(&UserRole::Worker).unwrap(),
            "\"Workers\""
        );
    }

    #[test]
    fn project_row_resolves_bare_creator_id() {
        let row: ProjectRow = serde_json::from_str(
            r#"{
                "id": "p1",
                "name": "Metro Line 4",
                "project_id": "ML4",
                "status": "Completed",
                "severity": "Critical",
                "location": "Hyderabad",
                "department": "Civil",
                "created_by": "user-9",
                "created_at": "2026-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        let project = row.resolve(|_| Some("Meera Iyer".to_string()));
        assert_eq!(project.created_by, UserRef::new("user-9", "Meera Iyer"));
        assert_eq!(project.severity, Severity::Critical);
    }
}
