//! Services shared by every SiteSafe front end.

mod app;
mod database;
mod submission;

pub use app::SafetyApp;
pub use database::DatabaseService;
pub use submission::{BulkSubmitReport, FormSubmission, SubmissionService, SubmitOutcome};
