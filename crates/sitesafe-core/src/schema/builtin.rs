//! Built-in field layouts for each safety module.

use super::{FieldKind, FieldSpec, PROJECT_FIELD};
use crate::models::FormType;

fn select(options: &[&str]) -> FieldKind {
    FieldKind::Select(options.iter().map(ToString::to_string).collect())
}

fn severity() -> FieldKind {
    select(&["Low", "Medium", "High"])
}

pub(super) fn fields(form_type: FormType) -> Vec<FieldSpec> {
    use FieldKind::{Date, Number, Photo, ReadOnly, Text, TextArea};

    match form_type {
        FormType::SafetyObservations => vec![
            FieldSpec::new("observationId", "Observation ID", ReadOnly),
            FieldSpec::new("observedBy", "Observed By", ReadOnly),
            FieldSpec::new(PROJECT_FIELD, "Project", FieldKind::Select(Vec::new())).required(),
            FieldSpec::new("date", "Date & Time", Date).required(),
            FieldSpec::new("location", "Location", Text)
                .required()
                .placeholder("e.g. Block A, 3rd floor"),
            FieldSpec::new(
                "category",
                "Category",
                select(&["Unsafe Act", "Unsafe Condition", "Positive Observation"]),
            )
            .required(),
            FieldSpec::new("severity", "Severity", severity()).required(),
            FieldSpec::new("description", "Description", TextArea).required(),
            FieldSpec::new("correctiveAction", "Corrective Action", TextArea),
            FieldSpec::new("beforePhoto", "Before Photo", Photo),
            FieldSpec::new("afterPhoto", "After Photo", Photo),
        ],
        FormType::InductionTraining => vec![
            FieldSpec::new("trainingId", "Training ID", ReadOnly),
            FieldSpec::new("conductedBy", "Conducted By", ReadOnly),
            FieldSpec::new("date", "Date", Date).required(),
            FieldSpec::new("traineeName", "Trainee Name", Text).required(),
            FieldSpec::new("traineeEmployeeId", "Trainee Employee ID", Text).required(),
            FieldSpec::new("trade", "Trade", Text),
            FieldSpec::new("durationHours", "Duration (hours)", Number).required(),
            FieldSpec::new("photo", "Photo", Photo),
        ],
        FormType::DailyTrainingTalks | FormType::PepTalks => vec![
            FieldSpec::new("talkId", "Talk ID", ReadOnly),
            FieldSpec::new("conductedBy", "Conducted By", ReadOnly),
            FieldSpec::new("date", "Date", Date).required(),
            FieldSpec::new("topic", "Topic", Text).required(),
            FieldSpec::new("attendees", "Number of Attendees", Number).required(),
            FieldSpec::new("photo", "Photo", Photo),
        ],
        FormType::SpecialTechnicalTraining => vec![
            FieldSpec::new("trainingId", "Training ID", ReadOnly),
            FieldSpec::new("conductedBy", "Conducted By", ReadOnly),
            FieldSpec::new("date", "Date", Date).required(),
            FieldSpec::new("subject", "Subject", Text).required(),
            FieldSpec::new("trainer", "Trainer", Text).required(),
            FieldSpec::new("attendees", "Number of Attendees", Number).required(),
            FieldSpec::new("photo", "Photo", Photo),
        ],
        FormType::FirstAidCases => vec![
            FieldSpec::new("caseId", "Case ID", ReadOnly),
            FieldSpec::new("reportedBy", "Reported By", ReadOnly),
            FieldSpec::new("date", "Date & Time", Date).required(),
            FieldSpec::new("injuredPerson", "Injured Person", Text).required(),
            FieldSpec::new(
                "injuryType",
                "Injury Type",
                select(&["Cut", "Burn", "Fracture", "Sprain", "Other"]),
            )
            .required(),
            FieldSpec::new("treatment", "Treatment Given", TextArea).required(),
            FieldSpec::new("photo", "Photo", Photo),
        ],
        FormType::SafetyAdvisory => vec![
            FieldSpec::new("advisoryId", "Advisory ID", ReadOnly),
            FieldSpec::new("issuedBy", "Issued By", ReadOnly),
            FieldSpec::new("date", "Date", Date).required(),
            FieldSpec::new("subject", "Subject", Text).required(),
            FieldSpec::new("details", "Details", TextArea).required(),
        ],
        FormType::StopWorkOrders => vec![
            FieldSpec::new("orderId", "Order ID", ReadOnly),
            FieldSpec::new("issuedBy", "Issued By", ReadOnly),
            FieldSpec::new("date", "Date & Time", Date).required(),
            FieldSpec::new("area", "Work Area", Text).required(),
            FieldSpec::new("reason", "Reason", TextArea).required(),
            FieldSpec::new("severity", "Severity", severity()).required(),
            FieldSpec::new("photo", "Photo", Photo),
        ],
        FormType::Rectifications => vec![
            FieldSpec::new("rectificationId", "Rectification ID", ReadOnly),
            FieldSpec::new("date", "Date", Date).required(),
            FieldSpec::new("issueDescription", "Issue", TextArea).required(),
            FieldSpec::new("actionTaken", "Action Taken", TextArea).required(),
            FieldSpec::new("beforePhoto", "Before Photo", Photo).required(),
            FieldSpec::new("afterPhoto", "After Photo", Photo),
        ],
        FormType::NearMissReports => vec![
            FieldSpec::new("reportId", "Report ID", ReadOnly),
            FieldSpec::new("reportedBy", "Reported By", ReadOnly),
            FieldSpec::new("date", "Date & Time", Date).required(),
            FieldSpec::new("location", "Location", Text).required(),
            FieldSpec::new("description", "What happened?", TextArea).required(),
            FieldSpec::new("potentialSeverity", "Potential Severity", severity()).required(),
            FieldSpec::new("immediateAction", "Immediate Action", TextArea),
            FieldSpec::new("photo", "Photo", Photo),
        ],
        FormType::DangerousOccurrences => vec![
            FieldSpec::new("occurrenceId", "Occurrence ID", ReadOnly),
            FieldSpec::new("reportedBy", "Reported By", ReadOnly),
            FieldSpec::new("date", "Date & Time", Date).required(),
            FieldSpec::new("location", "Location", Text).required(),
            FieldSpec::new("description", "Description", TextArea).required(),
            FieldSpec::new("equipmentInvolved", "Equipment Involved", Text),
            FieldSpec::new("photo", "Photo", Photo),
        ],
        FormType::SicMeetings => vec![
            FieldSpec::new("meetingId", "Meeting ID", ReadOnly),
            FieldSpec::new("chairedBy", "Chaired By", ReadOnly),
            FieldSpec::new("date", "Date", Date).required(),
            FieldSpec::new("attendees", "Number of Attendees", Number).required(),
            FieldSpec::new("minutes", "Minutes", TextArea).required(),
        ],
        FormType::GoodPractices => vec![
            FieldSpec::new("practiceId", "Practice ID", ReadOnly),
            FieldSpec::new("observedBy", "Observed By", ReadOnly),
            FieldSpec::new("date", "Date", Date).required(),
            FieldSpec::new("description", "Description", TextArea).required(),
            FieldSpec::new("photo", "Photo", Photo),
        ],
        FormType::Reports => Vec::new(),
    }
}
