use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use pretty_assertions::assert_eq;
use serde_json::json;
use sitesafe_core::models::{
    FormRecord, FormType, OutboxId, RecordStatus, SubmissionPayload, UserRef,
};
use sitesafe_core::outbox::ItemOutcome;
use sitesafe_core::{RetryPolicy, SyncAttemptResult, SyncReport};
use tempfile::tempdir;

use crate::cli::{Cli, Commands, DeadLetterCommands, DraftCommands, RecordCommands};
use crate::commands::common::{
    format_relative_time, format_timestamp, open_local, parse_file_arg, parse_form_data,
    parse_retry_policy, read_attachment, resolve_db_path,
};
use crate::commands::dead_letters::run_dead_letters;
use crate::commands::drafts::run_list_drafts;
use crate::commands::pending::{format_pending_line, run_pending, PendingItem};
use crate::commands::records::format_record_line;
use crate::commands::status::run_status;
use crate::commands::sync::format_sync_report_lines;
use crate::error::CliError;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn submit_accepts_repeated_files_and_global_offline() {
    let cli = Cli::try_parse_from([
        "sitesafe",
        "submit",
        "--form-type",
        "first aid cases",
        "--project",
        "proj-1",
        "--data",
        "{}",
        "--file",
        "photo=cut.jpg",
        "--file",
        "report=notes.pdf",
        "--offline",
    ])
    .unwrap();

    assert!(cli.offline);
    let Commands::Submit {
        form_type,
        files,
        draft,
        ..
    } = cli.command
    else {
        panic!("expected submit");
    };
    assert_eq!(form_type, FormType::FirstAidCases);
    assert_eq!(files, vec!["photo=cut.jpg", "report=notes.pdf"]);
    assert!(!draft);
}

#[test]
fn unknown_form_type_is_rejected_at_parse_time() {
    let result = Cli::try_parse_from([
        "sitesafe",
        "submit",
        "--form-type",
        "Incident Cats",
        "--project",
        "proj-1",
        "--data",
        "{}",
    ]);
    assert!(result.is_err());
}

#[test]
fn draft_and_dead_letter_ids_are_typed() {
    let cli = Cli::try_parse_from(["sitesafe", "drafts", "delete", "3", "7"]).unwrap();
    let Commands::Drafts {
        command: DraftCommands::Delete { ids },
    } = cli.command
    else {
        panic!("expected drafts delete");
    };
    assert_eq!(ids, vec![3, 7]);

    let cli = Cli::try_parse_from(["sitesafe", "dead-letters", "requeue", "12"]).unwrap();
    let Commands::DeadLetters {
        command: DeadLetterCommands::Requeue { id },
    } = cli.command
    else {
        panic!("expected dead-letters requeue");
    };
    assert_eq!(id, OutboxId::new(12));

    assert!(Cli::try_parse_from(["sitesafe", "drafts", "submit"]).is_err());
}

#[test]
fn resolve_db_path_prefers_explicit_path() {
    let explicit = PathBuf::from("/tmp/site/sitesafe.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())).unwrap(), explicit);
}

#[test]
fn parse_form_data_reads_inline_json_and_files() {
    let data = parse_form_data(r#"{"injuredPerson":"Ravi Kumar"}"#).unwrap();
    assert_eq!(data["injuredPerson"], "Ravi Kumar");

    let tmp = tempdir().unwrap();
    let path = tmp.path().join("form.json");
    std::fs::write(&path, r#"{"treatment":"Dressed"}"#).unwrap();
    let data = parse_form_data(&format!("@{}", path.display())).unwrap();
    assert_eq!(data["treatment"], "Dressed");
}

#[test]
fn parse_form_data_requires_an_object() {
    assert!(matches!(
        parse_form_data("[1, 2]"),
        Err(CliError::DataNotObject)
    ));
    assert!(matches!(
        parse_form_data("not json"),
        Err(CliError::Serialization(_))
    ));
}

#[test]
fn parse_file_arg_splits_field_and_path() {
    let (field, path) = parse_file_arg("beforePhoto = ./site/rail.jpg").unwrap();
    assert_eq!(field, "beforePhoto");
    assert_eq!(path, PathBuf::from("./site/rail.jpg"));

    for raw in ["rail.jpg", "=rail.jpg", "photo="] {
        assert!(matches!(
            parse_file_arg(raw),
            Err(CliError::InvalidFileArgument(_))
        ));
    }
}

#[test]
fn read_attachment_guesses_content_type() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("rail.jpg");
    std::fs::write(&path, [0xFF, 0xD8, 0xFF]).unwrap();

    let blob = read_attachment(&path).unwrap();
    assert_eq!(blob.name, "rail.jpg");
    assert_eq!(blob.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(blob.len(), 3);
}

#[test]
fn retry_policy_defaults_to_retrying_forever() {
    assert_eq!(parse_retry_policy(None).unwrap(), RetryPolicy::RETRY_FOREVER);
    assert_eq!(
        parse_retry_policy(Some("  ")).unwrap(),
        RetryPolicy::RETRY_FOREVER
    );
    assert_eq!(
        parse_retry_policy(Some("5")).unwrap(),
        RetryPolicy::dead_letter_after(5)
    );
    assert!(matches!(
        parse_retry_policy(Some("five")),
        Err(CliError::Core(sitesafe_core::Error::InvalidInput(_)))
    ));
}

#[test]
fn format_relative_time_units() {
    let now = 100_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 5 * 60_000, now), "5m ago");
    assert_eq!(format_relative_time(now - 3 * 3_600_000, now), "3h ago");
    assert_eq!(format_relative_time(now - 86_400_000, now), "1d ago");
}

#[test]
fn format_timestamp_returns_utc_label() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn pending_line_shows_retry_details() {
    let item = PendingItem {
        id: 4,
        form_type: "Near Miss Reports".to_string(),
        project_id: "proj-1".to_string(),
        file_name: Some("scaffold.jpg".to_string()),
        created_at: 0,
        relative_time: "2h ago".to_string(),
        attempts: 2,
        last_error: Some("timeout".to_string()),
    };
    let line = format_pending_line(&item);
    assert!(line.contains("Near Miss Reports"));
    assert!(line.contains("[scaffold.jpg]"));
    assert!(line.contains("attempts=2 last_error=timeout"));

    let fresh = PendingItem {
        attempts: 0,
        last_error: None,
        file_name: None,
        ..item
    };
    assert!(!format_pending_line(&fresh).contains("attempts"));
}

#[test]
fn sync_report_lines_summarize_each_item() {
    let report = SyncReport {
        succeeded: 1,
        failed: 1,
        dead_lettered: 1,
        outcomes: vec![
            ItemOutcome {
                id: OutboxId::new(1),
                form_type: FormType::FirstAidCases,
                result: SyncAttemptResult::Success,
                dead_lettered: false,
            },
            ItemOutcome {
                id: OutboxId::new(2),
                form_type: FormType::Rectifications,
                result: SyncAttemptResult::FileUploadFailed("bucket missing".to_string()),
                dead_lettered: true,
            },
        ],
    };

    let lines = format_sync_report_lines(&report);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("sent"));
    assert!(lines[1].contains("upload failed: bucket missing (moved to dead letters)"));
    assert_eq!(lines[2], "Synced 1 of 2 report(s)");
}

#[test]
fn record_status_is_parsed_from_its_label() {
    let cli = Cli::try_parse_from([
        "sitesafe",
        "records",
        "status",
        "rec-1",
        "--status",
        "in progress",
        "--notes",
        "Crew booked",
    ])
    .unwrap();
    let Commands::Records {
        command: RecordCommands::Status { id, status, notes },
    } = cli.command
    else {
        panic!("expected records status");
    };
    assert_eq!(id, "rec-1");
    assert_eq!(status, RecordStatus::InProgress);
    assert_eq!(notes, "Crew booked");

    assert!(Cli::try_parse_from(["sitesafe", "records", "status", "rec-1", "--status", "Done"])
        .is_err());
}

#[test]
fn record_line_shows_status_and_submitter() {
    let record = FormRecord {
        id: "rec-1".to_string(),
        form_type: FormType::NearMissReports,
        project_id: "p1".to_string(),
        submitted_by: UserRef::new("user-2", "Ravi Kumar"),
        data: serde_json::Map::new(),
        submitted_at: "2026-10-18T11:05:00Z".to_string(),
        status: RecordStatus::InProgress,
        updates: Vec::new(),
    };
    let line = format_record_line(&record);
    assert!(line.starts_with("rec-1  Near Miss Reports"));
    assert!(line.contains("In Progress"));
    assert!(line.contains("by Ravi Kumar"));
}

#[tokio::test(flavor = "multi_thread")]
async fn local_commands_need_no_backend_config() {
    for key in ["SUPABASE_URL", "SUPABASE_ANON_KEY", "SUPABASE_STORAGE_BUCKET"] {
        std::env::remove_var(key);
    }
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("data").join("sitesafe.db");

    let local = open_local(&db_path, true).unwrap();
    assert!(!local.online);
    assert!(local.user.is_none());

    let serde_json::Value::Object(data) = json!({ "location": "Tower A" }) else {
        unreachable!()
    };
    let payload = SubmissionPayload::new(FormType::NearMissReports, "proj-1", "user-1", data);
    local.outbox.enqueue(&payload, None).await.unwrap();

    run_pending(&local, true).await.unwrap();
    run_pending(&local, false).await.unwrap();
    run_status(&local, false).await.unwrap();
    run_list_drafts(&local, false).await.unwrap();
    run_dead_letters(&local, DeadLetterCommands::List { json: false })
        .await
        .unwrap();

    assert_eq!(local.outbox.count().await.unwrap(), 1);
    let status = local.outbox.snapshot(local.online, false).await.unwrap();
    assert_eq!(status.pending, 1);
    assert_eq!(status.quarantined, 0);
}
