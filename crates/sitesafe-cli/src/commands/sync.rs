use sitesafe_core::{Error, SyncAttemptResult, SyncReport};

use crate::commands::common::App;
use crate::error::CliError;

pub async fn run_sync(app: &App, as_json: bool) -> Result<(), CliError> {
    if !app.context().connectivity.is_online() {
        return Err(Error::Offline.into());
    }

    let report = app.outbox().sync().await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.outcomes.is_empty() {
        println!("Nothing to sync.");
    } else {
        print_sync_report(&report);
    }
    Ok(())
}

pub fn print_sync_report(report: &SyncReport) {
    for line in format_sync_report_lines(report) {
        println!("{line}");
    }
}

pub fn format_sync_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = report
        .outcomes
        .iter()
        .map(|outcome| {
            let result = match &outcome.result {
                SyncAttemptResult::Success => "sent".to_string(),
                SyncAttemptResult::FileUploadFailed(error) => format!("upload failed: {error}"),
                SyncAttemptResult::RecordInsertFailed(error) => format!("insert failed: {error}"),
            };
            let parked = if outcome.dead_lettered {
                " (moved to dead letters)"
            } else {
                ""
            };
            format!(
                "{:>6}  {:<28}  {result}{parked}",
                outcome.id.get(),
                outcome.form_type.as_str()
            )
        })
        .collect::<Vec<_>>();

    lines.push(format!(
        "Synced {} of {} report(s)",
        report.succeeded,
        report.succeeded + report.failed
    ));
    lines
}
