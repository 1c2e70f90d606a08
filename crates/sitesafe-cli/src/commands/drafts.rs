use sitesafe_core::models::DraftId;

use crate::commands::common::{format_relative_time, now_ms, App, LocalState};
use crate::error::CliError;

pub async fn run_list_drafts(local: &LocalState, as_json: bool) -> Result<(), CliError> {
    let drafts = local.db.list_drafts().await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&drafts)?);
        return Ok(());
    }

    if drafts.is_empty() {
        println!("No drafts saved.");
        return Ok(());
    }
    let now = now_ms();
    for draft in drafts {
        println!(
            "{:>6}  {:<8}  {}  project={}  files={}",
            draft.id,
            format_relative_time(draft.saved_at, now),
            draft.form_type,
            draft.project_id,
            draft.file_count
        );
    }
    Ok(())
}

pub async fn run_delete_drafts(local: &LocalState, ids: &[DraftId]) -> Result<(), CliError> {
    let removed = local.db.delete_drafts(ids).await?;
    println!("Deleted {removed} draft(s)");
    Ok(())
}

pub async fn run_submit_drafts(app: &App, ids: &[DraftId]) -> Result<(), CliError> {
    let report = app.submit_drafts(ids).await?;
    for id in &report.succeeded {
        println!("Submitted draft {id}");
    }
    for (id, error) in &report.failed {
        eprintln!("Draft {id} not submitted: {error}");
    }
    for (id, error) in &report.cleanup_failed {
        eprintln!(
            "Draft {id} was submitted but could not be deleted ({error}); delete it before resubmitting"
        );
    }
    println!(
        "{} of {} draft(s) submitted",
        report.succeeded.len(),
        ids.len()
    );
    Ok(())
}
