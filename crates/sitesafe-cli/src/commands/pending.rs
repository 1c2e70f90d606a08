use serde::Serialize;
use sitesafe_core::models::PendingSubmission;

use crate::commands::common::{format_relative_time, now_ms, LocalState};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub id: i64,
    pub form_type: String,
    pub project_id: String,
    pub file_name: Option<String>,
    pub created_at: i64,
    pub relative_time: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

pub fn pending_to_item(entry: &PendingSubmission, now: i64) -> PendingItem {
    PendingItem {
        id: entry.id.get(),
        form_type: entry.form_type.to_string(),
        project_id: entry.project_id.clone(),
        file_name: entry.file_name.clone(),
        created_at: entry.created_at,
        relative_time: format_relative_time(entry.created_at, now),
        attempts: entry.attempts,
        last_error: entry.last_error.clone(),
    }
}

pub fn format_pending_line(item: &PendingItem) -> String {
    let file = item
        .file_name
        .as_deref()
        .map_or_else(String::new, |name| format!("  [{name}]"));
    let retry = if item.attempts > 0 {
        format!(
            "  attempts={} last_error={}",
            item.attempts,
            item.last_error.as_deref().unwrap_or("-")
        )
    } else {
        String::new()
    };
    format!(
        "{:>6}  {:<8}  {}  project={}{file}{retry}",
        item.id, item.relative_time, item.form_type, item.project_id
    )
}

pub async fn run_pending(local: &LocalState, as_json: bool) -> Result<(), CliError> {
    let now = now_ms();
    let items = local
        .outbox
        .pending()
        .await?
        .iter()
        .map(|entry| pending_to_item(entry, now))
        .collect::<Vec<_>>();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No reports waiting to be sent.");
        return Ok(());
    }
    for item in &items {
        println!("{}", format_pending_line(item));
    }
    Ok(())
}
