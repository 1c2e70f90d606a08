use sitesafe_core::models::{FormRecord, Project};

use crate::cli::RecordCommands;
use crate::commands::common::App;
use crate::error::CliError;

pub async fn run_projects(app: &App, as_json: bool) -> Result<(), CliError> {
    let projects = app.projects().await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    for project in &projects {
        println!("{}", format_project_line(project));
    }
    Ok(())
}

pub async fn run_records(app: &mut App, command: RecordCommands) -> Result<(), CliError> {
    match command {
        RecordCommands::List { project, json } => {
            if let Some(key) = project.as_deref() {
                app.select_project_by_key(key).await?;
            }
            let records = app.records().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No reports found.");
                return Ok(());
            }
            for record in &records {
                println!("{}", format_record_line(record));
            }
            Ok(())
        }
        RecordCommands::Status { id, status, notes } => {
            let record = app.update_record_status(&id, status, &notes).await?;
            println!(
                "{} is now {} ({} update(s))",
                record.id,
                record.status,
                record.updates.len()
            );
            Ok(())
        }
        RecordCommands::Delete { id } => {
            app.delete_record(&id).await?;
            println!("Deleted record {id}");
            Ok(())
        }
    }
}

pub fn format_project_line(project: &Project) -> String {
    format!(
        "{:<10}  {}  ({:?}, {:?})  id={}",
        project.project_id, project.name, project.status, project.severity, project.id
    )
}

pub fn format_record_line(record: &FormRecord) -> String {
    format!(
        "{}  {:<24}  {:<11}  by {}  at {}",
        record.id,
        record.form_type.as_str(),
        record.status.as_str(),
        record.submitted_by.full_name,
        record.submitted_at
    )
}
