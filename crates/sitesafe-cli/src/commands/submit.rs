use sitesafe_core::models::{DraftInput, FileBlob, FormType};
use sitesafe_core::services::SubmitOutcome;

use crate::commands::common::{
    parse_file_arg, parse_form_data, read_attachment, App, LocalState,
};
use crate::commands::sync::print_sync_report;
use crate::error::CliError;

pub struct SubmitArgs<'a> {
    pub form_type: FormType,
    pub project: &'a str,
    pub data: &'a str,
    pub files: &'a [String],
}

fn load_attachments(files: &[String]) -> Result<Vec<(String, FileBlob)>, CliError> {
    files
        .iter()
        .map(|raw| {
            let (field, path) = parse_file_arg(raw)?;
            Ok((field, read_attachment(&path)?))
        })
        .collect()
}

pub async fn run_submit(app: &App, args: SubmitArgs<'_>) -> Result<(), CliError> {
    let data = parse_form_data(args.data)?;
    let files = load_attachments(args.files)?;

    match app.submit(args.form_type, args.project, data, files).await? {
        SubmitOutcome::Submitted(record) => println!(
            "Submitted {} report for project {}",
            record.form_type, record.project_id
        ),
        SubmitOutcome::Queued(id) => {
            println!("Offline: report queued as {id} and will be sent when back online");
        }
    }

    // Anything queued earlier goes out on the same connection.
    if let Some(report) = app.resume().await? {
        if !report.outcomes.is_empty() {
            print_sync_report(&report);
        }
    }
    Ok(())
}

pub async fn run_save_draft(local: &LocalState, args: SubmitArgs<'_>) -> Result<(), CliError> {
    let mut input = DraftInput::new(args.form_type, args.project, parse_form_data(args.data)?);
    input.files.extend(load_attachments(args.files)?);

    let id = local.db.save_draft(None, &input).await?;
    println!("Saved draft {id}");
    Ok(())
}
