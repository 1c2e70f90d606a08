//! SiteSafe CLI - file site safety reports from the terminal
//!
//! Reports filed with `--offline` wait in a local outbox and are sent by
//! `sitesafe sync` or the next online submission.

mod auth;
mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands, DraftCommands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::{open_local, open_signed_in_app, resolve_db_path};
use crate::commands::dead_letters::run_dead_letters;
use crate::commands::drafts::{run_delete_drafts, run_list_drafts, run_submit_drafts};
use crate::commands::new_form::run_new_form;
use crate::commands::pending::run_pending;
use crate::commands::records::{run_projects, run_records};
use crate::commands::status::run_status;
use crate::commands::submit::{run_save_draft, run_submit, SubmitArgs};
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,sitesafe=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path)?;
    let offline = cli.offline;

    match cli.command {
        Commands::NewForm { form_type } => run_new_form(form_type, &open_local(&db_path, offline)?)?,
        Commands::Submit {
            form_type,
            project,
            data,
            files,
            draft,
        } => {
            let args = SubmitArgs {
                form_type,
                project: &project,
                data: &data,
                files: &files,
            };
            if draft {
                run_save_draft(&open_local(&db_path, offline)?, args).await?;
            } else {
                let app = open_signed_in_app(&db_path, offline).await?;
                run_submit(&app, args).await?;
            }
        }
        Commands::Pending { json } => run_pending(&open_local(&db_path, offline)?, json).await?,
        Commands::Sync { json } => {
            let app = open_signed_in_app(&db_path, offline).await?;
            run_sync(&app, json).await?;
        }
        Commands::Status { json } => run_status(&open_local(&db_path, offline)?, json).await?,
        Commands::Drafts { command } => match command {
            DraftCommands::List { json } => {
                run_list_drafts(&open_local(&db_path, offline)?, json).await?;
            }
            DraftCommands::Delete { ids } => {
                run_delete_drafts(&open_local(&db_path, offline)?, &ids).await?;
            }
            DraftCommands::Submit { ids } => {
                let app = open_signed_in_app(&db_path, offline).await?;
                run_submit_drafts(&app, &ids).await?;
            }
        },
        Commands::DeadLetters { command } => {
            run_dead_letters(&open_local(&db_path, offline)?, command).await?;
        }
        Commands::Projects { json } => {
            let app = open_signed_in_app(&db_path, offline).await?;
            run_projects(&app, json).await?;
        }
        Commands::Records { command } => {
            let mut app = open_signed_in_app(&db_path, offline).await?;
            run_records(&mut app, command).await?;
        }
        Commands::Auth { command } => run_auth(command, &db_path).await?,
    }

    Ok(())
}
