use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sitesafe_core::models::{DraftId, FormType, OutboxId, RecordStatus};

#[derive(Parser)]
#[command(name = "sitesafe")]
#[command(about = "File site safety reports, online or off")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Work without connectivity; submissions are queued locally
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the starting values for a blank form as JSON
    NewForm {
        /// Form type, e.g. "Near Miss Reports"
        form_type: FormType,
    },
    /// Submit a report, or queue it when offline
    Submit {
        /// Form type, e.g. "First Aid Cases"
        #[arg(long, value_name = "TYPE")]
        form_type: FormType,
        /// Project the report belongs to
        #[arg(long, value_name = "ID")]
        project: String,
        /// Form data as a JSON object, or @path to read it from a file
        #[arg(long, value_name = "JSON")]
        data: String,
        /// Attach a file to a form field (repeatable)
        #[arg(long = "file", value_name = "FIELD=PATH")]
        files: Vec<String>,
        /// Save as a draft instead of submitting
        #[arg(long)]
        draft: bool,
    },
    /// List reports waiting in the outbox
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send every queued report now
    Sync {
        /// Output the sync report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show connectivity and queue status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage saved drafts
    Drafts {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Inspect and requeue reports that stopped retrying
    DeadLetters {
        #[command(subcommand)]
        command: DeadLetterCommands,
    },
    /// List projects reports can be filed against
    Projects {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Review submitted reports
    Records {
        #[command(subcommand)]
        command: RecordCommands,
    },
    /// Sign in with an employee ID and keep the session in the keychain
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
pub enum DraftCommands {
    /// List drafts, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete drafts
    Delete {
        /// Draft IDs
        #[arg(required = true)]
        ids: Vec<DraftId>,
    },
    /// Submit drafts; each one that goes through is deleted
    Submit {
        /// Draft IDs
        #[arg(required = true)]
        ids: Vec<DraftId>,
    },
}

#[derive(Subcommand)]
pub enum DeadLetterCommands {
    /// List parked reports
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a parked report back into the outbox
    Requeue {
        /// Dead letter ID
        id: OutboxId,
    },
}

#[derive(Subcommand)]
pub enum RecordCommands {
    /// List submitted reports, newest first
    List {
        /// Only reports for this project (row ID or project code)
        #[arg(long, value_name = "PROJECT")]
        project: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a report to a new status and note why
    Status {
        /// Record ID
        id: String,
        /// Open, "In Progress" or Closed
        #[arg(long, value_name = "STATUS")]
        status: RecordStatus,
        /// Note stored in the status history
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Delete a submitted report
    Delete {
        /// Record ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and store the session in the keychain
    Login {
        /// Employee ID, e.g. EMP001
        #[arg(long, value_name = "ID")]
        employee_id: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show the signed-in account
    Status,
    /// Sign out and clear the stored session
    Logout,
}
