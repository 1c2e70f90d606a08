use crate::commands::common::LocalState;
use crate::error::CliError;

pub async fn run_status(local: &LocalState, as_json: bool) -> Result<(), CliError> {
    let status = local.outbox.snapshot(local.online, false).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "{}",
        status
            .banner()
            .unwrap_or_else(|| "All reports synced".to_string())
    );
    if status.dead_letters > 0 {
        println!(
            "{} report(s) stopped retrying; see `sitesafe dead-letters list`",
            status.dead_letters
        );
    }
    if let Some(notice) = status.recovery_notice() {
        println!("Warning: {notice}.");
        for backup in local.db.quarantined_backups() {
            println!("  backup: {}", backup.display());
        }
    }
    Ok(())
}
