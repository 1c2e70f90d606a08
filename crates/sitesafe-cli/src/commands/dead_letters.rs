use crate::cli::DeadLetterCommands;
use crate::commands::common::{format_timestamp, LocalState};
use crate::error::CliError;

pub async fn run_dead_letters(
    local: &LocalState,
    command: DeadLetterCommands,
) -> Result<(), CliError> {
    match command {
        DeadLetterCommands::List { json } => {
            let letters = local.outbox.dead_letters().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&letters)?);
                return Ok(());
            }
            if letters.is_empty() {
                println!("No dead letters.");
                return Ok(());
            }
            for letter in letters {
                println!(
                    "{:>6}  {}  {}  project={}  attempts={}  last_error={}",
                    letter.id.get(),
                    format_timestamp(letter.dead_at),
                    letter.form_type,
                    letter.project_id,
                    letter.attempts,
                    letter.last_error.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        DeadLetterCommands::Requeue { id } => {
            let new_id = local.outbox.requeue_dead_letter(id).await?;
            println!("Requeued {id} as {new_id}");
            Ok(())
        }
    }
}
