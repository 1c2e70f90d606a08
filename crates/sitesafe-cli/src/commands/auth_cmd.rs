use std::path::Path;

use sitesafe_core::SupabaseBackend;

use crate::auth::{auth_client, clear_stored_session, load_stored_session, UserCache};
use crate::cli::AuthCommands;
use crate::commands::common::backend_config;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, db_path: &Path) -> Result<(), CliError> {
    let cache = UserCache::beside(db_path);
    match command {
        AuthCommands::Login {
            employee_id,
            password,
        } => {
            let config = backend_config()?;
            let session = auth_client(&config)?
                .sign_in_with_employee_id(&employee_id, &password)
                .await?;

            let backend = SupabaseBackend::new(&config)?.with_access_token(session.access_token);
            let Some(user) = backend.fetch_user(&session.user.id).await? else {
                clear_stored_session()?;
                return Err(CliError::NotSignedIn);
            };
            cache.save(&user)?;
            println!("Signed in as {} ({})", user.full_name, user.employee_id);
            Ok(())
        }
        AuthCommands::Status => {
            let session = load_stored_session()?;
            match (session, cache.load()?) {
                (Some(session), Some(user)) if user.id == session.user.id => {
                    println!(
                        "Signed in as {} ({}, {:?})",
                        user.full_name, user.employee_id, user.role
                    );
                    if session.is_expired() {
                        println!("Session expired; it will be refreshed on the next online run.");
                    }
                }
                (Some(session), _) => {
                    let email = session.user.email.as_deref().unwrap_or("(no email)");
                    println!("Signed in as {email}; profile not cached yet");
                }
                (None, _) => println!("Not signed in."),
            }
            Ok(())
        }
        AuthCommands::Logout => {
            if let Some(session) = load_stored_session()? {
                let config = backend_config()?;
                if let Err(error) = auth_client(&config)?.sign_out(&session.access_token).await {
                    tracing::warn!("Remote sign-out failed, clearing local session: {error}");
                    clear_stored_session()?;
                }
            }
            cache.clear()?;
            println!("Signed out");
            Ok(())
        }
    }
}
