use std::io;

use sitesafe_core::remote::auth::AuthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] sitesafe_core::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Form data must be a JSON object")]
    DataNotObject,
    #[error("Invalid --file value `{0}`; expected FIELD=PATH")]
    InvalidFileArgument(String),
    #[error("Could not resolve a data directory; pass --db-path")]
    NoDataDir,
    #[error("Not signed in. Run `sitesafe auth login --employee-id <ID> --password <PASSWORD>`.")]
    NotSignedIn,
    #[error("Backend is not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY.")]
    NotConfigured,
}
