use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use sitesafe_core::models::{FileBlob, FormData, User};
use sitesafe_core::{
    BackendConfig, DatabaseService, OutboxStore, RetryPolicy, SafetyApp, SupabaseBackend,
};

use crate::auth::{auth_client, load_stored_session, UserCache};
use crate::error::CliError;

pub const DB_PATH_ENV: &str = "SITESAFE_DB_PATH";
pub const DEAD_LETTER_AFTER_ENV: &str = "SITESAFE_DEAD_LETTER_AFTER";

pub type App = SafetyApp<SupabaseBackend>;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match cli_db_path.or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from)) {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_local_dir()
        .map(|dir| dir.join("sitesafe").join("sitesafe.db"))
        .ok_or(CliError::NoDataDir)
}

pub fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(DatabaseService::open_path(path)?)
}

pub fn backend_config() -> Result<BackendConfig, CliError> {
    BackendConfig::from_env()?.ok_or(CliError::NotConfigured)
}

/// Retry policy from `SITESAFE_DEAD_LETTER_AFTER`; unset retries forever.
pub fn retry_policy_from_env() -> Result<RetryPolicy, CliError> {
    parse_retry_policy(env::var(DEAD_LETTER_AFTER_ENV).ok().as_deref())
}

pub fn parse_retry_policy(raw: Option<&str>) -> Result<RetryPolicy, CliError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(RetryPolicy::RETRY_FOREVER);
    };
    let attempts = raw.parse::<u32>().map_err(|_| {
        sitesafe_core::Error::InvalidInput(format!(
            "{DEAD_LETTER_AFTER_ENV} must be a positive number, got `{raw}`"
        ))
    })?;
    Ok(RetryPolicy::dead_letter_after(attempts))
}

/// The local database, its outbox queue and the cached profile.
///
/// Opening it reads no backend configuration and makes no network calls,
/// so queue inspection and drafts work on a device that was never set up
/// for sync.
pub struct LocalState {
    pub db: DatabaseService,
    pub outbox: OutboxStore,
    pub user: Option<User>,
    pub online: bool,
}

pub fn open_local(db_path: &Path, offline: bool) -> Result<LocalState, CliError> {
    let db = open_database(db_path)?;
    Ok(LocalState {
        outbox: OutboxStore::new(db.clone()),
        db,
        user: UserCache::beside(db_path).load()?,
        online: !offline,
    })
}

/// App acting as the signed-in user. Online runs refresh the session and the
/// cached profile; offline runs use what was stored at the last sign-in.
pub async fn open_signed_in_app(db_path: &Path, offline: bool) -> Result<App, CliError> {
    let config = backend_config()?;
    let db = open_database(db_path)?;
    let cache = UserCache::beside(db_path);

    let session = if offline {
        load_stored_session()?
    } else {
        auth_client(&config)?.restore_session().await?
    };
    let Some(session) = session else {
        return Err(CliError::NotSignedIn);
    };

    let backend = Arc::new(
        SupabaseBackend::new(&config)?.with_access_token(session.access_token.clone()),
    );

    let mut user = cache.load()?;
    if !offline {
        match backend.fetch_user(&session.user.id).await {
            Ok(Some(fetched)) => {
                cache.save(&fetched)?;
                user = Some(fetched);
            }
            Ok(None) => tracing::warn!("No profile found for user {}", session.user.id),
            Err(error) => tracing::warn!("Could not refresh profile, using cached copy: {error}"),
        }
    }
    let user = user
        .filter(|user| user.id == session.user.id)
        .ok_or(CliError::NotSignedIn)?;

    let mut app = SafetyApp::new(db, backend, retry_policy_from_env()?);
    app.set_current_user(Some(user));
    app.set_online(!offline).await?;
    Ok(app)
}

/// Parse `--data`: inline JSON, or `@path` to read JSON from a file.
pub fn parse_form_data(raw: &str) -> Result<FormData, CliError> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => raw.to_string(),
    };
    match serde_json::from_str(&text)? {
        Value::Object(data) => Ok(data),
        _ => Err(CliError::DataNotObject),
    }
}

/// Split a `FIELD=PATH` attachment argument.
pub fn parse_file_arg(raw: &str) -> Result<(String, PathBuf), CliError> {
    let Some((field, path)) = raw.split_once('=') else {
        return Err(CliError::InvalidFileArgument(raw.to_string()));
    };
    let field = field.trim();
    let path = path.trim();
    if field.is_empty() || path.is_empty() {
        return Err(CliError::InvalidFileArgument(raw.to_string()));
    }
    Ok((field.to_string(), PathBuf::from(path)))
}

pub fn read_attachment(path: &Path) -> Result<FileBlob, CliError> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map_or_else(|| "attachment".to_string(), |name| name.to_string_lossy().into_owned());
    let content_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());
    Ok(FileBlob::new(name, content_type, bytes))
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
