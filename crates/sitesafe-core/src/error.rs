//! Error types for sitesafe-core

use thiserror::Error;

use crate::remote::auth::AuthError;
use crate::schema::ValidationErrors;

/// Result type alias using sitesafe-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sitesafe-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local persistence is unavailable or exhausted
    #[error("Could not save report locally: {0}")]
    Storage(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Form data failed schema validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote file upload failed
    #[error("File upload failed: {0}")]
    Upload(String),

    /// Remote structured-record insert failed
    #[error("Database insert failed: {0}")]
    Insert(String),

    /// Any other remote backend failure
    #[error("Backend error: {0}")]
    Remote(String),

    /// Sign-in or session failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Operation requires connectivity
    #[error("This operation is not available while offline")]
    Offline,
}

impl Error {
    /// Whether this error means the local database itself failed.
    pub const fn is_local_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Sqlite(_) | Self::Io(_))
    }

    /// Collapse a local persistence failure into [`Error::Storage`].
    #[must_use]
    pub fn into_storage(self) -> Self {
        match self {
            Self::Sqlite(error) => Self::Storage(error.to_string()),
            Self::Io(error) => Self::Storage(error.to_string()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_storage_collapses_sqlite_errors() {
        let error = Error::Sqlite(rusqlite::Error::InvalidQuery).into_storage();
        assert!(matches!(error, Error::Storage(_)));
        assert!(error.is_local_storage());
        assert!(error.to_string().starts_with("Could not save report locally"));
    }

    #[test]
    fn remote_errors_are_not_local_storage() {
        assert!(!Error::Upload("quota".into()).is_local_storage());
        assert!(!Error::Insert("rls".into()).is_local_storage());
    }
}
