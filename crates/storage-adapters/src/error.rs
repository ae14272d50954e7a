use domains::DomainError;
use thiserror::Error;

/// Failures raised inside storage adapters before they cross the port.
#[derive(Error, Debug)]
pub enum StorageError {
    #[cfg(feature = "db-postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "db-postgres")]
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored row does not map onto the domain model
    #[error("corrupt row: {0}")]
    Decode(String),
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        DomainError::Repository(err.to_string())
    }
}
