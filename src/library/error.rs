use thiserror::Error;

/// Failures of the gallery/collection tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The table has not been created yet; a schema migration is pending.
    #[error("Table does not exist: {0}")]
    TableMissing(String),
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
