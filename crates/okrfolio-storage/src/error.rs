/// Errors that can occur within the storage layer.
///
/// A missing or foreign-owned record is not an error: lookups return
/// `Option` and deletes return `bool`.
///
/// # Examples
///
/// ```rust
/// use okrfolio_storage::error::StorageError;
///
/// let err = StorageError::UnexpectedValue {
///     column: "projects.status",
///     value: "on-hold".to_string(),
/// };
/// assert!(err.to_string().contains("projects.status"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON serialization or deserialization failure (e.g. `tags_json`).
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A column held a value outside its closed set.
    #[error("Storage: unexpected value in column '{column}': {value}")]
    UnexpectedValue { column: &'static str, value: String },

    /// Password hashing failed.
    #[error("Storage: password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    /// The database file's directory could not be created.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Parses a stored enum column, reporting the column on failure.
pub(crate) fn parse_column<T: std::str::FromStr>(column: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| StorageError::UnexpectedValue {
        column,
        value: value.to_owned(),
    })
}
