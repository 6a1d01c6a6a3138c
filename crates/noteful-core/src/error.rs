use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A mandatory field was missing or empty.
    #[error("validation error: {0}")]
    Validation(String),

    /// The storage backend failed. Carries the backend's own message.
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn not_found(kind: &str, id: i64) -> Self {
        Error::NotFound(format!("{} {} not found", kind, id))
    }
}
