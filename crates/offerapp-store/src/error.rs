use offerapp_shared::{AuthErrorCode, ValidationError, VoteError};
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (database directory, image files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// UUID parsing error.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),

    /// Auth backend refusal, carrying the code the client translates.
    #[error("Auth error: {0}")]
    Auth(AuthErrorCode),

    /// Votes are only accepted on active posts.
    #[error("Post is not active, cannot change score")]
    PostNotActive,

    /// Cursor that this store did not issue, or issued for another sort.
    #[error("Invalid pagination cursor: {0}")]
    InvalidCursor(String),

    /// Expired posts cannot be re-activated.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Image too large: {size} bytes (max {max})")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Empty image upload")]
    EmptyImage,

    /// Hashing failed, or a stored password hash is malformed.
    #[error("Password hash error: {0}")]
    PasswordHash(String),
}

impl From<VoteError> for StoreError {
    fn from(e: VoteError) -> Self {
        match e {
            VoteError::PostExpired => StoreError::PostNotActive,
        }
    }
}

impl From<AuthErrorCode> for StoreError {
    fn from(code: AuthErrorCode) -> Self {
        StoreError::Auth(code)
    }
}

/// Map `QueryReturnedNoRows` to [`StoreError::NotFound`].
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
