use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the persistence layer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (e.g. duplicate username)
    #[error("Conflict on {field}: value already in use")]
    Conflict { field: &'static str },

    /// A follow edge already exists between the two users
    #[error("Follow already exists: {follower_id} -> {following_id}")]
    DuplicateFollow {
        follower_id: Uuid,
        following_id: Uuid,
    },

    /// A foreign key pointed at a user that does not exist
    #[error("Referenced user does not exist")]
    MissingReference,

    /// Query or constraint failure reported by the database
    #[error("Database error: {0}")]
    Database(String),

    /// Pool exhausted, timeout or network failure
    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                StoreError::MissingReference
            }
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict {
                    field: conflict_field(db_err.constraint()),
                }
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Map a unique constraint name to the user-facing field it protects.
fn conflict_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_username_key") => "username",
        Some("users_email_key") => "email",
        Some("follows_pkey") => "follow",
        _ => "unknown",
    }
}

/// Errors raised when talking to object storage.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Errors surfaced by the directory service to the HTTP layer.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("User {follower_id} does not follow {following_id}")]
    NotFollowing {
        follower_id: Uuid,
        following_id: Uuid,
    },

    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Request body failed validation
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Update contains no fields")]
    EmptyUpdate,

    #[error("A user cannot follow themself")]
    SelfFollow,

    #[error("User {follower_id} already follows {following_id}")]
    AlreadyFollowing {
        follower_id: Uuid,
        following_id: Uuid,
    },

    #[error("{field} is already taken")]
    Conflict { field: &'static str },

    #[error("Upload is missing the '{0}' field")]
    MissingFile(&'static str),

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Upload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Unsupported image: {reason}")]
    UnsupportedImage { reason: String },

    /// Request body hit the upload limit before it was fully read
    #[error("Upload exceeds the {max} byte limit")]
    UploadLimitExceeded { max: usize },

    /// Multipart framing error reported by the HTTP layer
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Expected request with `Content-Type: application/json`")]
    InvalidContentType,

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
