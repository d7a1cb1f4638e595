use sled::transaction::{ConflictableTransactionError, TransactionError};
use thiserror::Error;

/// Errors that can arise while running progression operations.
#[derive(Debug, Error)]
pub enum ProgressionError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Referenced player, item, mission or XP record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A business rule rejected the request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Duplicate catalog entry or handle.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Password hashing or verification failure.
    #[error("credential error: {0}")]
    Credential(String),

    /// Internal error (unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by callers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    AlreadyExists,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Internal => "internal",
        }
    }
}

impl ProgressionError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProgressionError::NotFound(_) => ErrorKind::NotFound,
            ProgressionError::BadRequest(_) => ErrorKind::BadRequest,
            ProgressionError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            _ => ErrorKind::Internal,
        }
    }

    /// Message without the variant prefix, suitable for showing to a player.
    pub fn user_message(&self) -> String {
        match self {
            ProgressionError::NotFound(msg)
            | ProgressionError::BadRequest(msg)
            | ProgressionError::AlreadyExists(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Lift into a sled transaction abort so the closure can bail out with `?`.
    pub(crate) fn abort<T>(self) -> Result<T, ConflictableTransactionError<ProgressionError>> {
        Err(ConflictableTransactionError::Abort(self))
    }
}

impl From<crate::validation::ValidationError> for ProgressionError {
    fn from(err: crate::validation::ValidationError) -> Self {
        ProgressionError::BadRequest(err.to_string())
    }
}

impl From<TransactionError<ProgressionError>> for ProgressionError {
    fn from(err: TransactionError<ProgressionError>) -> Self {
        match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(e) => ProgressionError::Sled(e),
        }
    }
}
