use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum DispatchError {
    #[error("secret {secret_id} has no value")]
    SecretUnavailable { secret_id: String },

    #[error("secret payload is malformed: {0}")]
    SecretMalformed(String),

    #[error("shared resource initialization failed: {0}")]
    ResourceInitFailed(#[source] Box<DispatchError>),

    #[error("connection query failed: {0}")]
    QueryFailed(#[source] Box<DispatchError>),

    #[error("publish failed for connection {connection_id}: {reason}")]
    PublishFailed { connection_id: i64, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("invalid schedule expression '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    /// A failed AWS SDK call. `status` is the HTTP status when a response came back.
    #[error("{operation} failed: {message}")]
    Aws {
        operation: &'static str,
        status: Option<u16>,
        transient: bool,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl DispatchError {
    /// Unwraps `ResourceInitFailed`/`QueryFailed` down to the error that caused them.
    pub fn root_cause(&self) -> &DispatchError {
        match self {
            DispatchError::ResourceInitFailed(inner) | DispatchError::QueryFailed(inner) => {
                inner.root_cause()
            }
            other => other,
        }
    }
}

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for DispatchError {
    fn is_retryable(&self) -> bool {
        match self {
            DispatchError::Aws {
                status, transient, ..
            } => *transient || status.is_some_and(|s| s >= 500 || s == 429),
            DispatchError::Timeout(_) => true,
            _ => false,
        }
    }
}
