//! Typed error taxonomy for the Beanline service layer.
//!
//! Service functions return `OrderError` so callers (and tests) can branch
//! on the failure class; the IPC boundary stringifies via `Display`, which
//! prefixes the kind (e.g. `"validation: Name is too short"`) so the
//! frontend can still categorize without a structured payload.

use thiserror::Error;

/// Failure classes surfaced to the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Database,
    Network,
    Authentication,
    Permission,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Database => "database",
            ErrorKind::Network => "network",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Permission => "permission",
            ErrorKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Database(String),
    #[error("network: {0}")]
    Network(String),
    #[error("authentication: {0}")]
    Authentication(String),
    #[error("permission: {0}")]
    Permission(String),
    #[error("unknown: {0}")]
    Unknown(String),
}

impl OrderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        OrderError::Validation(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        OrderError::Database(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        OrderError::Permission(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::Validation(_) => ErrorKind::Validation,
            OrderError::Database(_) => ErrorKind::Database,
            OrderError::Network(_) => ErrorKind::Network,
            OrderError::Authentication(_) => ErrorKind::Authentication,
            OrderError::Permission(_) => ErrorKind::Permission,
            OrderError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// The user-facing message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            OrderError::Validation(m)
            | OrderError::Database(m)
            | OrderError::Network(m)
            | OrderError::Authentication(m)
            | OrderError::Permission(m)
            | OrderError::Unknown(m) => m,
        }
    }

    /// Transient failures are worth retrying; validation/auth failures never are.
    pub fn is_transient(&self) -> bool {
        matches!(self, OrderError::Database(_) | OrderError::Network(_))
    }
}

impl From<rusqlite::Error> for OrderError {
    fn from(e: rusqlite::Error) -> Self {
        let msg = e.to_string();
        match classify_store_error(&msg) {
            ErrorKind::Network => OrderError::Network(msg),
            _ => OrderError::Database(msg),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for OrderError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        OrderError::Database("store connection lock poisoned".to_string())
    }
}

/// Heuristic classification of a store/transport error message.
///
/// SQLite failures are `database` except the handful of strings that
/// indicate the host (not the store) is unreachable, which map to
/// `network` so the retry helper treats them as transient.
pub fn classify_store_error(error: &str) -> ErrorKind {
    let lower = error.to_lowercase();
    if lower.contains("network error")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("failed to lookup address")
        || lower.contains("unreachable")
        || lower.contains("dns")
    {
        return ErrorKind::Network;
    }
    if lower.contains("unauthorized")
        || lower.contains("invalid password")
        || lower.contains("invalid api key")
    {
        return ErrorKind::Authentication;
    }
    if lower.contains("forbidden") || lower.contains("permission denied") {
        return ErrorKind::Permission;
    }
    if lower.contains("sqlite")
        || lower.contains("database")
        || lower.contains("locked")
        || lower.contains("busy")
        || lower.contains("constraint")
        || lower.contains("disk")
    {
        return ErrorKind::Database;
    }
    ErrorKind::Unknown
}
