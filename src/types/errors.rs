//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. Every
//! variant maps to a stable wire kind via [`Error::kind`], and carries its
//! retry classification via [`Error::is_transient`].

use std::time::Duration;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the execution engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing parameters (permanent).
    #[error("schema error: {0}")]
    Schema(String),

    /// Unknown tool or resource (permanent).
    #[error("not found: {0}")]
    NotFound(String),

    /// Registration under an already-taken name (permanent).
    #[error("duplicate registration: {0}")]
    Duplicate(String),

    /// Quota exceeded for the current window (permanent for this attempt).
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        /// Time until the window rolls over and a call can be admitted again.
        retry_after: Duration,
    },

    /// Tool registered without a resolvable implementation (permanent).
    #[error("implementation missing: {0}")]
    ImplementationMissing(String),

    /// Shared counter/cache store unreachable (transient).
    #[error("backend error: {0}")]
    Backend(String),

    /// Failure reported by a tool implementation; the implementation decides
    /// whether it is worth retrying.
    #[error("implementation error: {message}")]
    Implementation { message: String, transient: bool },

    /// Attempt exceeded its deadline (transient up to the attempt budget).
    #[error("timeout: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error kind for the wire and for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Schema(_) => "SCHEMA_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Duplicate(_) => "DUPLICATE_KIND",
            Error::RateLimited { .. } => "RATE_LIMITED",
            Error::ImplementationMissing(_) => "IMPLEMENTATION_MISSING",
            Error::Backend(_) => "TRANSIENT_BACKEND_ERROR",
            Error::Implementation { .. } => "IMPLEMENTATION_ERROR",
            Error::Timeout(_) => "TIMEOUT",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// Whether a retry of the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Backend(_) | Error::Timeout(_) => true,
            Error::Implementation { transient, .. } => *transient,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Retry-after hint, present only on rate-limit denials.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>, retry_after: Duration) -> Self {
        Self::RateLimited {
            message: msg.into(),
            retry_after,
        }
    }

    pub fn implementation_missing(msg: impl Into<String>) -> Self {
        Self::ImplementationMissing(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Permanent implementation failure.
    pub fn implementation(msg: impl Into<String>) -> Self {
        Self::Implementation {
            message: msg.into(),
            transient: false,
        }
    }

    /// Transient implementation failure (worth retrying).
    pub fn implementation_transient(msg: impl Into<String>) -> Self {
        Self::Implementation {
            message: msg.into(),
            transient: true,
        }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}
