//! Error taxonomy for a bulk move run.
//!
//! Errors split along one axis: where they are allowed to stop the run.
//! - Fatal: configuration, connectivity, and credential errors abort the whole
//!   run before or during enumeration.
//! - Per-item: a missing object or a rejected write fails one transfer and is
//!   recorded in its outcome; the batch continues.

use std::fmt;
use std::io;

/// Classified error raised by stores, configuration extraction, or the
/// activity boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityError {
    /// Required run parameter missing or malformed. No store has been touched.
    Configuration(String),
    /// Store unreachable, or container/account missing, at setup or while listing.
    Connection(String),
    /// Credential reference could not be resolved or was rejected.
    Auth(String),
    /// Object vanished between listing and read.
    NotFound(String),
    /// Destination rejected a write (quota, permissions, invalid path).
    Write(String),
}

impl ActivityError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// True when this error may not be absorbed into a single transfer
    /// outcome. Fatal errors only ever surface from setup and listing paths.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Connection(_) | Self::Auth(_)
        )
    }
}

impl fmt::Display for ActivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Connection(msg) => write!(f, "connection error: {msg}"),
            Self::Auth(msg) => write!(f, "auth error: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Write(msg) => write!(f, "write error: {msg}"),
        }
    }
}

impl std::error::Error for ActivityError {}

/// Classify an io error raised while opening or reading a source object.
pub fn classify_read_error(err: &io::Error, path: &str) -> ActivityError {
    match err.kind() {
        io::ErrorKind::NotFound => {
            ActivityError::not_found(format!("{path}: object no longer exists"))
        }
        io::ErrorKind::TimedOut
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => {
            ActivityError::connection(format!("{path}: read interrupted: {err}"))
        }
        _ => ActivityError::connection(format!("{path}: read failed: {err}")),
    }
}

/// Classify an io error raised while creating or writing a destination object.
pub fn classify_write_error(err: &io::Error, path: &str) -> ActivityError {
    ActivityError::write(format!("{path}: {err}"))
}

/// Result alias used throughout the store and engine layers.
pub type ActivityResult<T> = std::result::Result<T, ActivityError>;
