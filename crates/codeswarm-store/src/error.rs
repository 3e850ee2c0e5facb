use std::fmt;

/// Result type for codeswarm-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the storage layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Event or pattern (de)serialization failed
    Serialization(serde_json::Error),

    /// Missing agent state, graph, or row
    NotFound(String),

    /// Invalid input or stored value (bad enum tag, taken trigger queue, ...)
    Invalid(String),

    /// Blocking task was cancelled or panicked
    Task(tokio::task::JoinError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => write!(f, "Database error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Serialization(err) => write!(f, "Serialization error: {}", err),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::Invalid(msg) => write!(f, "Invalid: {}", msg),
            Error::Task(err) => write!(f, "Task error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Serialization(err) => Some(err),
            Error::Task(err) => Some(err),
            Error::NotFound(_) | Error::Invalid(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err)
    }
}
