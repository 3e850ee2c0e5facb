use std::fmt;

/// Result type for codeswarm-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the orchestration layer
#[derive(Debug)]
pub enum Error {
    /// Storage layer error (event store, registries, state journal)
    Store(codeswarm_store::Error),

    /// Path resolution error
    Path(codeswarm_core::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Source discovery failed wholesale
    Discovery(anyhow::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "Store error: {}", err),
            Error::Path(err) => write!(f, "Path error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Discovery(err) => write!(f, "Discovery error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Path(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Discovery(err) => Some(err.as_ref()),
            Error::Config(_) => None,
        }
    }
}

impl From<codeswarm_store::Error> for Error {
    fn from(err: codeswarm_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<codeswarm_core::Error> for Error {
    fn from(err: codeswarm_core::Error) -> Self {
        Error::Path(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
