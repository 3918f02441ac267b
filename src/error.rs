use thiserror::Error;

/// Error type for dbcreds operations
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("The `url` should not be provided alongside any of these URL params: {params:?}")]
    UrlConflict { params: Vec<&'static str> },

    #[error("If the `url` is not provided, all of these URL params are required: {required:?}")]
    MissingUrlParams { required: Vec<&'static str> },

    #[error("Could not parse URL from string: {0}")]
    InvalidUrl(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid connect argument `{key}`: {reason}")]
    InvalidConnectArg { key: String, reason: String },

    #[error("Driver not available: {0}")]
    DriverNotAvailable(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No credentials block named `{0}`")]
    UnknownBlock(String),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for dbcreds operations
pub type Result<T> = std::result::Result<T, CredentialsError>;
