//! Error types for dirconf
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dirconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dirconf
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration API errors that are not tied to an HTTP status
    #[error("Config API error: {0}")]
    ConfigApi(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Desired attributes rejected by a resource schema
    #[error("Schema validation failed for {resource_type}: {message}")]
    Schema {
        /// Resource type whose schema rejected the attributes
        resource_type: String,
        /// Every problem found, joined
        message: String,
    },

    /// Resource type needs a newer product version than the one configured
    #[error("{resource_type} requires product version {required} or later (configured: {configured})")]
    UnsupportedVersion {
        /// Resource type name
        resource_type: String,
        /// Minimum version the type needs
        required: String,
        /// Version from the connection configuration
        configured: String,
    },

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failures (connection refused, timeout, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status from the configuration API
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error detail returned by the server
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Config object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Config object already exists or was modified concurrently
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config API error
    pub fn config_api(msg: impl Into<String>) -> Self {
        Self::ConfigApi(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a schema validation error
    pub fn schema(resource_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            resource_type: resource_type.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the error is the server reporting a missing object
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Http { status: 404, .. })
    }

    /// Whether repeating the same request may succeed
    ///
    /// Transport failures, rate limiting and 5xx responses are transient.
    /// Everything else (validation, auth, 4xx) fails the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimited(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
