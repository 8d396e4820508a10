//! Error types for the COS probe core library.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the probe library.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration stage error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage stage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while loading the storage configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but is not valid JSON
    #[error("config file is not valid JSON: {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    /// Valid JSON, but a required `backend` field is missing or mistyped
    #[error("config file is missing required fields: {}: {message}", path.display())]
    Incomplete { path: PathBuf, message: String },

    /// The user id cannot be used as a single key segment
    #[error("invalid user id {user_id:?}: {reason}")]
    InvalidUserId { user_id: String, reason: String },

    /// Any other I/O failure while reading the file
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The client could not be constructed from the configuration
    #[error("Failed to create storage client: {0}")]
    Client(String),

    /// The bucket could not be reached
    #[error("Bucket check failed for {bucket}: {message}")]
    BucketCheck { bucket: String, message: String },

    /// Listing a prefix failed
    #[error("Listing {prefix} failed: {message}")]
    Listing { prefix: String, message: String },

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Storage backend error
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Flat classification of every error the probe can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigNotFound,
    ConfigMalformed,
    ConfigIncomplete,
    ConfigReadOther,
    InvalidUserId,
    ClientConstruction,
    BucketCheckFailed,
    ListingFailed,
    ObjectNotFound,
    Backend,
    Serialization,
}

impl Error {
    /// Classify this error without inspecting its message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(ConfigError::NotFound { .. }) => ErrorKind::ConfigNotFound,
            Error::Config(ConfigError::Malformed { .. }) => ErrorKind::ConfigMalformed,
            Error::Config(ConfigError::Incomplete { .. }) => ErrorKind::ConfigIncomplete,
            Error::Config(ConfigError::Read { .. }) => ErrorKind::ConfigReadOther,
            Error::Config(ConfigError::InvalidUserId { .. }) => ErrorKind::InvalidUserId,
            Error::Storage(StorageError::Client(_)) => ErrorKind::ClientConstruction,
            Error::Storage(StorageError::BucketCheck { .. }) => ErrorKind::BucketCheckFailed,
            Error::Storage(StorageError::Listing { .. }) => ErrorKind::ListingFailed,
            Error::Storage(StorageError::NotFound(_)) => ErrorKind::ObjectNotFound,
            Error::Storage(StorageError::Backend(_)) => ErrorKind::Backend,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
