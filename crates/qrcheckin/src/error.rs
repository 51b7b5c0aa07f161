//! Error types for qrcheckin.
//!
//! This module defines all error types used throughout the qrcheckin crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for qrcheckin operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    /// Username or password did not match the operator account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session is not in a state that allows the requested action.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// What was attempted.
        action: &'static str,
        /// The state the session was in.
        state: &'static str,
    },

    // === Scanner Errors ===
    /// The camera could not be opened.
    #[error("could not open camera: {0}")]
    CameraUnavailable(String),

    /// Reading a frame failed; the scan loop aborts.
    #[error("failed to capture video: {0}")]
    FrameRead(String),

    /// An image could not be loaded or saved.
    #[error("image error for {path}: {source}")]
    Image {
        /// The image path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: image::ImageError,
    },

    // === Spreadsheet Errors ===
    /// The service-account key file could not be read or parsed.
    #[error("failed to load service account key from {path}: {message}")]
    CredentialsLoad {
        /// Path to the key file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// Exchanging the signed assertion for an access token failed.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// An HTTP request could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The spreadsheet API answered with a non-success status.
    #[error("spreadsheet API returned {status}: {body}")]
    SheetApi {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The worksheet does not have the expected layout.
    #[error("unexpected sheet layout: {message}")]
    SheetSchema {
        /// Description of the mismatch.
        message: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for qrcheckin operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<qrcheckin_camera::CameraError> for Error {
    fn from(err: qrcheckin_camera::CameraError) -> Self {
        use qrcheckin_camera::CameraError;
        match err {
            CameraError::Frame(message) => Self::FrameRead(message),
            other @ (CameraError::Open { .. } | CameraError::Unsupported) => {
                Self::CameraUnavailable(other.to_string())
            }
            CameraError::Query(message) => Self::CameraUnavailable(message),
        }
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a sheet layout error.
    #[must_use]
    pub fn sheet_schema(message: impl Into<String>) -> Self {
        Self::SheetSchema {
            message: message.into(),
        }
    }

    /// Create a credentials load error.
    #[must_use]
    pub fn credentials_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CredentialsLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error is one of the scanner conditions shown to the
    /// operator (camera unavailable, frame read failure).
    #[must_use]
    pub fn is_scanner_error(&self) -> bool {
        matches!(self, Self::CameraUnavailable(_) | Self::FrameRead(_))
    }

    /// Check if this error came from talking to the spreadsheet.
    #[must_use]
    pub fn is_sheet_error(&self) -> bool {
        matches!(
            self,
            Self::CredentialsLoad { .. }
                | Self::TokenExchange(_)
                | Self::Http(_)
                | Self::SheetApi { .. }
                | Self::SheetSchema { .. }
        )
    }
}
