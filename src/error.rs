//! Error types for the uploader.
//!
//! Each stage of an upload lifecycle has its own error type. The worker turns
//! all of them into status events before they reach the UI, so only
//! `ValidationError` is ever returned to a caller directly.

use std::path::PathBuf;
use thiserror::Error;

/// Request rejected before any background work started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a file first.")]
    NoFileSelected,

    #[error("Please enter a name for the file on Google Drive.")]
    MissingRemoteName,

    #[error("The file to upload does not match the selected file.")]
    SelectionMismatch,

    #[error("An upload is already in progress.")]
    UploadInProgress,
}

/// Failure to obtain an authenticated session.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Setup error: '{}' was not found.", .0.display())]
    MissingClientSecrets(PathBuf),

    #[error("Setup error: could not read client secrets: {0}")]
    InvalidClientSecrets(String),

    #[error("Authentication error: token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Authentication was cancelled: {0}")]
    Cancelled(String),

    #[error("Authentication error: consent flow failed: {0}")]
    Flow(String),

    #[error("Authentication error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while sending the file. Always fatal to the current upload.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("file not found: '{}'", .0.display())]
    FileNotFound(PathBuf),

    #[error("could not read the local file: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("the server did not return a resumable session address")]
    MissingSessionUri,

    #[error("the server stopped acknowledging data at byte {offset}")]
    Stalled { offset: u64 },

    #[error("upload cancelled")]
    Cancelled,
}

/// The uploaded object could not be read back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("file {id} was not found after upload: {reason}")]
pub struct NotFoundError {
    pub id: String,
    pub reason: String,
}

impl NotFoundError {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Link sharing could not be enabled. Never fatal to the upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not grant link access to {id}: {reason}")]
pub struct PermissionError {
    pub id: String,
    pub reason: String,
}

impl PermissionError {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
