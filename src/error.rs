use crate::exitcode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before any service is touched. All of them abort the run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot read root directory {path:?}: {source}")]
    RootDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path:?}: {reason}")]
    Settings { path: PathBuf, reason: String },

    #[error("invalid credentials file {path:?}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: CredentialsError,
    },

    #[error("container tool not available: {0}")]
    ToolUnavailable(String),

    #[error("login to registry {registry} failed: {detail}")]
    Login { registry: String, detail: String },
}

impl SetupError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RootDirectory { .. } => exitcode::NOINPUT,
            Self::Settings { .. } => exitcode::CONFIG,
            Self::Credentials { .. } => exitcode::DATAERR,
            Self::ToolUnavailable(_) => exitcode::UNAVAILABLE,
            Self::Login { .. } => exitcode::NOPERM,
        }
    }
}

/// Structural problems in the credentials file
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("cannot be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entry {index} must map exactly one registry domain, found {found} keys")]
    KeyCount { index: usize, found: usize },

    #[error("entry {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("registry {0} is listed more than once")]
    Duplicate(String),
}
