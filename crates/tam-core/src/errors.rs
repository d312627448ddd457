use std::path::PathBuf;

/// Core error type for the account manager.
///
/// Expected domain conditions (bad phone, missing account, rejected proxy) map to
/// their own variants so the bot layer can pick a user-facing message; only
/// archive I/O during export is treated as fatal for the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid path: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Short, user-presentable description (no paths, no internal detail).
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidFormat(s) | Error::Validation(s) | Error::NotFound(s) => s.clone(),
            Error::Unauthorized(_) => "You are not allowed to do that.".to_string(),
            Error::Export(_) => "Export failed. Please try again later.".to_string(),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
