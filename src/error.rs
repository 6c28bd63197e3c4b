use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::config::settings::ConfigError;
use crate::security::ValidationError;

/// Errors that can occur while driving the git backend
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Command 'git {command}' failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Repository is locked by another git process: {0}")]
    LockContention(String),

    #[error("Command 'git {0}' timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Git version {0} is too old. Minimum required: 2.23")]
    GitVersionTooOld(String),

    #[error("Failed to detect git version: {0}")]
    GitVersionDetectionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl GitError {
    /// Whether a caller may reasonably retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, GitError::LockContention(_) | GitError::Timeout(..))
    }

    /// Raw stderr text of a failed command, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            GitError::CommandFailed { stderr, .. } => Some(stderr),
            GitError::LockContention(stderr) => Some(stderr),
            _ => None,
        }
    }
}

/// Failures surfaced by the gateway to HTTP callers
///
/// Validation and Forbidden are raised before the backend is touched.
/// Backend failures carry the git error verbatim and are never retried here.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid or missing CSRF token")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(#[from] GitError),
}

impl GatewayError {
    /// Stable machine-readable category name
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation",
            GatewayError::Forbidden => "forbidden",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::Backend(_) => "backend",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Backend(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Top-level application error used by the binary's bootstrap path
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Result type for gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;
