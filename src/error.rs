use std::path::PathBuf;
use thiserror::Error;

/// Deployment error types
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Missing required settings: {}", keys.join(", "))]
    MissingConfig { keys: Vec<&'static str> },

    #[error("FTP_PORT is not a valid port number: {value}")]
    InvalidPort { value: String },

    #[error("Error loading {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Local directory not found: {}", path.display())]
    LocalRootMissing { path: PathBuf },

    #[error("Failed to scan {}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Could not connect to {host}:{port}: {message}")]
    Connect {
        host: String,
        port: u16,
        message: String,
    },

    #[error("Authentication failed for user {user}: {message}")]
    Auth { user: String, message: String },

    #[error("{op} {path} failed: {message}")]
    Transfer {
        op: &'static str,
        path: String,
        message: String,
    },

    #[error("{op} failed: {message}")]
    Session { op: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// Build a transfer error from any displayable backend error
    pub fn transfer(op: &'static str, path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        DeployError::Transfer {
            op,
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Build an error for a session command that targets no path
    pub fn session(op: &'static str, err: impl std::fmt::Display) -> Self {
        DeployError::Session {
            op,
            message: err.to_string(),
        }
    }
}
