use thiserror::Error;

use crate::models::{ItemId, RevisionId};

/// All errors that can occur in synclattes-core.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Revision not found: {0}")]
    RevisionNotFound(RevisionId),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Migration error at version {version}: {message}")]
    Migration { version: u32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    FileSystemError = 4,
    Conflict = 7,
}

impl SyncError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::RevisionNotFound(_) | Self::ItemNotFound(_) => ExitCode::NotFound,
            Self::ValidationError(_) | Self::ConfigError(_) | Self::TomlParse(_) => {
                ExitCode::InvalidArgs
            }
            Self::Io(_) => ExitCode::FileSystemError,
            _ => ExitCode::GeneralError,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
