// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid environment name '{name}': {reason}")]
    InvalidEnvironment { name: String, reason: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("File not in manifest: {0}")]
    UnknownFile(String),

    #[error("Invalid substitution token: {0}")]
    InvalidToken(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
