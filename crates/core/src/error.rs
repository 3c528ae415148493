// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Preflight check failed: {0}")]
    Preflight(String),

    #[error("Schema source error: {0}")]
    Source(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
