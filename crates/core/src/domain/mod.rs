// Domain Layer - Pure deployment logic and entities

pub mod environment;
pub mod error;
pub mod manifest;
pub mod report;

// Re-exports
pub use environment::{EnvironmentName, TokenSubstitution, DEFAULT_TOKEN};
pub use error::DomainError;
pub use manifest::{Manifest, SchemaFile, BUILTIN_FILES};
pub use report::{ClientOutput, FileOutcome, FileReport, RunReport};
