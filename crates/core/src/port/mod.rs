// Port Layer - Interfaces for external dependencies

pub mod cluster_client;
pub mod schema_source;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use cluster_client::{ClusterClient, ExecutionError, ExecutionResult, ExecutionStatus};
pub use schema_source::SchemaSource;
pub use time_provider::TimeProvider;
