// cqldeploy Infrastructure - System Adapters
// Implements: ClusterClient, SchemaSource

pub mod cqlsh_client;
pub mod fs_schema_source;

pub use cqlsh_client::{ConnectionParams, CqlshClient};
pub use fs_schema_source::FsSchemaSource;
