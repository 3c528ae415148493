// Application Layer - Use Cases

pub mod constants;
pub mod runner;

// Re-exports
pub use runner::{preflight, SchemaRunner};
