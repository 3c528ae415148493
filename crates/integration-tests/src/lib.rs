//! Shared fixtures for end-to-end tests: a fake `cqlsh` and a schema directory

#[cfg(unix)]
pub mod fixture;
