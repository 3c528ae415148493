// Cluster Client Port
// Abstraction over the external CQL client used to apply schema files

use async_trait::async_trait;
use thiserror::Error;

/// Result of one client invocation
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub duration_ms: i64,
    pub exit_code: Option<i32>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failed,
}

/// Execution errors (the client never produced an exit status)
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Staging failed: {0}")]
    Staging(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Cluster Client trait
///
/// Implementations:
/// - CqlshClient: shells out to `cqlsh`
/// - mocks::MockClusterClient: scripted outcomes for tests
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Run a trivial statement to prove the cluster is reachable
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the client cannot be started
    async fn check_connectivity(&self) -> Result<ExecutionResult, ExecutionError>;

    /// Apply an already-substituted script
    ///
    /// # Arguments
    /// * `name` - Manifest name of the file (for logging and staging)
    /// * `script` - Rendered script content
    ///
    /// # Errors
    /// - ExecutionError::Staging if the temporary script cannot be written
    /// - ExecutionError::SpawnFailed if the client cannot be started
    async fn execute_script(
        &self,
        name: &str,
        script: &str,
    ) -> Result<ExecutionResult, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Mock client behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit 0
        Success,
        /// Exit with the given code
        Exit(i32),
        /// Client could not be started
        SpawnError(String),
    }

    impl MockBehavior {
        fn produce(&self) -> Result<ExecutionResult, ExecutionError> {
            match self {
                MockBehavior::Success => Ok(ExecutionResult {
                    status: ExecutionStatus::Success,
                    duration_ms: 10,
                    exit_code: Some(0),
                    stdout: Some("mock output".to_string()),
                    stderr: None,
                }),
                MockBehavior::Exit(code) => Ok(ExecutionResult {
                    status: ExecutionStatus::Failed,
                    duration_ms: 10,
                    exit_code: Some(*code),
                    stdout: None,
                    stderr: Some(format!("mock failure (exit {})", code)),
                }),
                MockBehavior::SpawnError(msg) => Err(ExecutionError::SpawnFailed(msg.clone())),
            }
        }
    }

    /// Mock Cluster Client for testing
    ///
    /// Files default to `Success` unless overridden with `with_file`.
    pub struct MockClusterClient {
        preflight: MockBehavior,
        per_file: HashMap<String, MockBehavior>,
        executed: Arc<Mutex<Vec<(String, String)>>>,
        preflight_calls: Arc<Mutex<usize>>,
    }

    impl MockClusterClient {
        pub fn new() -> Self {
            Self {
                preflight: MockBehavior::Success,
                per_file: HashMap::new(),
                executed: Arc::new(Mutex::new(Vec::new())),
                preflight_calls: Arc::new(Mutex::new(0)),
            }
        }

        pub fn with_preflight(mut self, behavior: MockBehavior) -> Self {
            self.preflight = behavior;
            self
        }

        pub fn with_file(mut self, name: impl Into<String>, behavior: MockBehavior) -> Self {
            self.per_file.insert(name.into(), behavior);
            self
        }

        /// Names of executed scripts, in call order
        pub fn executed_names(&self) -> Vec<String> {
            self.executed
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }

        /// Script content passed for `name`
        pub fn script_for(&self, name: &str) -> Option<String> {
            self.executed
                .lock()
                .unwrap()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, script)| script.clone())
        }

        pub fn preflight_calls(&self) -> usize {
            *self.preflight_calls.lock().unwrap()
        }
    }

    impl Default for MockClusterClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ClusterClient for MockClusterClient {
        async fn check_connectivity(&self) -> Result<ExecutionResult, ExecutionError> {
            *self.preflight_calls.lock().unwrap() += 1;
            self.preflight.produce()
        }

        async fn execute_script(
            &self,
            name: &str,
            script: &str,
        ) -> Result<ExecutionResult, ExecutionError> {
            self.executed
                .lock()
                .unwrap()
                .push((name.to_string(), script.to_string()));

            self.per_file
                .get(name)
                .unwrap_or(&MockBehavior::Success)
                .produce()
        }
    }
}
