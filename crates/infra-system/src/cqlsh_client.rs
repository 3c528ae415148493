// cqlsh client adapter
// reason: tokio for async process management, tempfile for staged scripts
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info, warn};

use cqldeploy_core::application::constants::PREFLIGHT_STATEMENT;
use cqldeploy_core::port::cluster_client::{
    ClusterClient, ExecutionError, ExecutionResult, ExecutionStatus,
};
use cqldeploy_core::port::TimeProvider;

const REDACTED: &str = "********";

/// Connection parameters passed to every client invocation
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub ssl: bool,
}

/// Runs schema scripts through the external `cqlsh` executable
///
/// Invocation shape:
/// `<program> <host> <port> -u <user> -p <password> [--ssl] -f <script>`
pub struct CqlshClient {
    program: String,
    params: ConnectionParams,
    time_provider: Arc<dyn TimeProvider>,
    staging_dir: Option<PathBuf>,
}

impl CqlshClient {
    /// Create a new cqlsh client
    ///
    /// # Arguments
    /// * `program` - Client executable (name on PATH or absolute path)
    /// * `params` - Cluster connection parameters
    /// * `time_provider` - Time provider for duration tracking
    ///
    /// # Example
    /// ```ignore
    /// let client = CqlshClient::new("cqlsh", params, Arc::new(SystemTimeProvider));
    /// ```
    pub fn new(
        program: impl Into<String>,
        params: ConnectionParams,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            program: program.into(),
            params,
            time_provider,
            staging_dir: None,
        }
    }

    /// Stage rendered scripts in `dir` instead of the system temp directory
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    fn connection_args(&self) -> Vec<String> {
        let mut args = vec![
            self.params.host.clone(),
            self.params.port.to_string(),
            "-u".to_string(),
            self.params.user.clone(),
            "-p".to_string(),
            self.params.password.clone(),
        ];
        if self.params.ssl {
            args.push("--ssl".to_string());
        }
        args
    }

    /// Arguments for applying a script file
    pub fn script_args(&self, script: &Path) -> Vec<String> {
        let mut args = self.connection_args();
        args.push("-f".to_string());
        args.push(script.display().to_string());
        args
    }

    /// Arguments for running a single inline statement
    pub fn statement_args(&self, statement: &str) -> Vec<String> {
        let mut args = self.connection_args();
        args.push("-e".to_string());
        args.push(statement.to_string());
        args
    }

    /// Copy of `args` with the value following `-p` masked (for logging)
    pub fn redact(args: &[String]) -> Vec<String> {
        let mut redacted = Vec::with_capacity(args.len());
        let mut mask_next = false;
        for arg in args {
            if mask_next {
                redacted.push(REDACTED.to_string());
                mask_next = false;
                continue;
            }
            mask_next = arg == "-p" || arg == "--password";
            redacted.push(arg.clone());
        }
        redacted
    }

    /// Write the rendered script to a temporary file
    fn stage(&self, name: &str, script: &str) -> Result<NamedTempFile, ExecutionError> {
        let prefix = format!("cqldeploy-{}-", sanitize_stem(name));
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".cql");

        let mut staged = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| ExecutionError::Staging(e.to_string()))?;

        staged
            .write_all(script.as_bytes())
            .and_then(|_| staged.flush())
            .map_err(|e| ExecutionError::Staging(e.to_string()))?;

        debug!(file = %name, staged = %staged.path().display(), "Script staged");
        Ok(staged)
    }

    /// Spawn the client and wait for it to exit (no timeout)
    async fn spawn_and_wait(&self, args: &[String]) -> Result<std::process::Output, ExecutionError> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(format!("{}: {}", self.program, e)))?;

        child
            .wait_with_output()
            .await
            .map_err(|e| ExecutionError::IoError(e.to_string()))
    }

    /// Build execution result from process output
    fn build_result(&self, output: std::process::Output, duration_ms: i64) -> ExecutionResult {
        let status = if output.status.success() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };

        ExecutionResult {
            status,
            exit_code: output.status.code(),
            duration_ms,
            stdout: Some(String::from_utf8_lossy(&output.stdout).to_string()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        }
    }

    async fn invoke(&self, args: Vec<String>) -> Result<ExecutionResult, ExecutionError> {
        let start_time = self.time_provider.now_millis();

        info!(
            program = %self.program,
            args = ?Self::redact(&args),
            "Invoking cluster client"
        );

        let output = self.spawn_and_wait(&args).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;
        let result = self.build_result(output, duration_ms);

        info!(
            program = %self.program,
            duration_ms = %duration_ms,
            exit_code = ?result.exit_code,
            status = ?result.status,
            "Cluster client finished"
        );

        Ok(result)
    }
}

#[async_trait]
impl ClusterClient for CqlshClient {
    async fn check_connectivity(&self) -> Result<ExecutionResult, ExecutionError> {
        self.invoke(self.statement_args(PREFLIGHT_STATEMENT)).await
    }

    async fn execute_script(
        &self,
        name: &str,
        script: &str,
    ) -> Result<ExecutionResult, ExecutionError> {
        let staged = self.stage(name, script)?;
        let result = self.invoke(self.script_args(staged.path())).await;

        // Removed on success and failure alike
        let staged_path = staged.path().to_path_buf();
        if let Err(e) = staged.close() {
            warn!(
                staged = %staged_path.display(),
                error = %e,
                "Failed to remove staged script"
            );
        }

        result
    }
}

/// Filesystem-safe stem of a manifest name (`03_tables.cql` -> `03_tables`)
fn sanitize_stem(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = base.strip_suffix(".cql").unwrap_or(base);
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqldeploy_core::port::time_provider::SystemTimeProvider;

    fn params(ssl: bool) -> ConnectionParams {
        ConnectionParams {
            host: "10.0.0.5".to_string(),
            port: 9142,
            user: "deployer".to_string(),
            password: "s3cret".to_string(),
            ssl,
        }
    }

    fn client(program: &str, ssl: bool) -> CqlshClient {
        CqlshClient::new(program, params(ssl), Arc::new(SystemTimeProvider))
    }

    fn staged_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_script_args_shape() {
        let args = client("cqlsh", false).script_args(Path::new("/tmp/x.cql"));
        assert_eq!(
            args,
            vec!["10.0.0.5", "9142", "-u", "deployer", "-p", "s3cret", "-f", "/tmp/x.cql"]
        );
    }

    #[test]
    fn test_statement_args_with_ssl() {
        let args = client("cqlsh", true).statement_args(PREFLIGHT_STATEMENT);
        assert_eq!(
            args,
            vec![
                "10.0.0.5",
                "9142",
                "-u",
                "deployer",
                "-p",
                "s3cret",
                "--ssl",
                "-e",
                "DESCRIBE KEYSPACES"
            ]
        );
    }

    #[test]
    fn test_redact_masks_password_only() {
        let args = client("cqlsh", false).script_args(Path::new("a.cql"));
        let redacted = CqlshClient::redact(&args);

        assert!(!redacted.iter().any(|a| a == "s3cret"));
        assert_eq!(redacted[5], REDACTED);
        assert_eq!(redacted[3], "deployer");
        assert_eq!(redacted.len(), args.len());
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("03_tables.cql"), "03_tables");
        assert_eq!(sanitize_stem("nested/seed data.cql"), "seed_data");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_removes_staged_script() {
        let dir = tempfile::tempdir().unwrap();
        let client = client("true", false).with_staging_dir(dir.path());

        let result = client.execute_script("00_keyspace.cql", "SELECT 1;").await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(staged_entries(dir.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_removes_staged_script() {
        let dir = tempfile::tempdir().unwrap();
        let client = client("false", false).with_staging_dir(dir.path());

        let result = client.execute_script("01_types.cql", "BROKEN;").await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(staged_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let client = client("/nonexistent/cqlsh", false).with_staging_dir(dir.path());

        let result = client.execute_script("a.cql", "SELECT 1;").await;

        assert!(matches!(result, Err(ExecutionError::SpawnFailed(_))));
        assert_eq!(staged_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_staging_into_missing_dir_fails() {
        let client =
            client("true", false).with_staging_dir("/nonexistent/cqldeploy/staging");

        let result = client.execute_script("a.cql", "SELECT 1;").await;

        assert!(matches!(result, Err(ExecutionError::Staging(_))));
    }
}
