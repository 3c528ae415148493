// Schema Runner - preflight check and sequential deployment loop

use super::constants::MAX_LOGGED_OUTPUT_BYTES;
use crate::domain::{
    ClientOutput, FileOutcome, Manifest, RunReport, SchemaFile, TokenSubstitution,
};
use crate::error::{AppError, Result};
use crate::port::{ClusterClient, ExecutionResult, SchemaSource, TimeProvider};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Applies manifest files one at a time through a `ClusterClient`
///
/// Every invocation completes before the next file is attempted. A failing
/// file is recorded and the loop moves on; nothing is retried or rolled back.
pub struct SchemaRunner {
    client: Arc<dyn ClusterClient>,
    source: Arc<dyn SchemaSource>,
    substitution: TokenSubstitution,
    time_provider: Arc<dyn TimeProvider>,
}

impl SchemaRunner {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        source: Arc<dyn SchemaSource>,
        substitution: TokenSubstitution,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            client,
            source,
            substitution,
            time_provider,
        }
    }

    /// Verify the cluster is reachable before touching any file
    pub async fn preflight(&self) -> Result<()> {
        preflight(self.client.as_ref()).await
    }

    /// Preflight, then apply every file of the manifest
    pub async fn deploy(&self, manifest: &Manifest) -> Result<RunReport> {
        self.preflight().await?;
        Ok(self.run(manifest).await)
    }

    /// Apply every file of the manifest, in order
    ///
    /// Never fails as a whole: per-file problems end up in the report.
    pub async fn run(&self, manifest: &Manifest) -> RunReport {
        let environment = self.substitution.environment().clone();
        let mut report = RunReport::new(environment.as_str(), self.time_provider.now_millis());
        let total = manifest.len();

        info!(
            environment = %environment,
            files = %total,
            "Starting schema deployment"
        );

        for (index, file) in manifest.iter().enumerate() {
            let started = self.time_provider.now_millis();

            info!(
                file = %file,
                position = index + 1,
                total = %total,
                "Applying schema file"
            );

            let (outcome, output) = self.apply(file).await;
            let duration_ms = self.time_provider.now_millis() - started;

            if outcome.is_success() {
                info!(file = %file, duration_ms = %duration_ms, "Schema file applied");
            } else {
                warn!(
                    file = %file,
                    outcome = %outcome,
                    duration_ms = %duration_ms,
                    "Schema file failed"
                );
            }

            report.record(file.clone(), outcome, duration_ms, output);
        }

        report.finish(self.time_provider.now_millis());

        info!(
            total = %report.total,
            succeeded = %report.succeeded,
            failed = %report.failed,
            "Schema deployment finished"
        );

        report
    }

    /// Check and render every file without invoking the client
    pub fn dry_run(&self, manifest: &Manifest) -> RunReport {
        let environment = self.substitution.environment();
        let mut report = RunReport::new(environment.as_str(), self.time_provider.now_millis());

        info!(environment = %environment, files = %manifest.len(), "Starting dry run");

        for file in manifest.iter() {
            let outcome = match self.load(file) {
                Ok(raw) => {
                    info!(
                        file = %file,
                        location = %self.source.describe(file.as_str()),
                        substitutions = self.substitution.occurrences(&raw),
                        "Would apply schema file"
                    );
                    FileOutcome::Success
                }
                Err(outcome) => {
                    warn!(file = %file, outcome = %outcome, "Schema file not deployable");
                    outcome
                }
            };
            report.record(file.clone(), outcome, 0, ClientOutput::default());
        }

        report.finish(self.time_provider.now_millis());
        report
    }

    /// Read a file and substitute the environment token
    ///
    /// # Errors
    /// - AppError::Source if the file is missing or unreadable
    pub fn render(&self, file: &SchemaFile) -> Result<String> {
        self.load(file)
            .map(|raw| self.substitution.apply(&raw))
            .map_err(|outcome| {
                AppError::Source(format!(
                    "{} ({})",
                    self.source.describe(file.as_str()),
                    outcome
                ))
            })
    }

    fn load(&self, file: &SchemaFile) -> std::result::Result<String, FileOutcome> {
        if !self.source.exists(file.as_str()) {
            return Err(FileOutcome::Missing);
        }

        self.source
            .read(file.as_str())
            .map_err(|e| FileOutcome::Unreadable {
                message: e.to_string(),
            })
    }

    async fn apply(&self, file: &SchemaFile) -> (FileOutcome, ClientOutput) {
        let raw = match self.load(file) {
            Ok(raw) => raw,
            Err(outcome) => return (outcome, ClientOutput::default()),
        };

        let script = self.substitution.apply(&raw);
        debug!(
            file = %file,
            token = %self.substitution.token(),
            substitutions = self.substitution.occurrences(&raw),
            "Environment token substituted"
        );

        match self.client.execute_script(file.as_str(), &script).await {
            Ok(result) => {
                log_client_output(file, &result);
                let outcome = if result.is_success() {
                    FileOutcome::Success
                } else {
                    FileOutcome::Failed {
                        exit_code: result.exit_code,
                    }
                };
                (outcome, captured_output(&result))
            }
            Err(e) => (
                FileOutcome::ClientError {
                    message: e.to_string(),
                },
                ClientOutput::default(),
            ),
        }
    }
}

/// Run the connectivity check through `client`
///
/// # Errors
/// - AppError::Preflight if the client cannot be started or exits non-zero
pub async fn preflight(client: &dyn ClusterClient) -> Result<()> {
    info!("Running preflight connectivity check");

    let result = client.check_connectivity().await.map_err(|e| {
        error!(error = %e, "Preflight check could not run the client");
        AppError::Preflight(e.to_string())
    })?;

    if !result.is_success() {
        let detail = result
            .stderr
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("no error output");

        error!(
            exit_code = ?result.exit_code,
            stderr = %truncate_output(detail),
            "Preflight check failed"
        );

        return Err(AppError::Preflight(format!(
            "client exited with {}: {}",
            describe_exit(result.exit_code),
            truncate_output(detail)
        )));
    }

    info!(duration_ms = %result.duration_ms, "Cluster reachable");
    Ok(())
}

fn log_client_output(file: &SchemaFile, result: &ExecutionResult) {
    if let Some(stdout) = result.stdout.as_deref().filter(|s| !s.trim().is_empty()) {
        debug!(file = %file, stdout = %truncate_output(stdout), "Client output");
    }

    if let Some(stderr) = result.stderr.as_deref().filter(|s| !s.trim().is_empty()) {
        if result.is_success() {
            debug!(file = %file, stderr = %truncate_output(stderr), "Client diagnostics");
        } else {
            warn!(file = %file, stderr = %truncate_output(stderr), "Client error output");
        }
    }
}

fn captured_output(result: &ExecutionResult) -> ClientOutput {
    let keep = |text: &Option<String>| {
        text.as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| truncate_output(s).to_string())
    };

    ClientOutput {
        stdout: keep(&result.stdout),
        stderr: keep(&result.stderr),
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Cut `text` to at most MAX_LOGGED_OUTPUT_BYTES on a char boundary
fn truncate_output(text: &str) -> &str {
    if text.len() <= MAX_LOGGED_OUTPUT_BYTES {
        return text;
    }
    let mut end = MAX_LOGGED_OUTPUT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnvironmentName;
    use crate::port::cluster_client::mocks::{MockBehavior, MockClusterClient};
    use crate::port::schema_source::mocks::InMemorySchemaSource;
    use crate::port::time_provider::mocks::SteppingTimeProvider;

    fn runner(client: Arc<MockClusterClient>, source: InMemorySchemaSource) -> SchemaRunner {
        let env = EnvironmentName::parse("dev").unwrap();
        SchemaRunner::new(
            client,
            Arc::new(source),
            TokenSubstitution::with_default_token(env),
            Arc::new(SteppingTimeProvider::new(0, 5)),
        )
    }

    fn source_with(names: &[&str]) -> InMemorySchemaSource {
        names.iter().fold(InMemorySchemaSource::new(), |src, name| {
            src.with_file(*name, format!("-- {}\nUSE app_${{ENV}};", name))
        })
    }

    #[tokio::test]
    async fn test_files_applied_in_manifest_order() {
        let client = Arc::new(MockClusterClient::new());
        let runner = runner(client.clone(), source_with(&["c.cql", "a.cql", "b.cql"]));
        let manifest = Manifest::new(["c.cql", "a.cql", "b.cql"]).unwrap();

        let report = runner.run(&manifest).await;

        assert_eq!(client.executed_names(), vec!["c.cql", "a.cql", "b.cql"]);
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_token_substituted_before_execution() {
        let client = Arc::new(MockClusterClient::new());
        let runner = runner(client.clone(), source_with(&["a.cql"]));
        let manifest = Manifest::new(["a.cql"]).unwrap();

        runner.run(&manifest).await;

        let script = client.script_for("a.cql").unwrap();
        assert!(script.contains("USE app_dev;"));
        assert!(!script.contains("${ENV}"));
    }

    #[tokio::test]
    async fn test_missing_file_recorded_and_loop_continues() {
        let client = Arc::new(MockClusterClient::new());
        let runner = runner(client.clone(), source_with(&["a.cql", "c.cql"]));
        let manifest = Manifest::new(["a.cql", "b.cql", "c.cql"]).unwrap();

        let report = runner.run(&manifest).await;

        assert_eq!(client.executed_names(), vec!["a.cql", "c.cql"]);
        assert_eq!(report.files[1].outcome, FileOutcome::Missing);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_run() {
        let client = Arc::new(
            MockClusterClient::new()
                .with_file("a.cql", MockBehavior::Exit(2))
                .with_file("b.cql", MockBehavior::SpawnError("no cqlsh".to_string())),
        );
        let runner = runner(client.clone(), source_with(&["a.cql", "b.cql", "c.cql"]));
        let manifest = Manifest::new(["a.cql", "b.cql", "c.cql"]).unwrap();

        let report = runner.run(&manifest).await;

        assert_eq!(client.executed_names().len(), 3);
        assert_eq!(
            report.files[0].outcome,
            FileOutcome::Failed { exit_code: Some(2) }
        );
        assert!(matches!(
            report.files[1].outcome,
            FileOutcome::ClientError { ref message } if message.contains("no cqlsh")
        ));
        assert_eq!(report.files[2].outcome, FileOutcome::Success);
        assert_eq!(
            report.files[0].output.stderr.as_deref(),
            Some("mock failure (exit 2)")
        );
        assert_eq!(report.files[1].output, ClientOutput::default());
        assert_eq!(report.total, report.succeeded + report.failed);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test]
    async fn test_durations_come_from_time_provider() {
        let client = Arc::new(MockClusterClient::new());
        let runner = runner(client, source_with(&["a.cql"]));
        let manifest = Manifest::new(["a.cql"]).unwrap();

        let report = runner.run(&manifest).await;

        // Stepping clock: each read advances 5ms
        assert_eq!(report.files[0].duration_ms, 5);
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_preflight_failure_attempts_no_file() {
        let client = Arc::new(MockClusterClient::new().with_preflight(MockBehavior::Exit(1)));
        let runner = runner(client.clone(), source_with(&["a.cql"]));
        let manifest = Manifest::new(["a.cql"]).unwrap();

        let result = runner.deploy(&manifest).await;

        assert!(matches!(result, Err(AppError::Preflight(_))));
        assert_eq!(client.preflight_calls(), 1);
        assert!(client.executed_names().is_empty());
    }

    #[tokio::test]
    async fn test_preflight_spawn_error() {
        let client = Arc::new(
            MockClusterClient::new()
                .with_preflight(MockBehavior::SpawnError("not found".to_string())),
        );
        let runner = runner(client, source_with(&[]));

        let err = runner.preflight().await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_deploy_runs_after_successful_preflight() {
        let client = Arc::new(MockClusterClient::new());
        let runner = runner(client.clone(), source_with(&["a.cql", "b.cql"]));
        let manifest = Manifest::new(["a.cql", "b.cql"]).unwrap();

        let report = runner.deploy(&manifest).await.unwrap();

        assert_eq!(client.preflight_calls(), 1);
        assert_eq!(report.succeeded, 2);
    }

    #[tokio::test]
    async fn test_dry_run_never_invokes_client() {
        let client = Arc::new(MockClusterClient::new());
        let runner = runner(client.clone(), source_with(&["a.cql"]));
        let manifest = Manifest::new(["a.cql", "b.cql"]).unwrap();

        let report = runner.dry_run(&manifest);

        assert!(client.executed_names().is_empty());
        assert_eq!(client.preflight_calls(), 0);
        assert_eq!(report.files[0].outcome, FileOutcome::Success);
        assert_eq!(report.files[1].outcome, FileOutcome::Missing);
    }

    #[test]
    fn test_render() {
        let runner = runner(Arc::new(MockClusterClient::new()), source_with(&["a.cql"]));

        let rendered = runner.render(&SchemaFile::new("a.cql").unwrap()).unwrap();
        assert!(rendered.ends_with("USE app_dev;"));

        let err = runner
            .render(&SchemaFile::new("zz.cql").unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("MISSING"));
    }

    #[test]
    fn test_truncate_output_respects_char_boundary() {
        let long = "é".repeat(MAX_LOGGED_OUTPUT_BYTES);
        let cut = truncate_output(&long);
        assert!(cut.len() <= MAX_LOGGED_OUTPUT_BYTES);
        assert!(cut.chars().all(|c| c == 'é'));
        assert_eq!(truncate_output("short"), "short");
    }
}
