// Run Report - per-file outcomes and counters

use super::manifest::SchemaFile;
use serde::Serialize;

/// Outcome of deploying a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileOutcome {
    /// Client exited with status 0
    Success,
    /// Client exited with a non-zero (or no) status code
    Failed { exit_code: Option<i32> },
    /// File not found in the schema directory
    Missing,
    /// File exists but could not be read
    Unreadable { message: String },
    /// Client could not be run at all (spawn or staging failure)
    ClientError { message: String },
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Success)
    }
}

impl std::fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOutcome::Success => write!(f, "SUCCESS"),
            FileOutcome::Failed {
                exit_code: Some(code),
            } => write!(f, "FAILED (exit {})", code),
            FileOutcome::Failed { exit_code: None } => write!(f, "FAILED (terminated)"),
            FileOutcome::Missing => write!(f, "MISSING"),
            FileOutcome::Unreadable { message } => write!(f, "UNREADABLE: {}", message),
            FileOutcome::ClientError { message } => write!(f, "CLIENT ERROR: {}", message),
        }
    }
}

/// What the client printed while applying one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// Result for one manifest entry
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: SchemaFile,
    #[serde(flatten)]
    pub outcome: FileOutcome,
    pub duration_ms: i64,
    #[serde(flatten)]
    pub output: ClientOutput,
}

/// Accumulated result of a deployment run
///
/// Invariant: `total == succeeded + failed == files.len()`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub environment: String,
    pub started_at: i64, // epoch ms
    pub finished_at: Option<i64>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn new(environment: impl Into<String>, started_at: i64) -> Self {
        Self {
            environment: environment.into(),
            started_at,
            ..Default::default()
        }
    }

    /// Record one file outcome and update the counters
    pub fn record(
        &mut self,
        file: SchemaFile,
        outcome: FileOutcome,
        duration_ms: i64,
        output: ClientOutput,
    ) {
        self.total += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.files.push(FileReport {
            file,
            outcome,
            duration_ms,
            output,
        });
    }

    pub fn finish(&mut self, finished_at: i64) {
        self.finished_at = Some(finished_at);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Process exit code: 0 when every file succeeded, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at.map(|end| end - self.started_at)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|r| !r.outcome.is_success())
    }
}
