//! Logging setup
//!
//! Console output goes to stderr (pretty by default, JSON with
//! `CQLDEPLOY_LOG_FORMAT=json`) and honors `RUST_LOG`. Deployment runs also
//! append every event, client output included, to a per-run log file at
//! debug level.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

const DEFAULT_FILTER: &str = "cqldeploy=info,cqldeploy_core=info,cqldeploy_infra_system=info";
const FILE_FILTER: &str = "cqldeploy=debug,cqldeploy_core=debug,cqldeploy_infra_system=debug";

/// Per-run log file name: `deploy_<env>_<YYYYmmdd_HHMMSS>.log`
pub fn run_log_path(log_dir: &Path, environment: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("deploy_{}_{}.log", environment, stamp))
}

/// Initialize the global subscriber
///
/// The returned guard flushes the file writer on drop and must be held
/// until the run completes.
pub fn init(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let log_format =
        std::env::var("CQLDEPLOY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let (file_layer, guard) = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(FILE_FILTER));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(file_layer);

    match log_format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter),
            )
            .try_init(),
        _ => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter),
            )
            .try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_path_shape() {
        let path = run_log_path(Path::new("/var/log/cqldeploy"), "staging");
        let name = path.file_name().unwrap().to_string_lossy().to_string();

        assert!(path.starts_with("/var/log/cqldeploy"));
        assert!(name.starts_with("deploy_staging_"));
        assert!(name.ends_with(".log"));
        // deploy_staging_YYYYmmdd_HHMMSS.log
        assert_eq!(name.len(), "deploy_staging_".len() + 15 + ".log".len());
    }
}
