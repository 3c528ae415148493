//! Layered configuration
//!
//! Precedence (highest first): command-line flags, `CQLDEPLOY_*` environment
//! variables, config file, built-in defaults.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use cqldeploy_core::domain::{EnvironmentName, Manifest, TokenSubstitution, DEFAULT_TOKEN};
use cqldeploy_infra_system::ConnectionParams;

pub const DEFAULT_CONFIG_FILE: &str = "cqldeploy.toml";
pub const ENV_PREFIX: &str = "CQLDEPLOY";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: i64 = 9042;
const DEFAULT_USER: &str = "cassandra";
const DEFAULT_PASSWORD: &str = "cassandra";
const DEFAULT_CLIENT: &str = "cqlsh";
const DEFAULT_SCHEMA_DIR: &str = "./schema";
const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub client: String,
    pub ssl: bool,
    pub schema_dir: String,
    pub log_dir: String,
    pub token: String,
    /// Replaces the built-in manifest when set
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

/// Values given on the command line (highest precedence)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub client: Option<String>,
    pub ssl: bool,
    pub schema_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    /// Load defaults, the config file and the environment
    ///
    /// An explicit `config_path` must exist; the default `cqldeploy.toml`
    /// is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", DEFAULT_PORT)?
            .set_default("user", DEFAULT_USER)?
            .set_default("password", DEFAULT_PASSWORD)?
            .set_default("client", DEFAULT_CLIENT)?
            .set_default("ssl", false)?
            .set_default("schema_dir", DEFAULT_SCHEMA_DIR)?
            .set_default("log_dir", DEFAULT_LOG_DIR)?
            .set_default("token", DEFAULT_TOKEN)?;

        let builder = match config_path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        // Values stay strings so credentials like "0123" survive; `port` and
        // `ssl` are converted during deserialization.
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(user) = overrides.user {
            self.user = user;
        }
        if let Some(password) = overrides.password {
            self.password = password;
        }
        if let Some(client) = overrides.client {
            self.client = client;
        }
        if overrides.ssl {
            self.ssl = true;
        }
        if let Some(dir) = overrides.schema_dir {
            self.schema_dir = dir.display().to_string();
        }
        if let Some(dir) = overrides.log_dir {
            self.log_dir = dir.display().to_string();
        }
    }

    pub fn manifest(&self) -> Result<Manifest> {
        match &self.files {
            Some(files) => Manifest::new(files.iter().cloned())
                .context("Invalid 'files' list in configuration"),
            None => Ok(Manifest::builtin()),
        }
    }

    pub fn substitution(&self, environment: EnvironmentName) -> Result<TokenSubstitution> {
        TokenSubstitution::new(self.token.clone(), environment)
            .context("Invalid 'token' in configuration")
    }

    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            ssl: self.ssl,
        }
    }

    pub fn schema_dir(&self) -> PathBuf {
        expand(&self.schema_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        expand(&self.log_dir)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cqldeploy.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_file_values_override_defaults() {
        let (_dir, path) = write_config(
            r#"
host = "scylla.internal"
port = 19042
ssl = true
files = ["a.cql", "b.cql"]
"#,
        );

        let settings = Settings::load(Some(path.as_path())).unwrap();

        assert_eq!(settings.host, "scylla.internal");
        assert_eq!(settings.port, 19042);
        assert!(settings.ssl);
        assert_eq!(settings.user, DEFAULT_USER);
        assert_eq!(settings.token, DEFAULT_TOKEN);

        let names: Vec<String> = settings
            .manifest()
            .unwrap()
            .iter()
            .map(|f| f.to_string())
            .collect();
        assert_eq!(names, vec!["a.cql", "b.cql"]);
    }

    #[test]
    fn test_builtin_manifest_when_files_unset() {
        let (_dir, path) = write_config("user = \"deployer\"\n");
        let settings = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(settings.manifest().unwrap(), Manifest::builtin());
    }

    #[test]
    fn test_duplicate_files_rejected() {
        let (_dir, path) = write_config("files = [\"a.cql\", \"a.cql\"]\n");
        let settings = Settings::load(Some(path.as_path())).unwrap();
        assert!(settings.manifest().is_err());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let result = Settings::load(Some(Path::new("/nonexistent/cqldeploy.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_win() {
        let (_dir, path) = write_config("host = \"from-file\"\nport = 1\n");
        let mut settings = Settings::load(Some(path.as_path())).unwrap();

        settings.apply(Overrides {
            host: Some("from-cli".to_string()),
            schema_dir: Some(PathBuf::from("/srv/schema")),
            ..Default::default()
        });

        assert_eq!(settings.host, "from-cli");
        assert_eq!(settings.port, 1);
        assert_eq!(settings.schema_dir(), PathBuf::from("/srv/schema"));

        let params = settings.connection_params();
        assert_eq!(params.host, "from-cli");
        assert!(!params.ssl);
    }

    #[test]
    fn test_tilde_expands_to_home() {
        let home = std::env::var("HOME").unwrap();
        let (_dir, path) = write_config("schema_dir = \"~/schema\"\nlog_dir = \"~/logs\"\n");
        let settings = Settings::load(Some(path.as_path())).unwrap();

        assert_eq!(settings.schema_dir(), Path::new(&home).join("schema"));
        assert_eq!(settings.log_dir(), Path::new(&home).join("logs"));
        assert_eq!(expand("/abs/dir"), PathBuf::from("/abs/dir"));
    }
}
