//! cqldeploy - Main Entry Point
//! Applies an ordered list of CQL schema files to a Cassandra/ScyllaDB cluster

mod logging;
mod output;
mod settings;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::info;

// Import workspace crates
use cqldeploy_core::application::constants::EXIT_ABORTED;
use cqldeploy_core::application::{preflight, SchemaRunner};
use cqldeploy_core::domain::{EnvironmentName, SchemaFile};
use cqldeploy_core::port::time_provider::SystemTimeProvider;
use cqldeploy_core::port::SchemaSource;
use cqldeploy_infra_system::{CqlshClient, FsSchemaSource};
use settings::{Overrides, Settings};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "cqldeploy")]
#[command(about = "Apply ordered CQL schema files to a Cassandra/ScyllaDB cluster", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./cqldeploy.toml when present)
    #[arg(long, global = true, env = "CQLDEPLOY_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,
}

/// Connection flags, overriding config file and CQLDEPLOY_* variables
#[derive(Args)]
struct ConnectionArgs {
    /// Cluster contact point
    #[arg(long, global = true)]
    host: Option<String>,

    /// Native transport port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Username
    #[arg(short = 'u', long, global = true)]
    user: Option<String>,

    /// Password
    #[arg(short = 'p', long, global = true)]
    password: Option<String>,

    /// Client executable (default: cqlsh)
    #[arg(long, global = true)]
    client: Option<String>,

    /// Connect with SSL
    #[arg(long, global = true)]
    ssl: bool,

    /// Directory holding the schema files
    #[arg(long, global = true)]
    schema_dir: Option<PathBuf>,

    /// Directory for per-run log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

impl From<ConnectionArgs> for Overrides {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            user: args.user,
            password: args.password,
            client: args.client,
            ssl: args.ssl,
            schema_dir: args.schema_dir,
            log_dir: args.log_dir,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check connectivity, then apply every schema file in order
    Run {
        /// Environment substituted for the token (e.g. dev, staging, prod)
        environment: String,

        /// Start at this file instead of the first one
        #[arg(long)]
        from: Option<String>,

        /// Check and render files without contacting the cluster
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Only run the preflight connectivity check
    Check,

    /// List schema files in deployment order
    List,

    /// Print one file with the environment token substituted
    Render {
        /// Environment substituted for the token
        environment: String,

        /// File name relative to the schema directory
        file: String,
    },
}

#[derive(Tabled)]
struct ManifestRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Path")]
    path: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(EXIT_ABORTED)
        }
    }
}

async fn execute(cli: Cli) -> Result<u8> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply(cli.connection.into());

    match cli.command {
        Commands::Run {
            environment,
            from,
            dry_run,
            json,
        } => cmd_run(&settings, &environment, from.as_deref(), dry_run, json).await,
        Commands::Check => cmd_check(&settings).await,
        Commands::List => cmd_list(&settings),
        Commands::Render { environment, file } => cmd_render(&settings, &environment, &file),
    }
}

fn build_client(settings: &Settings) -> CqlshClient {
    CqlshClient::new(
        settings.client.clone(),
        settings.connection_params(),
        Arc::new(SystemTimeProvider),
    )
}

fn build_runner(settings: &Settings, environment: EnvironmentName) -> Result<SchemaRunner> {
    let client = Arc::new(build_client(settings));
    let source = Arc::new(FsSchemaSource::new(settings.schema_dir()));
    let substitution = settings.substitution(environment)?;

    Ok(SchemaRunner::new(
        client,
        source,
        substitution,
        Arc::new(SystemTimeProvider),
    ))
}

async fn cmd_run(
    settings: &Settings,
    environment: &str,
    from: Option<&str>,
    dry_run: bool,
    json: bool,
) -> Result<u8> {
    let environment = EnvironmentName::parse(environment)?;
    let mut manifest = settings.manifest()?;
    if let Some(from) = from {
        manifest = manifest.starting_from(from)?;
    }

    let log_file =
        (!dry_run).then(|| logging::run_log_path(&settings.log_dir(), environment.as_str()));
    let _guard = logging::init(log_file.as_deref())?;

    info!(
        version = VERSION,
        environment = %environment,
        host = %settings.host,
        port = %settings.port,
        schema_dir = %settings.schema_dir().display(),
        files = %manifest.len(),
        "cqldeploy starting"
    );

    let runner = build_runner(settings, environment)?;
    let report = if dry_run {
        runner.dry_run(&manifest)
    } else {
        runner.deploy(&manifest).await?
    };

    if json {
        output::print_json(&report)?;
    } else {
        output::print_report(&report, log_file.as_deref(), dry_run);
    }

    Ok(report.exit_code())
}

async fn cmd_check(settings: &Settings) -> Result<u8> {
    let _guard = logging::init(None)?;

    let client = build_client(settings);
    preflight(&client).await?;

    println!(
        "{}",
        format!("✓ {}:{} reachable", settings.host, settings.port)
            .green()
            .bold()
    );
    Ok(0)
}

fn cmd_list(settings: &Settings) -> Result<u8> {
    let _guard = logging::init(None)?;

    let manifest = settings.manifest()?;
    let source = FsSchemaSource::new(settings.schema_dir());

    let rows: Vec<ManifestRow> = manifest
        .iter()
        .enumerate()
        .map(|(i, file)| ManifestRow {
            position: i + 1,
            file: file.to_string(),
            status: if source.exists(file.as_str()) {
                "present".to_string()
            } else {
                "MISSING".to_string()
            },
            path: source.describe(file.as_str()),
        })
        .collect();

    let missing = rows.iter().filter(|r| r.status == "MISSING").count();

    println!("{}", "Deployment order".cyan().bold());
    println!();
    println!("{}", Table::new(rows));
    println!();

    if missing > 0 {
        println!(
            "{}",
            format!("✗ {} of {} files missing", missing, manifest.len())
                .red()
                .bold()
        );
        Ok(1)
    } else {
        println!("{}", "✓ All files present".green().bold());
        Ok(0)
    }
}

fn cmd_render(settings: &Settings, environment: &str, file: &str) -> Result<u8> {
    let _guard = logging::init(None)?;

    let environment = EnvironmentName::parse(environment)?;
    let file = SchemaFile::new(file)?;
    let runner = build_runner(settings, environment)?;

    print!("{}", runner.render(&file)?);
    Ok(0)
}
