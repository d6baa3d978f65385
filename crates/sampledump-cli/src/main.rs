//! sampledump — dependency-ordered partial dumps of a PostgreSQL database
//!
//! Reads a YAML manifest naming the tables to dump, resolves foreign-key
//! dependency order against the live catalog, and writes a COPY-format script
//! that replays into an empty schema without constraint violations.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sampledump_catalog::{PostgresAdapter, SourceAdapter, SourceError};
use sampledump_core::Manifest;
use sampledump_engine::write_dump;

/// Dump a declared subset of a PostgreSQL database in foreign-key dependency order
#[derive(Parser)]
#[command(name = "sampledump")]
#[command(version, about, long_about = None)]
#[command(disable_help_flag = true)]
struct Cli {
    /// Database server host or socket directory
    #[arg(short = 'h', long, env = "PGHOST", default_value = "/tmp")]
    host: String,

    /// Database server port
    #[arg(short = 'p', long, env = "PGPORT", default_value_t = 5432)]
    port: u16,

    /// Database user name (default: current user)
    #[arg(short = 'U', long, env = "PGUSER")]
    username: Option<String>,

    /// Never prompt for a password
    #[arg(short = 'w', long = "no-password")]
    no_password: bool,

    /// Path to the manifest file
    #[arg(short = 'f', long = "manifest-file")]
    manifest_file: PathBuf,

    /// Path to the output file (stdout when omitted)
    #[arg(short = 'o', long = "output-file")]
    output_file: Option<PathBuf>,

    /// Use SSL/TLS for the database connection
    #[arg(short = 's', long = "tls")]
    tls: bool,

    /// Enable debug logging on stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Show help
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Database to dump
    #[arg(env = "PGDATABASE")]
    database: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so a dump on stdout stays clean
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let manifest = Manifest::from_file(&cli.manifest_file)?;
    tracing::debug!(
        path = %cli.manifest_file.display(),
        tables = manifest.tables.len(),
        "loaded manifest"
    );

    let username = match &cli.username {
        Some(username) => username.clone(),
        None => current_user()?,
    };

    let adapter = connect_with_retry(&cli, &username).await?;
    tracing::debug!(adapter = adapter.name(), database = %cli.database, "connected");

    let summary = match &cli.output_file {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("failed to open output file {}", path.display()))?;
            write_dump(&adapter, &manifest, &mut file).await?
        }
        None => {
            let mut stdout = std::io::stdout();
            write_dump(&adapter, &manifest, &mut stdout).await?
        }
    };

    tracing::debug!(tables = summary.tables.len(), "dump complete");

    Ok(())
}

/// Connect with the environment's password; on failure, prompt on the
/// terminal and try once more (unless --no-password was given)
async fn connect_with_retry(cli: &Cli, username: &str) -> Result<PostgresAdapter> {
    let password = std::env::var("PGPASSWORD").unwrap_or_default();

    match connect(cli, username, &password).await {
        Ok(adapter) => Ok(adapter),
        Err(err) if !cli.no_password => {
            tracing::debug!("initial connection failed: {}", err);
            let password = prompt_password(username)?;
            Ok(connect(cli, username, &password).await?)
        }
        Err(err) => Err(err.into()),
    }
}

async fn connect(cli: &Cli, username: &str, password: &str) -> Result<PostgresAdapter, SourceError> {
    let adapter = if cli.tls {
        PostgresAdapter::connect_with_tls(&cli.host, cli.port, &cli.database, username, password)
            .await?
    } else {
        PostgresAdapter::connect(&cli.host, cli.port, &cli.database, username, password).await?
    };

    adapter.test_connection().await?;

    Ok(adapter)
}

fn prompt_password(username: &str) -> Result<String> {
    eprint!("Password for {}: ", username);
    std::io::stderr().flush().ok();
    rpassword::read_password().context("failed to read password from terminal")
}

fn current_user() -> Result<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .context("could not determine the current user; pass -U/--username")
}
