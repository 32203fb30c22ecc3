use clap::{Parser, Subcommand};
use colored::Colorize;
use memory_cli::client::WorkerClient;
use memory_cli::errors::{helpers, EnhancedError};
use memory_cli::output::{Output, OutputFormat};
use memory_core::config::WorkerConfig;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memory-cli")]
#[command(about = "Admin CLI for the memory worker")]
#[command(version, long_about = None)]
struct Cli {
    /// Base URL of a running memory worker
    #[arg(long, value_name = "URL")]
    worker_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check worker liveness
    Health,
    /// Keyword search over stored observations
    Search {
        query: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Backup operations
    #[command(subcommand)]
    Backup(BackupCommands),
    /// Export observations/summaries/prompts as NDJSON
    Export {
        #[arg(long)]
        project: Option<String>,
        #[arg(long = "type")]
        type_filter: Option<String>,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import an NDJSON export, skipping records that already exist
    Import {
        /// NDJSON file to import
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Create a new backup
    Create,
    /// List available backups
    List,
    /// Restore the database from a backup file (authenticated)
    Restore { filename: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();

    let config = WorkerConfig::from_env();
    let base_url = cli.worker_url.clone().unwrap_or_else(|| format!("http://{}:{}", config.host, config.port));
    let worker_token = std::fs::read_to_string(config.token_file()).ok().map(|s| s.trim().to_string());
    let client = WorkerClient::new(base_url, worker_token);

    match cli.command {
        Commands::Health => health(&client, cli.format).await,
        Commands::Search { query, project, limit } => search(&client, &query, project.as_deref(), limit, cli.format).await,
        Commands::Backup(command) => backup(&client, command, cli.format).await,
        Commands::Export { project, type_filter, out } => export(&client, project.as_deref(), type_filter.as_deref(), out).await,
        Commands::Import { file } => import(&client, &file, cli.format).await,
    }
}

async fn health(client: &WorkerClient, format: OutputFormat) -> anyhow::Result<()> {
    let health = client.health().await.context_with_help("Could not reach the memory worker", helpers::WORKER_UNREACHABLE_HELP)?;
    format.print(&HealthView(health))
}

struct HealthView(memory_cli::client::HealthResponse);

impl Serialize for HealthView {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl Output for HealthView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        let status = if self.0.status == "ok" { self.0.status.green() } else { self.0.status.red() };
        writeln!(writer, "status: {status}")?;
        writeln!(writer, "uptime: {}s", self.0.uptime_secs)?;
        writeln!(writer, "connected SSE clients: {}", self.0.connected_clients)?;
        writeln!(writer, "active plugins: {}", if self.0.active_plugins.is_empty() { "none".to_string() } else { self.0.active_plugins.join(", ") })?;
        Ok(())
    }
}

async fn search(client: &WorkerClient, query: &str, project: Option<&str>, limit: i64, format: OutputFormat) -> anyhow::Result<()> {
    let result = client.search(query, project, limit).await.context_with_help("Search request failed", helpers::WORKER_UNREACHABLE_HELP)?;
    format.print(&SearchView(result))
}

struct SearchView(memory_cli::client::SearchResponse);

impl Serialize for SearchView {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl Output for SearchView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if self.0.observations.is_empty() {
            writeln!(writer, "{}", "no matches".dimmed())?;
            return Ok(());
        }
        for observation in &self.0.observations {
            writeln!(writer, "{} {} {}", format!("#{}", observation.id).dimmed(), format!("[{}]", observation.r#type).cyan(), observation.title)?;
        }
        Ok(())
    }
}

async fn backup(client: &WorkerClient, command: BackupCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        BackupCommands::Create => {
            let manifest = client.backup_create().await.context_with_help("Backup creation failed", helpers::WORKER_UNREACHABLE_HELP)?;
            println!("created backup {} ({} observations)", manifest.filename, manifest.observation_count);
            Ok(())
        }
        BackupCommands::List => {
            let list = client.backup_list().await.context_with_help("Could not list backups", helpers::WORKER_UNREACHABLE_HELP)?;
            if list.backups.is_empty() {
                println!("{}", "no backups yet".dimmed());
            }
            for backup in &list.backups {
                println!("{}  {} observations, {} sessions  ({})", backup.filename, backup.observation_count, backup.session_count, backup.created_at_iso);
            }
            let _ = format;
            Ok(())
        }
        BackupCommands::Restore { filename } => {
            client.backup_restore(&filename).await.context_with_help("Restore failed", helpers::RESTORE_REQUIRES_TOKEN_HELP)?;
            println!("restored from {filename}");
            Ok(())
        }
    }
}

async fn export(client: &WorkerClient, project: Option<&str>, type_filter: Option<&str>, out: Option<PathBuf>) -> anyhow::Result<()> {
    let body = client.export_jsonl(project, type_filter).await.context_with_help("Export failed", helpers::WORKER_UNREACHABLE_HELP)?;
    match out {
        Some(path) => std::fs::write(&path, body)?,
        None => print!("{body}"),
    }
    Ok(())
}

async fn import(client: &WorkerClient, file: &PathBuf, format: OutputFormat) -> anyhow::Result<()> {
    let body = std::fs::read_to_string(file)?;
    let stats = client.import_jsonl(body).await.context_with_help("Import failed", helpers::WORKER_UNREACHABLE_HELP)?;
    format.print(&ImportView(stats))
}

struct ImportView(memory_cli::client::ImportStats);

impl Serialize for ImportView {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl Output for ImportView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "imported: {}", self.0.imported)?;
        writeln!(writer, "skipped (already present): {}", self.0.skipped)?;
        Ok(())
    }
}
