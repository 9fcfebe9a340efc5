//! docscan CLI
//!
//! Command-line interface for docscan - scanned documents and tags.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use docscan_core::{Config, Database};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "docscan")]
#[command(about = "docscan - Scanned documents, pages and tags")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage documents
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Show status (database location, contents)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum DocCommands {
    /// List all documents
    #[command(alias = "ls")]
    List,
    /// Show a document with its tags and pages
    Show {
        /// Document ID
        id: i64,
    },
    /// Create a document
    #[command(alias = "add")]
    Create {
        /// Document title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Tag ID to attach (repeatable)
        #[arg(short, long)]
        tag: Vec<i64>,
        /// Page image: a local file or a content URI (repeatable, in page order)
        #[arg(short, long)]
        image: Vec<String>,
    },
    /// Set a document's title
    Rename {
        /// Document ID
        id: i64,
        /// New title
        title: String,
    },
    /// Delete a document
    #[command(alias = "rm")]
    Delete {
        /// Document ID
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// List all tags with document counts
    #[command(alias = "ls")]
    List,
    /// Create a tag
    #[command(alias = "add")]
    Create {
        /// Tag name
        name: String,
    },
    /// Rename a tag
    Rename {
        /// Tag ID
        id: i64,
        /// New name
        name: String,
    },
    /// Delete a tag
    #[command(alias = "rm")]
    Delete {
        /// Tag ID
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, database_name, log_level)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config);

    // Config doesn't need the database
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&config, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, &output)
            }
        };
    }

    let db = Database::open(&config).map_err(|e| match e.recovery_suggestion() {
        Some(hint) => anyhow::anyhow!("Failed to open database: {}\n{}", e, hint),
        None => anyhow::anyhow!("Failed to open database: {}", e),
    })?;
    debug!(path = ?db.path(), "database ready");

    match cli.command {
        Commands::Doc { command } => handle_doc_command(command, &db, &output).await,
        Commands::Tag { command } => handle_tag_command(command, &db, &output).await,
        Commands::Status => commands::status::show(&db, &output),
        Commands::Config { .. } => Ok(()), // Handled above
    }
}

async fn handle_doc_command(command: DocCommands, db: &Database, output: &Output) -> Result<()> {
    match command {
        DocCommands::List => commands::document::list(db, output).await,
        DocCommands::Show { id } => commands::document::show(db, id, output).await,
        DocCommands::Create { title, tag, image } => {
            commands::document::create(db, title, tag, image, output).await
        }
        DocCommands::Rename { id, title } => {
            commands::document::rename(db, id, title, output).await
        }
        DocCommands::Delete { id, yes } => commands::document::delete(db, id, yes, output).await,
    }
}

async fn handle_tag_command(command: TagCommands, db: &Database, output: &Output) -> Result<()> {
    match command {
        TagCommands::List => commands::tag::list(db, output).await,
        TagCommands::Create { name } => commands::tag::create(db, name, output).await,
        TagCommands::Rename { id, name } => commands::tag::rename(db, id, name, output).await,
        TagCommands::Delete { id, yes } => commands::tag::delete(db, id, yes, output).await,
    }
}

/// Initialize stderr logging
///
/// `RUST_LOG` wins; otherwise the configured level (default "warn") applies
/// to this workspace's crates.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.log_level.as_deref().unwrap_or("warn");
        EnvFilter::new(format!("docscan_core={},docscan_cli={}", level, level))
    });

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
