//! Testplan CLI - Main Entry Point
//!
//! Run checklists, record results, import colleagues' exports and compare
//! runs across testers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod output;
mod prompt;
mod workspace;

use commands::{admin, attachments, compare, config, import, plan, Context};
use testplan_common::TrackerConfig;

/// Testplan - checklist runs, report import and cross-tester comparison
#[derive(Parser)]
#[command(name = "testplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Working-set file (backup format)
    #[arg(long, env = "TESTPLAN_WORKSPACE", global = true)]
    workspace: Option<PathBuf>,

    /// Configuration file
    #[arg(long, env = "TESTPLAN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List test paths in the working set
    List,

    /// Show the items of a test path
    Show(plan::ShowArgs),

    /// Set the status of an item
    Status(plan::StatusArgs),

    /// Set the comment and images of an item
    Comment(plan::CommentArgs),

    /// Export a completed test path as a report file
    Export(plan::ExportArgs),

    /// Back up the whole working set
    Backup(plan::BackupArgs),

    /// Import reports into the working set
    Import(import::ImportArgs),

    /// Compare reports from several testers
    Compare(compare::CompareArgs),

    /// Edit test paths and items
    #[command(subcommand)]
    Admin(admin::AdminCommands),

    /// Extract image attachments
    Attachments(attachments::AttachmentsArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(testplan_common::default_config_path);
    let config = TrackerConfig::load(&config_path)?;
    let workspace_path = cli.workspace.unwrap_or_else(|| config.workspace_path.clone());
    tracing::debug!(config = %config_path.display(), workspace = %workspace_path.display(), "starting");

    let ctx = Context {
        workspace: workspace::Workspace::new(workspace_path, &config),
        config,
        config_path,
        format: cli.format,
    };

    let result = match cli.command {
        Commands::List => plan::list(&ctx).await,
        Commands::Show(args) => plan::show(args, &ctx).await,
        Commands::Status(args) => plan::status(args, &ctx).await,
        Commands::Comment(args) => plan::comment(args, &ctx).await,
        Commands::Export(args) => plan::export(args, &ctx).await,
        Commands::Backup(args) => plan::backup(args, &ctx).await,
        Commands::Import(args) => import::execute(args, &ctx).await,
        Commands::Compare(args) => compare::execute(args, &ctx).await,
        Commands::Admin(cmd) => admin::execute(cmd, &ctx).await,
        Commands::Attachments(args) => attachments::execute(args, &ctx).await,
        Commands::Config(cmd) => config::execute(cmd, &ctx).await,
        Commands::Version => {
            println!("Testplan CLI v{}", testplan_common::VERSION);
            println!("Checklist runs, report import and cross-tester comparison");
            println!();
            println!("Paths:");
            println!("  Workspace: {}", ctx.workspace.path().display());
            println!("  Config:    {}", ctx.config_path.display());
            Ok(())
        }
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
