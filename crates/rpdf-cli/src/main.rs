//! CLI application for arranging PDF pages.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{Globals, add, config, export, pages, workspace};

/// rpdf - Reorder, select and recombine pages of PDFs and images
#[derive(Parser)]
#[command(name = "rpdf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding workspaces and stored files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage workspaces
    Workspace(workspace::WorkspaceArgs),

    /// Add PDF or image files to a workspace
    Add(add::AddArgs),

    /// List and rearrange the pages of a workspace
    Pages(pages::PagesArgs),

    /// Export a workspace as a single PDF
    Export(export::ExportArgs),

    /// Export one page as a PNG image
    PageImage(export::PageImageArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let globals = Globals {
        config: cli.config.as_deref(),
        data_dir: cli.data_dir.as_deref(),
    };

    match cli.command {
        Commands::Workspace(args) => workspace::run(args, globals).await,
        Commands::Add(args) => add::run(args, globals).await,
        Commands::Pages(args) => pages::run(args, globals).await,
        Commands::Export(args) => export::run(args, globals).await,
        Commands::PageImage(args) => export::run_page_image(args, globals).await,
        Commands::Config(args) => config::run(args, globals).await,
    }
}
