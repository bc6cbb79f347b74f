//! Export commands - write a workspace as a PDF or a page as PNG.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::debug;

use super::{Globals, to_index};

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Workspace id
    id: String,

    /// Output file (defaults to the workspace export file name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export only selected pages
    #[arg(long)]
    selected: bool,
}

/// Arguments for the page-image command.
#[derive(Args)]
pub struct PageImageArgs {
    /// Workspace id
    id: String,

    /// Page position (1-based)
    position: usize,

    /// Output file (defaults to `<id>-page-<position>.png`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Longer side of the image in pixels
    #[arg(long)]
    size: Option<u32>,
}

pub async fn run(args: ExportArgs, globals: Globals<'_>) -> anyhow::Result<()> {
    let start = Instant::now();
    let (_, manager) = globals.open_manager()?;
    let workspace = manager.get(&args.id)?;

    let items = workspace.get_items().await?;
    let pdf = workspace.export(args.selected).await?;

    let output = match args.output {
        Some(path) => path,
        None => PathBuf::from(workspace.get_info().await?.export_file_name),
    };
    fs::write(&output, &pdf)?;
    debug!("Wrote {} bytes to {}", pdf.len(), output.display());

    let count = if args.selected {
        items.iter().filter(|item| item.selected).count()
    } else {
        items.len()
    };
    println!(
        "{} Exported {} pages to {} in {:?}",
        style("✓").green(),
        count,
        output.display(),
        start.elapsed()
    );

    Ok(())
}

pub async fn run_page_image(args: PageImageArgs, globals: Globals<'_>) -> anyhow::Result<()> {
    let (config, manager) = globals.open_manager()?;
    let workspace = manager.get(&args.id)?;
    let index = to_index(args.position)?;
    let size = args.size.unwrap_or(config.thumbnails.export_size);

    workspace.get_items().await?;
    let image = workspace.page_image(index, size).await?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}-page-{}.png", args.id, args.position)));
    fs::write(&output, &image.png)?;

    println!(
        "{} Wrote page {} ({}x{}) to {}",
        style("✓").green(),
        args.position,
        image.width,
        image.height,
        output.display()
    );

    Ok(())
}
