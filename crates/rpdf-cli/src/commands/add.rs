//! Add command - import files into a workspace.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use super::Globals;

/// Arguments for the add command.
#[derive(Args)]
pub struct AddArgs {
    /// Workspace id
    id: String,

    /// Input files or glob patterns
    #[arg(required = true)]
    files: Vec<String>,

    /// Skip files that cannot be read instead of aborting
    #[arg(long)]
    continue_on_error: bool,
}

pub async fn run(args: AddArgs, globals: Globals<'_>) -> anyhow::Result<()> {
    let start = Instant::now();
    let (_, manager) = globals.open_manager()?;
    let workspace = manager.get(&args.id)?;

    let files = expand_inputs(&args.files)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.files.join(" "));
    }

    let mut items = workspace.get_items().await?;
    let before = items.len();

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut failed = Vec::new();
    for path in &files {
        match import_file(&workspace, path).await {
            Ok(pages) => {
                debug!("{} pages from {}", pages.len(), path.display());
                items.extend(pages);
            }
            Err(e) if args.continue_on_error => {
                warn!("Failed to import {}: {}", path.display(), e);
                failed.push((path.clone(), e.to_string()));
            }
            Err(e) => {
                pb.abandon();
                anyhow::bail!("Failed to import {}: {}", path.display(), e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let items = workspace.set_items(items).await?;

    println!(
        "{} Added {} pages to {} ({} pages total) in {:?}",
        style("✓").green(),
        items.len() - before,
        style(&args.id).bold(),
        items.len(),
        start.elapsed()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Skipped files:").red());
        for (path, error) in &failed {
            println!("  - {}: {}", path.display(), error);
        }
    }

    Ok(())
}

async fn import_file(
    workspace: &rpdf_core::Workspace,
    path: &Path,
) -> anyhow::Result<Vec<rpdf_core::PageItem>> {
    let data = fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    Ok(workspace.import(name, data).await?)
}

/// Expand glob patterns; plain paths are kept as given.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.contains(['*', '?', '[']) {
            let matches: Vec<PathBuf> = glob(input)?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file())
                .collect();
            if matches.is_empty() {
                warn!("Pattern {} matched no files", input);
            }
            files.extend(matches);
        } else {
            files.push(PathBuf::from(input));
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_inputs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        fs::write(dir.path().join("b.pdf"), b"x").unwrap();
        fs::write(dir.path().join("c.png"), b"x").unwrap();

        let pattern = dir.path().join("*.pdf").to_string_lossy().to_string();
        let files = expand_inputs(&[pattern, "plain.png".to_string()]).unwrap();

        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("a.pdf"));
        assert!(files[1].ends_with("b.pdf"));
        assert_eq!(files[2], PathBuf::from("plain.png"));
    }
}
