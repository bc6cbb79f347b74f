//! Workspace command - list, inspect, rename and remove workspaces.

use clap::{Args, Subcommand};
use console::style;

use rpdf_core::{WorkspaceInfo, WorkspaceManager};

use super::Globals;

/// Arguments for the workspace command.
#[derive(Args)]
pub struct WorkspaceArgs {
    #[command(subcommand)]
    command: WorkspaceCommand,
}

#[derive(Subcommand)]
enum WorkspaceCommand {
    /// List all workspaces
    List,

    /// Show details of a workspace
    Show {
        /// Workspace id
        id: String,
    },

    /// Set the display name of a workspace
    Rename { id: String, name: String },

    /// Set the file name used by `export`
    ExportName { id: String, file_name: String },

    /// Delete a workspace and the files only it uses
    Remove { id: String },

    /// Delete stored files no workspace uses
    Gc,
}

pub async fn run(args: WorkspaceArgs, globals: Globals<'_>) -> anyhow::Result<()> {
    let (_, manager) = globals.open_manager()?;

    match args.command {
        WorkspaceCommand::List => list(&manager).await,
        WorkspaceCommand::Show { id } => show(&manager, &id).await,
        WorkspaceCommand::Rename { id, name } => {
            update_info(&manager, &id, |info| info.name = name).await?;
            println!("{} Renamed {}", style("✓").green(), id);
            Ok(())
        }
        WorkspaceCommand::ExportName { id, file_name } => {
            update_info(&manager, &id, |info| info.export_file_name = file_name).await?;
            println!("{} Updated export file name of {}", style("✓").green(), id);
            Ok(())
        }
        WorkspaceCommand::Remove { id } => {
            let evicted = manager.remove(&id).await?;
            println!(
                "{} Removed {} ({} files deleted)",
                style("✓").green(),
                id,
                evicted.len()
            );
            Ok(())
        }
        WorkspaceCommand::Gc => {
            let evicted = manager.collect_garbage().await?;
            println!("{} Deleted {} unused files", style("✓").green(), evicted.len());
            for hash in evicted {
                println!("  - {}", hash.short());
            }
            Ok(())
        }
    }
}

async fn list(manager: &WorkspaceManager) -> anyhow::Result<()> {
    let ids = manager.list().await?;
    if ids.is_empty() {
        println!("{} No workspaces yet.", style("ℹ").blue());
        return Ok(());
    }

    for id in ids {
        let info = manager.get(&id)?.get_info().await?;
        println!("{}  {}", style(&id).bold(), info.name);
    }
    Ok(())
}

async fn show(manager: &WorkspaceManager, id: &str) -> anyhow::Result<()> {
    let workspace = manager.get(id)?;
    let info = workspace.get_info().await?;
    let items = workspace.get_items().await?;

    let mut files: Vec<&str> = Vec::new();
    for item in &items {
        let file = item.title.rsplit_once(" ⋅ ").map_or(item.title.as_str(), |(name, _)| name);
        if !files.contains(&file) {
            files.push(file);
        }
    }

    println!("{}", style(&info.name).bold());
    println!("  Id:          {}", id);
    println!("  Export name: {}", info.export_file_name);
    println!(
        "  Pages:       {} ({} selected)",
        items.len(),
        items.iter().filter(|item| item.selected).count()
    );
    println!("  Files:       {}", files.len());
    for file in files {
        println!("    - {}", file);
    }
    Ok(())
}

async fn update_info(
    manager: &WorkspaceManager,
    id: &str,
    change: impl FnOnce(&mut WorkspaceInfo),
) -> anyhow::Result<()> {
    let workspace = manager.get(id)?;
    let mut info = workspace.get_info().await?;
    change(&mut info);
    workspace.set_info(&info).await?;
    Ok(())
}
