//! Pages command - list and rearrange the pages of a workspace.

use clap::{Args, Subcommand, ValueEnum};
use console::style;
use serde::Serialize;

use rpdf_core::{PageItem, WorkspaceError, arrange};

use super::{Globals, to_index};

/// Arguments for the pages command.
#[derive(Args)]
pub struct PagesArgs {
    #[command(subcommand)]
    command: PagesCommand,
}

/// Positions are 1-based, as shown by `pages list`.
#[derive(Subcommand)]
enum PagesCommand {
    /// List pages in order
    List {
        /// Workspace id
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Move the page at one position to another
    Move { id: String, from: usize, to: usize },

    /// Drop a page onto another, carrying all selected pages along
    Drag { id: String, active: usize, over: usize },

    /// Delete pages at the given positions
    Delete {
        id: String,
        #[arg(required = true)]
        positions: Vec<usize>,
    },

    /// Delete all selected pages
    DeleteSelected { id: String },

    /// Select pages at the given positions
    Select {
        id: String,
        #[arg(required = true)]
        positions: Vec<usize>,
    },

    /// Deselect pages at the given positions
    Deselect {
        id: String,
        #[arg(required = true)]
        positions: Vec<usize>,
    },

    /// Select every page
    SelectAll { id: String },

    /// Clear the selection
    Clear { id: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Plain text table
    Text,
    /// JSON output
    Json,
    /// CSV output
    Csv,
}

/// One listed page.
#[derive(Debug, Serialize)]
struct PageRow<'a> {
    position: usize,
    id: &'a str,
    title: &'a str,
    file_hash: &'a str,
    page: u32,
    selected: bool,
}

impl<'a> PageRow<'a> {
    fn rows(items: &'a [PageItem]) -> Vec<Self> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| PageRow {
                position: i + 1,
                id: &item.id,
                title: &item.title,
                file_hash: item.page.hash.as_str(),
                page: item.page.page,
                selected: item.selected,
            })
            .collect()
    }
}

pub async fn run(args: PagesArgs, globals: Globals<'_>) -> anyhow::Result<()> {
    let (_, manager) = globals.open_manager()?;

    let (id, change) = match args.command {
        PagesCommand::List { id, format } => {
            let items = manager.get(&id)?.get_items().await?;
            print!("{}", format_pages(&items, format)?);
            return Ok(());
        }
        PagesCommand::Move { id, from, to } => {
            let (from, to) = (to_index(from)?, to_index(to)?);
            (id, Change::Move(from, to))
        }
        PagesCommand::Drag { id, active, over } => {
            let (active, over) = (to_index(active)?, to_index(over)?);
            (id, Change::Drag(active, over))
        }
        PagesCommand::Delete { id, positions } => (id, Change::Delete(indices(&positions)?)),
        PagesCommand::DeleteSelected { id } => (id, Change::DeleteSelected),
        PagesCommand::Select { id, positions } => (id, Change::Select(indices(&positions)?, true)),
        PagesCommand::Deselect { id, positions } => {
            (id, Change::Select(indices(&positions)?, false))
        }
        PagesCommand::SelectAll { id } => (id, Change::SelectAll),
        PagesCommand::Clear { id } => (id, Change::Clear),
    };

    let workspace = manager.get(&id)?;
    let before = workspace.get_items().await?.len();
    let items = workspace.update(|items| change.apply(items)).await?;

    println!(
        "{} {} ({} pages, {} selected)",
        style("✓").green(),
        change.describe(before - items.len()),
        items.len(),
        items.iter().filter(|item| item.selected).count()
    );

    Ok(())
}

/// A rearrangement requested on the command line, with 0-based indices.
enum Change {
    Move(usize, usize),
    Drag(usize, usize),
    Delete(Vec<usize>),
    DeleteSelected,
    Select(Vec<usize>, bool),
    SelectAll,
    Clear,
}

impl Change {
    fn apply(&self, items: &[PageItem]) -> rpdf_core::Result<Vec<PageItem>> {
        let updated = match self {
            Change::Move(from, to) => arrange::move_item(items, *from, *to)?,
            Change::Drag(active, over) => {
                let id_at = |position: usize| {
                    items
                        .get(position)
                        .map(|item| item.id.clone())
                        .ok_or(WorkspaceError::PositionOutOfRange {
                            position,
                            len: items.len(),
                        })
                };
                arrange::drag_move(items, &id_at(*active)?, &id_at(*over)?)?
            }
            Change::Delete(positions) => arrange::remove_positions(items, positions)?,
            Change::DeleteSelected => arrange::remove_selected(items),
            Change::Select(positions, selected) => arrange::set_selected(items, positions, *selected)?,
            Change::SelectAll => arrange::select_all(items),
            Change::Clear => arrange::clear_selection(items),
        };
        Ok(updated)
    }

    fn describe(&self, removed: usize) -> String {
        match self {
            Change::Move(from, to) => format!("Moved page {} to {}", from + 1, to + 1),
            Change::Drag(active, over) => format!("Dropped page {} onto {}", active + 1, over + 1),
            Change::Delete(_) | Change::DeleteSelected => format!("Deleted {} pages", removed),
            Change::Select(positions, true) => format!("Selected {} pages", positions.len()),
            Change::Select(positions, false) => format!("Deselected {} pages", positions.len()),
            Change::SelectAll => "Selected all pages".to_string(),
            Change::Clear => "Cleared selection".to_string(),
        }
    }
}

fn indices(positions: &[usize]) -> anyhow::Result<Vec<usize>> {
    positions.iter().map(|&p| to_index(p)).collect()
}

fn format_pages(items: &[PageItem], format: OutputFormat) -> anyhow::Result<String> {
    let rows = PageRow::rows(items);
    match format {
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(&rows)?)),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            for row in &rows {
                wtr.serialize(row)?;
            }
            Ok(String::from_utf8(wtr.into_inner()?)?)
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                return Ok(format!("{}\n", style("No pages").dim()));
            }
            let mut out = String::new();
            for row in &rows {
                let mark = if row.selected {
                    style("●").green().to_string()
                } else {
                    style("○").dim().to_string()
                };
                out.push_str(&format!("{:>4}  {}  {}\n", row.position, mark, row.title));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpdf_core::{ContentHash, PageRef};

    fn items() -> Vec<PageItem> {
        let hash = ContentHash::of(b"doc");
        let mut items: Vec<PageItem> = (1..=3)
            .map(|page| PageItem::new(PageRef::new(hash.clone(), page), "doc.pdf", None))
            .collect();
        items[1].selected = true;
        items
    }

    #[test]
    fn test_csv_listing() {
        let csv = format_pages(&items(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "position,id,title,file_hash,page,selected");
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("2,"));
        assert!(lines[2].ends_with(",2,true"));
    }

    #[test]
    fn test_json_listing() {
        let json = format_pages(&items(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["position"], 1);
        assert_eq!(value[1]["selected"], true);
        assert_eq!(value[2]["title"], "doc.pdf ⋅ 3");
    }

    #[test]
    fn test_drag_change_uses_positions() {
        let moved = Change::Drag(0, 2).apply(&items()).unwrap();
        let pages: Vec<u32> = moved.iter().map(|item| item.page.page).collect();

        // Page 2 is selected and travels with page 1
        assert_eq!(pages, vec![3, 1, 2]);
    }

    #[test]
    fn test_positions_start_at_one() {
        assert!(indices(&[1, 3]).is_ok());
        assert!(indices(&[0]).is_err());
    }
}
