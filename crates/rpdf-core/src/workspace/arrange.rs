//! Arrangement operations over page item lists.
//!
//! Every function takes the current list and returns a new one; the input is
//! never modified. Results are meant to be handed to `Workspace::set_items`
//! (or returned from a `Workspace::update` closure).

use std::collections::HashSet;

use crate::error::WorkspaceError;
use crate::models::item::PageItem;

type Result<T> = std::result::Result<T, WorkspaceError>;

fn check_position(items: &[PageItem], position: usize) -> Result<()> {
    if position < items.len() {
        Ok(())
    } else {
        Err(WorkspaceError::PositionOutOfRange {
            position,
            len: items.len(),
        })
    }
}

fn position_of(items: &[PageItem], id: &str) -> Result<usize> {
    items
        .iter()
        .position(|item| item.id == id)
        .ok_or_else(|| WorkspaceError::ItemNotFound(id.to_string()))
}

/// Array move: remove the item at `from` and insert it at `to`.
pub fn move_item(items: &[PageItem], from: usize, to: usize) -> Result<Vec<PageItem>> {
    check_position(items, from)?;
    check_position(items, to)?;

    let mut moved = items.to_vec();
    let item = moved.remove(from);
    moved.insert(to, item);
    Ok(moved)
}

/// Drop the dragged item `active_id` onto `over_id`, carrying the selection.
///
/// Moving right, the dragged item lands first and each selected item
/// follows it to the target slot; moving left, the selected items go first
/// and the dragged item last. Dropping an item on itself changes nothing.
pub fn drag_move(items: &[PageItem], active_id: &str, over_id: &str) -> Result<Vec<PageItem>> {
    let old_index = position_of(items, active_id)?;
    let new_index = position_of(items, over_id)?;

    if old_index == new_index {
        return Ok(items.to_vec());
    }

    let selected: Vec<String> = items
        .iter()
        .filter(|item| item.selected && item.id != active_id)
        .map(|item| item.id.clone())
        .collect();

    let mut moved = items.to_vec();
    let mut move_to_target = |id: &str| -> Result<()> {
        let from = position_of(&moved, id)?;
        let item = moved.remove(from);
        moved.insert(new_index, item);
        Ok(())
    };

    if new_index > old_index {
        move_to_target(active_id)?;
        for id in &selected {
            move_to_target(id.as_str())?;
        }
    } else {
        for id in &selected {
            move_to_target(id.as_str())?;
        }
        move_to_target(active_id)?;
    }

    Ok(moved)
}

/// Remove the items at the given positions.
pub fn remove_positions(items: &[PageItem], positions: &[usize]) -> Result<Vec<PageItem>> {
    for &position in positions {
        check_position(items, position)?;
    }
    let doomed: HashSet<usize> = positions.iter().copied().collect();

    Ok(items
        .iter()
        .enumerate()
        .filter(|(position, _)| !doomed.contains(position))
        .map(|(_, item)| item.clone())
        .collect())
}

/// Remove every selected item.
pub fn remove_selected(items: &[PageItem]) -> Vec<PageItem> {
    items.iter().filter(|item| !item.selected).cloned().collect()
}

/// Set the selection flag of the items at the given positions.
pub fn set_selected(items: &[PageItem], positions: &[usize], selected: bool) -> Result<Vec<PageItem>> {
    for &position in positions {
        check_position(items, position)?;
    }

    let mut updated = items.to_vec();
    for &position in positions {
        updated[position].selected = selected;
    }
    Ok(updated)
}

pub fn select_all(items: &[PageItem]) -> Vec<PageItem> {
    with_selection(items, true)
}

pub fn clear_selection(items: &[PageItem]) -> Vec<PageItem> {
    with_selection(items, false)
}

fn with_selection(items: &[PageItem], selected: bool) -> Vec<PageItem> {
    items
        .iter()
        .map(|item| PageItem {
            selected,
            ..item.clone()
        })
        .collect()
}
