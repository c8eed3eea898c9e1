//! Working-set administration: paths and their items

use anyhow::Result;
use clap::Subcommand;

use testplan_common::{Action, AppState};

use super::Context;
use crate::output::print_success;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Add an empty test path
    Add {
        /// Title
        title: String,
    },

    /// Rename a test path
    Rename {
        /// Test path ID
        path: i64,

        /// New title
        title: String,
    },

    /// Delete a test path
    Delete {
        /// Test path ID
        path: i64,
    },

    /// Append an item to a test path
    AddItem {
        /// Test path ID
        path: i64,

        /// Item description
        description: String,
    },

    /// Change an item's description
    EditItem {
        /// Test path ID
        path: i64,

        /// Item ID
        item: i64,

        /// New description
        description: String,
    },

    /// Remove an item from a test path
    RemoveItem {
        /// Test path ID
        path: i64,

        /// Item ID
        item: i64,
    },

    /// Move an item to another position (1-based)
    MoveItem {
        /// Test path ID
        path: i64,

        /// Current position
        from: usize,

        /// New position
        to: usize,
    },
}

/// The state action for an admin command and the message shown once it is saved
fn plan(cmd: AdminCommands, state: &AppState) -> Result<(Action, String)> {
    Ok(match cmd {
        AdminCommands::Add { title } => {
            let message = format!("Added test path '{}'", title.trim());
            (Action::AddPath(title), message)
        }
        AdminCommands::Rename { path, title } => {
            let message = format!("Renamed test path {} to '{}'", path, title.trim());
            (Action::RenamePath { path_id: path, title }, message)
        }
        AdminCommands::Delete { path } => {
            let title = state.path(path).map(|p| p.title.clone()).unwrap_or_default();
            (Action::DeletePath(path), format!("Deleted test path {} '{}'", path, title))
        }
        AdminCommands::AddItem { path, description } => {
            let id = state.path(path).map(|p| p.next_item_id()).unwrap_or_default();
            let message = format!("Added item {} to test path {}", id, path);
            (
                Action::AddItem {
                    path_id: path,
                    description,
                },
                message,
            )
        }
        AdminCommands::EditItem { path, item, description } => (
            Action::UpdateItemDescription {
                path_id: path,
                item_id: item,
                description,
            },
            format!("Updated item {} of test path {}", item, path),
        ),
        AdminCommands::RemoveItem { path, item } => (
            Action::DeleteItem {
                path_id: path,
                item_id: item,
            },
            format!("Removed item {} from test path {}", item, path),
        ),
        AdminCommands::MoveItem { path, from, to } => {
            anyhow::ensure!(from > 0 && to > 0, "positions start at 1");
            (
                Action::MoveItem {
                    path_id: path,
                    from: from - 1,
                    to: to - 1,
                },
                format!("Moved item at position {} to {} in test path {}", from, to, path),
            )
        }
    })
}

pub async fn execute(cmd: AdminCommands, ctx: &Context) -> Result<()> {
    let state = ctx.workspace.load()?;
    let (action, message) = plan(cmd, &state)?;
    let state = state.apply(action)?;
    ctx.workspace.save(&state)?;
    print_success(&message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_positions_are_one_based() {
        let state = AppState::default();
        let (action, _) = plan(AdminCommands::MoveItem { path: 2, from: 2, to: 1 }, &state).unwrap();
        assert_eq!(action, Action::MoveItem { path_id: 2, from: 1, to: 0 });

        let moved = state.apply(action).unwrap();
        let ids: Vec<_> = moved.path(2).unwrap().items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 0]);

        assert!(plan(AdminCommands::MoveItem { path: 2, from: 0, to: 1 }, &AppState::default()).is_err());
    }

    #[test]
    fn test_add_item_message_names_new_id() {
        let (_, message) = plan(
            AdminCommands::AddItem {
                path: 2,
                description: "Testfall 3".to_string(),
            },
            &AppState::default(),
        )
        .unwrap();
        assert_eq!(message, "Added item 2 to test path 2");
    }
}
