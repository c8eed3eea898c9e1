//! CLI Commands

pub mod admin;
pub mod attachments;
pub mod compare;
pub mod config;
pub mod import;
pub mod plan;

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};

use testplan_common::tester::pending_filenames;
use testplan_common::{Action, AppState, ImportBatch, TrackerConfig};

use crate::output::{print_error, print_warning, OutputFormat};
use crate::prompt;
use crate::workspace::Workspace;

/// What every command gets to work with
pub struct Context {
    pub workspace: Workspace,
    pub config: TrackerConfig,
    pub config_path: std::path::PathBuf,
    pub format: OutputFormat,
}

/// Make the path with `path_id` the active one
pub fn select(state: AppState, path_id: i64) -> Result<AppState> {
    let index = state
        .working_set
        .iter()
        .position(|p| p.id == path_id)
        .ok_or_else(|| anyhow!("no test path with id {}", path_id))?;
    Ok(state.apply(Action::SelectPath(index))?)
}

/// Parse repeated `FILE=NAME` arguments
pub fn parse_names(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut names = HashMap::new();
    for pair in pairs {
        let Some((file, name)) = pair.split_once('=') else {
            bail!("expected FILE=NAME, got '{}'", pair);
        };
        names.insert(file.trim().to_string(), name.trim().to_string());
    }
    Ok(names)
}

/// Print every file the batch could not use
pub fn report_failures(batch: &ImportBatch) {
    for failure in &batch.failures {
        print_error(&failure.to_string());
    }
}

/// Resolve the pending queue: names given on the command line first, the
/// rest asked for interactively. An empty answer discards the queue.
pub fn settle_pending(state: AppState, given: HashMap<String, String>) -> Result<AppState> {
    if state.pending.is_empty() {
        return Ok(state);
    }
    let files = pending_filenames(&state.pending);
    match prompt::stdin_tester_names(&files, given)? {
        Some(names) => Ok(state.apply(Action::ConfirmTesterNames(names))?),
        None => {
            print_warning(&format!(
                "{} report(s) discarded: no tester name given",
                state.pending.len()
            ));
            Ok(state.apply(Action::CancelTesterNames)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        let names = parse_names(&["a.json= Ann ".to_string(), "b.json=Ben".to_string()]).unwrap();
        assert_eq!(names["a.json"], "Ann");
        assert_eq!(names["b.json"], "Ben");
        assert!(parse_names(&["no-separator".to_string()]).is_err());
    }

    #[test]
    fn test_select_by_id() {
        let state = select(AppState::default(), 2).unwrap();
        assert_eq!(state.active_index, 1);
        assert!(select(AppState::default(), 99).is_err());
    }
}
