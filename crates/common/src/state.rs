//! Application state and its transitions
//!
//! Every user action is an [`Action`]; [`AppState::apply`] consumes the old
//! state and returns the next one, so callers commit a transition only by
//! keeping its result. Replaying the same actions from the same state always
//! yields the same state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::import::ImportBatch;
use crate::merge::{append_to_comparison, merge_into_working_set, next_path_id, with_unique_ids};
use crate::tester::{resolve_pending, ImportContext, PendingAssignment};
use crate::types::{default_test_paths, TestItem, TestPath, TestStatus};

/// Everything the tracker knows during a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub working_set: Vec<TestPath>,
    pub active_index: usize,
    /// Name of the person running tests in this session
    pub tester_name: Option<String>,
    pub comparison: Vec<TestPath>,
    pub comparison_mode: bool,
    pub pending: Vec<PendingAssignment>,
    /// Indices into `comparison` picked for a side-by-side diff
    pub diff_selection: Vec<usize>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_working_set(default_test_paths())
    }
}

/// A single user action
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectPath(usize),
    SetTesterName(String),
    SetStatus { item_id: i64, status: TestStatus },
    SaveComment { item_id: i64, comment: Option<String>, images: Vec<String> },
    ImportMain(ImportBatch),
    /// Start a fresh comparison; drops the previous comparison set
    BeginComparison,
    ImportComparison(ImportBatch),
    ConfirmTesterNames(HashMap<String, String>),
    CancelTesterNames,
    CloseComparison,
    ToggleDiffSelection(usize),
    AddPath(String),
    RenamePath { path_id: i64, title: String },
    DeletePath(i64),
    AddItem { path_id: i64, description: String },
    UpdateItemDescription { path_id: i64, item_id: i64, description: String },
    DeleteItem { path_id: i64, item_id: i64 },
    MoveItem { path_id: i64, from: usize, to: usize },
    ReplaceWorkingSet { paths: Vec<TestPath>, confirmed: bool },
}

impl AppState {
    pub fn with_working_set(working_set: Vec<TestPath>) -> Self {
        Self {
            working_set,
            active_index: 0,
            tester_name: None,
            comparison: Vec::new(),
            comparison_mode: false,
            pending: Vec::new(),
            diff_selection: Vec::new(),
        }
    }

    pub fn active_path(&self) -> Option<&TestPath> {
        self.working_set.get(self.active_index)
    }

    pub fn path(&self, path_id: i64) -> Option<&TestPath> {
        self.working_set.iter().find(|p| p.id == path_id)
    }

    /// Reports currently picked for a diff, in selection order
    pub fn selected_for_diff(&self) -> Vec<&TestPath> {
        self.diff_selection
            .iter()
            .filter_map(|&i| self.comparison.get(i))
            .collect()
    }

    /// Compute the state that follows `action`
    pub fn apply(self, action: Action) -> Result<Self> {
        debug!(?action, "applying action");
        match action {
            Action::SelectPath(index) => {
                if index >= self.working_set.len() {
                    return Err(Error::not_found("test path at position", index));
                }
                Ok(Self {
                    active_index: index,
                    ..self
                })
            }

            Action::SetTesterName(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(Error::InvalidInput("tester name must not be empty".to_string()));
                }
                Ok(Self {
                    tester_name: Some(name),
                    ..self
                })
            }

            Action::SetStatus { item_id, status } => {
                let index = self.require_active()?;
                self.update_item_at(index, item_id, |item| item.with_status(status))
            }

            Action::SaveComment { item_id, comment, images } => {
                let index = self.require_active()?;
                let comment = comment.filter(|c| !c.trim().is_empty());
                let images = if images.is_empty() { None } else { Some(images) };
                self.update_item_at(index, item_id, |item| TestItem {
                    comment: comment.clone(),
                    comment_images: images.clone(),
                    ..item.clone()
                })
            }

            Action::ImportMain(batch) => Ok(self.commit_batch(batch, ImportContext::Main)),

            Action::BeginComparison => Ok(Self {
                comparison: Vec::new(),
                diff_selection: Vec::new(),
                ..self
            }),

            Action::ImportComparison(batch) => Ok(self.commit_batch(batch, ImportContext::Comparison)),

            Action::ConfirmTesterNames(names) => {
                let resolved = resolve_pending(&self.pending, &names)?;
                let next = Self {
                    pending: Vec::new(),
                    ..self
                };
                let next = next.add_main(resolved.main);
                Ok(next.add_comparison(resolved.comparison))
            }

            Action::CancelTesterNames => {
                debug!(discarded = self.pending.len(), "tester naming cancelled");
                Ok(Self {
                    pending: Vec::new(),
                    ..self
                })
            }

            Action::CloseComparison => Ok(Self {
                comparison: Vec::new(),
                comparison_mode: false,
                diff_selection: Vec::new(),
                ..self
            }),

            Action::ToggleDiffSelection(index) => {
                if index >= self.comparison.len() {
                    return Err(Error::not_found("comparison report at position", index));
                }
                let mut diff_selection = self.diff_selection.clone();
                match diff_selection.iter().position(|&i| i == index) {
                    Some(pos) => {
                        diff_selection.remove(pos);
                    }
                    None => diff_selection.push(index),
                }
                Ok(Self {
                    diff_selection,
                    ..self
                })
            }

            Action::AddPath(title) => {
                let title = non_blank(&title, "title")?;
                let mut working_set = self.working_set.clone();
                working_set.push(TestPath::new(next_path_id(&self.working_set), title));
                Ok(Self {
                    working_set,
                    ..self
                })
            }

            Action::RenamePath { path_id, title } => {
                let title = non_blank(&title, "title")?;
                self.update_path(path_id, |path| {
                    if path.title == title {
                        return Ok(path.clone());
                    }
                    Ok(TestPath {
                        title: title.clone(),
                        ..path.clone()
                    })
                })
            }

            Action::DeletePath(path_id) => {
                if self.path(path_id).is_none() {
                    return Err(Error::not_found("test path", path_id));
                }
                let working_set: Vec<TestPath> = self
                    .working_set
                    .iter()
                    .filter(|p| p.id != path_id)
                    .cloned()
                    .collect();
                let active_index = if self.active_index >= working_set.len() {
                    working_set.len().saturating_sub(1)
                } else {
                    self.active_index
                };
                Ok(Self {
                    working_set,
                    active_index,
                    ..self
                })
            }

            Action::AddItem { path_id, description } => {
                let description = non_blank(&description, "description")?;
                self.update_path(path_id, |path| {
                    let mut items = path.items.clone();
                    items.push(TestItem::new(path.next_item_id(), description.clone()));
                    Ok(TestPath {
                        items,
                        ..path.clone()
                    })
                })
            }

            Action::UpdateItemDescription { path_id, item_id, description } => {
                let index = self
                    .working_set
                    .iter()
                    .position(|p| p.id == path_id)
                    .ok_or_else(|| Error::not_found("test path", path_id))?;
                self.update_item_at(index, item_id, |item| TestItem {
                    description: description.clone(),
                    ..item.clone()
                })
            }

            Action::DeleteItem { path_id, item_id } => self.update_path(path_id, |path| {
                if path.item(item_id).is_none() {
                    return Err(Error::not_found("item", item_id));
                }
                Ok(TestPath {
                    items: path.items.iter().filter(|i| i.id != item_id).cloned().collect(),
                    ..path.clone()
                })
            }),

            Action::MoveItem { path_id, from, to } => self.update_path(path_id, |path| {
                let len = path.items.len();
                if from >= len || to >= len {
                    return Err(Error::InvalidInput(format!(
                        "cannot move item {} to {} in a list of {}",
                        from, to, len
                    )));
                }
                let mut items = path.items.clone();
                let moved = items.remove(from);
                items.insert(to, moved);
                Ok(TestPath {
                    items,
                    ..path.clone()
                })
            }),

            Action::ReplaceWorkingSet { paths, confirmed } => {
                if !confirmed {
                    return Err(Error::ConfirmationRequired(format!(
                        "replacing {} test path(s) with {} imported one(s) cannot be undone",
                        self.working_set.len(),
                        paths.len()
                    )));
                }
                info!(paths = paths.len(), "working set replaced");
                Ok(Self {
                    working_set: with_unique_ids(paths),
                    active_index: 0,
                    ..self
                })
            }
        }
    }

    /// Apply a sequence of actions, stopping at the first error
    pub fn replay(self, actions: impl IntoIterator<Item = Action>) -> Result<Self> {
        actions.into_iter().try_fold(self, |state, action| state.apply(action))
    }

    fn require_active(&self) -> Result<usize> {
        self.active_path()
            .map(|_| self.active_index)
            .ok_or_else(|| Error::InvalidInput("no test path selected".to_string()))
    }

    fn update_path<F>(self, path_id: i64, f: F) -> Result<Self>
    where
        F: Fn(&TestPath) -> Result<TestPath>,
    {
        let position = self
            .working_set
            .iter()
            .position(|p| p.id == path_id)
            .ok_or_else(|| Error::not_found("test path", path_id))?;
        self.update_at(position, f)
    }

    fn update_at<F>(self, position: usize, f: F) -> Result<Self>
    where
        F: Fn(&TestPath) -> Result<TestPath>,
    {
        let mut working_set = self.working_set.clone();
        working_set[position] = f(&self.working_set[position])?;
        Ok(Self {
            working_set,
            ..self
        })
    }

    fn update_item_at<F>(self, position: usize, item_id: i64, f: F) -> Result<Self>
    where
        F: Fn(&TestItem) -> TestItem,
    {
        self.update_at(position, |path| {
            if path.item(item_id).is_none() {
                return Err(Error::not_found("item", item_id));
            }
            Ok(TestPath {
                items: path
                    .items
                    .iter()
                    .map(|i| if i.id == item_id { f(i) } else { i.clone() })
                    .collect(),
                ..path.clone()
            })
        })
    }

    fn commit_batch(self, batch: ImportBatch, context: ImportContext) -> Self {
        let ImportBatch { complete, pending, .. } = batch;
        let next = match context {
            ImportContext::Main => self.add_main(complete),
            ImportContext::Comparison => self.add_comparison(complete),
        };
        if pending.is_empty() {
            return next;
        }
        let mut queue = next.pending.clone();
        queue.extend(pending.into_iter().map(|p| PendingAssignment { context, ..p }));
        Self {
            pending: queue,
            ..next
        }
    }

    fn add_main(self, reports: Vec<TestPath>) -> Self {
        if reports.is_empty() {
            return self;
        }
        info!(reports = reports.len(), "adding reports to working set");
        Self {
            working_set: merge_into_working_set(&self.working_set, reports),
            ..self
        }
    }

    fn add_comparison(self, reports: Vec<TestPath>) -> Self {
        if reports.is_empty() {
            return self;
        }
        info!(reports = reports.len(), "adding reports to comparison");
        Self {
            comparison: append_to_comparison(&self.comparison, reports),
            comparison_mode: true,
            ..self
        }
    }
}

fn non_blank(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ImportBatch;

    fn report(title: &str, tester: Option<&str>) -> TestPath {
        TestPath {
            items: vec![TestItem::new(0, "Step 1")],
            tester_name: tester.map(str::to_string),
            ..TestPath::new(1, title)
        }
    }

    fn batch(context: ImportContext, complete: Vec<TestPath>, pending: Vec<(&str, TestPath)>) -> ImportBatch {
        ImportBatch {
            context,
            complete,
            pending: pending
                .into_iter()
                .map(|(filename, report)| PendingAssignment {
                    report,
                    filename: filename.to_string(),
                    context,
                })
                .collect(),
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_status_reset_clears_annotations() {
        let state = AppState::default()
            .replay([
                Action::SetStatus { item_id: 0, status: TestStatus::Failed },
                Action::SaveComment {
                    item_id: 0,
                    comment: Some("<b>crash</b>".to_string()),
                    images: vec!["data:image/png;base64,AA".to_string()],
                },
                Action::SetStatus { item_id: 0, status: TestStatus::NotStarted },
            ])
            .unwrap();
        let item = &state.working_set[0].items[0];
        assert_eq!(item.status, TestStatus::NotStarted);
        assert!(item.comment.is_none());
        assert!(item.comment_images.is_none());
    }

    #[test]
    fn test_apply_leaves_previous_state_intact() {
        let before = AppState::default();
        let after = before
            .clone()
            .apply(Action::SetStatus { item_id: 0, status: TestStatus::Passed })
            .unwrap();
        assert_eq!(before.working_set[0].items[0].status, TestStatus::NotStarted);
        assert_eq!(after.working_set[0].items[0].status, TestStatus::Passed);
    }

    #[test]
    fn test_unknown_item_is_error() {
        let err = AppState::default()
            .apply(Action::SetStatus { item_id: 99, status: TestStatus::Passed })
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_main_import_merges_and_queues() {
        let state = AppState::default()
            .apply(Action::ImportMain(batch(
                ImportContext::Main,
                vec![report("Test Plan 1", Some("Ann"))],
                vec![("anon.json", report("Fresh", None))],
            )))
            .unwrap();
        assert_eq!(state.working_set.len(), 3);
        assert_eq!(state.working_set[2].title, "Test Plan 1 (1)");
        assert_eq!(state.working_set[2].id, 3);
        assert_eq!(state.pending.len(), 1);
        assert!(!state.comparison_mode);

        let state = state
            .apply(Action::ConfirmTesterNames(HashMap::from([(
                "anon.json".to_string(),
                "Bea".to_string(),
            )])))
            .unwrap();
        assert!(state.pending.is_empty());
        assert_eq!(state.working_set[3].title, "Fresh");
        assert_eq!(state.working_set[3].tester_name.as_deref(), Some("Bea"));
    }

    #[test]
    fn test_confirm_with_blank_name_keeps_queue() {
        let state = AppState::default()
            .apply(Action::ImportMain(batch(
                ImportContext::Main,
                vec![],
                vec![("anon.json", report("Fresh", None))],
            )))
            .unwrap();
        let err = state
            .clone()
            .apply(Action::ConfirmTesterNames(HashMap::new()))
            .unwrap_err();
        assert!(matches!(err, Error::MissingTesterNames(_)));

        let cancelled = state.apply(Action::CancelTesterNames).unwrap();
        assert!(cancelled.pending.is_empty());
        assert_eq!(cancelled.working_set.len(), 2);
    }

    #[test]
    fn test_comparison_lifecycle() {
        let state = AppState::default()
            .apply(Action::BeginComparison)
            .unwrap()
            .apply(Action::ImportComparison(batch(
                ImportContext::Comparison,
                vec![report("P", Some("Ann")), report("P", Some("Ann"))],
                vec![],
            )))
            .unwrap();
        assert!(state.comparison_mode);
        assert_eq!(state.comparison.len(), 2);
        assert_eq!(state.comparison[1].title, "P");
        assert_eq!(state.working_set.len(), 2);

        let state = state
            .apply(Action::ToggleDiffSelection(1))
            .unwrap()
            .apply(Action::ToggleDiffSelection(0))
            .unwrap();
        assert_eq!(state.diff_selection, vec![1, 0]);
        let state = state.apply(Action::ToggleDiffSelection(1)).unwrap();
        assert_eq!(state.diff_selection, vec![0]);

        let restarted = state.clone().apply(Action::BeginComparison).unwrap();
        assert!(restarted.comparison.is_empty());

        let closed = state.apply(Action::CloseComparison).unwrap();
        assert!(!closed.comparison_mode);
        assert!(closed.comparison.is_empty());
    }

    #[test]
    fn test_empty_comparison_import_keeps_mode_off() {
        let state = AppState::default()
            .apply(Action::ImportComparison(ImportBatch::new(ImportContext::Comparison)))
            .unwrap();
        assert!(!state.comparison_mode);
    }

    #[test]
    fn test_admin_edits() {
        let state = AppState::default()
            .replay([
                Action::AddPath("  Regression  ".to_string()),
                Action::AddItem { path_id: 3, description: "Boot".to_string() },
                Action::AddItem { path_id: 3, description: "Login".to_string() },
                Action::MoveItem { path_id: 3, from: 1, to: 0 },
                Action::UpdateItemDescription { path_id: 3, item_id: 0, description: "Cold boot".to_string() },
                Action::RenamePath { path_id: 3, title: "Smoke".to_string() },
            ])
            .unwrap();
        let path = state.path(3).unwrap();
        assert_eq!(path.title, "Smoke");
        let descriptions: Vec<_> = path.items.iter().map(|i| (i.id, i.description.as_str())).collect();
        assert_eq!(descriptions, vec![(1, "Login"), (0, "Cold boot")]);

        let state = state.apply(Action::DeleteItem { path_id: 3, item_id: 1 }).unwrap();
        assert_eq!(state.path(3).unwrap().items.len(), 1);

        assert!(state.clone().apply(Action::AddPath("   ".to_string())).is_err());
        assert!(state
            .clone()
            .apply(Action::MoveItem { path_id: 3, from: 0, to: 5 })
            .is_err());
    }

    #[test]
    fn test_delete_clamps_active_index() {
        let state = AppState::default()
            .apply(Action::SelectPath(1))
            .unwrap()
            .apply(Action::DeletePath(2))
            .unwrap();
        assert_eq!(state.active_index, 0);
        assert_eq!(state.working_set.len(), 1);

        let empty = state.apply(Action::DeletePath(1)).unwrap();
        assert!(empty.active_path().is_none());
        assert!(empty
            .apply(Action::SetStatus { item_id: 0, status: TestStatus::Passed })
            .is_err());
    }

    #[test]
    fn test_replace_requires_confirmation() {
        let replacement = vec![report("Only", None)];
        let err = AppState::default()
            .apply(Action::ReplaceWorkingSet { paths: replacement.clone(), confirmed: false })
            .unwrap_err();
        assert!(matches!(err, Error::ConfirmationRequired(_)));

        let state = AppState::default()
            .apply(Action::SelectPath(1))
            .unwrap()
            .apply(Action::ReplaceWorkingSet { paths: replacement, confirmed: true })
            .unwrap();
        assert_eq!(state.working_set.len(), 1);
        assert_eq!(state.active_index, 0);
    }

    #[test]
    fn test_status_edits_active_path_when_ids_repeat() {
        let paths = vec![report("Test Plan 1", Some("Ann")), report("Test Plan 1", Some("Ben"))];
        let state = AppState::with_working_set(paths)
            .apply(Action::SelectPath(1))
            .unwrap()
            .apply(Action::SetStatus { item_id: 0, status: TestStatus::Passed })
            .unwrap();
        assert_eq!(state.working_set[0].items[0].status, TestStatus::NotStarted);
        assert_eq!(state.working_set[1].items[0].status, TestStatus::Passed);

        let state = state
            .apply(Action::SaveComment { item_id: 0, comment: Some("ok".to_string()), images: Vec::new() })
            .unwrap();
        assert_eq!(state.working_set[0].items[0].comment, None);
        assert_eq!(state.working_set[1].items[0].comment.as_deref(), Some("ok"));
    }

    #[test]
    fn test_replace_renumbers_repeated_ids() {
        let state = AppState::default()
            .apply(Action::ReplaceWorkingSet {
                paths: vec![report("Test Plan 1", Some("Ann")), report("Test Plan 1", Some("Ben"))],
                confirmed: true,
            })
            .unwrap();
        let ids: Vec<_> = state.working_set.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(state.path(2).unwrap().tester_name.as_deref(), Some("Ben"));
    }
}
