//! Core types for Testplan

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of a single checklist item.
///
/// Serialized with the labels the tracker has written since its first
/// German release; English labels from older exports are mapped by the
/// migrator before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    #[serde(rename = "Nicht begonnen")]
    NotStarted,
    #[serde(rename = "In Bearbeitung")]
    InProgress,
    #[serde(rename = "Bestanden")]
    Passed,
    #[serde(rename = "Fehlgeschlagen")]
    Failed,
}

impl TestStatus {
    pub const ALL: [TestStatus; 4] = [
        TestStatus::NotStarted,
        TestStatus::InProgress,
        TestStatus::Passed,
        TestStatus::Failed,
    ];

    /// Wire label of the status
    pub fn label(&self) -> &'static str {
        match self {
            TestStatus::NotStarted => "Nicht begonnen",
            TestStatus::InProgress => "In Bearbeitung",
            TestStatus::Passed => "Bestanden",
            TestStatus::Failed => "Fehlgeschlagen",
        }
    }

    /// Parse a wire label. Only current labels are accepted.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Passed and Failed are terminal; everything else is still open.
    pub fn is_done(&self) -> bool {
        matches!(self, TestStatus::Passed | TestStatus::Failed)
    }
}

impl Default for TestStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TestStatus {
    type Err = String;

    /// Accepts wire labels, legacy English labels and short keywords
    /// (`not-started`, `in-progress`, `passed`, `failed`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(status) = Self::from_label(s) {
            return Ok(status);
        }
        if let Some(status) = crate::migrate::legacy_status(s) {
            return Ok(status);
        }
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "not-started" | "notstarted" | "reset" => Ok(TestStatus::NotStarted),
            "in-progress" | "inprogress" | "wip" => Ok(TestStatus::InProgress),
            "passed" | "pass" | "ok" => Ok(TestStatus::Passed),
            "failed" | "fail" => Ok(TestStatus::Failed),
            _ => Err(format!("unknown status '{}'", s)),
        }
    }
}

/// One checklist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestItem {
    pub id: i64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub status: TestStatus,
    /// Rich-text comment as an HTML fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Screenshots as `data:image/...;base64,` URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_images: Option<Vec<String>>,
}

impl TestItem {
    pub fn new(id: i64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            details: None,
            status: TestStatus::NotStarted,
            comment: None,
            comment_images: None,
        }
    }

    /// Returns a copy with `status` applied. Resetting to NotStarted drops
    /// the comment and every attachment in the same step.
    pub fn with_status(&self, status: TestStatus) -> Self {
        let mut item = self.clone();
        item.status = status;
        if status == TestStatus::NotStarted {
            item.comment = None;
            item.comment_images = None;
        }
        item
    }

    /// Attachments, empty when none are present
    pub fn images(&self) -> &[String] {
        self.comment_images.as_deref().unwrap_or(&[])
    }

    /// True when the item carries a non-empty comment or at least one image
    pub fn has_annotation(&self) -> bool {
        self.comment.as_deref().is_some_and(|c| !c.is_empty()) || !self.images().is_empty()
    }
}

/// One test plan / checklist, optionally attributed to a tester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPath {
    pub id: i64,
    pub title: String,
    pub items: Vec<TestItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tester_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_timestamp: Option<String>,
}

impl TestPath {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            items: Vec::new(),
            tester_name: None,
            export_timestamp: None,
        }
    }

    pub fn summary(&self) -> PathSummary {
        PathSummary::from_items(&self.items)
    }

    pub fn item(&self, item_id: i64) -> Option<&TestItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Tester name when present and non-empty
    pub fn tester(&self) -> Option<&str> {
        self.tester_name.as_deref().filter(|n| !n.trim().is_empty())
    }

    /// Next free item id: one past the current maximum, or 0 for an empty path
    pub fn next_item_id(&self) -> i64 {
        self.items.iter().map(|i| i.id).max().map_or(0, |max| max + 1)
    }
}

/// Status counts for one path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub not_started: usize,
}

impl PathSummary {
    pub fn from_items(items: &[TestItem]) -> Self {
        let mut summary = Self::default();
        for item in items {
            summary.add(item.status);
        }
        summary
    }

    pub fn add(&mut self, status: TestStatus) {
        self.total += 1;
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::InProgress => self.in_progress += 1,
            TestStatus::NotStarted => self.not_started += 1,
        }
    }

    /// Items that are neither passed nor failed
    pub fn open(&self) -> usize {
        self.in_progress + self.not_started
    }

    /// Completion in whole percent, rounded half up
    pub fn completion(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let done = (self.passed + self.failed) as f64;
        (done / self.total as f64 * 100.0).round() as u32
    }

    /// Ready for export: at least one item and nothing open
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.open() == 0
    }

    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

/// Built-in working set used when no workspace file exists yet
pub fn default_test_paths() -> Vec<TestPath> {
    let plan = |id: i64, title: &str, steps: &[&str]| TestPath {
        items: steps
            .iter()
            .enumerate()
            .map(|(index, desc)| TestItem::new(index as i64, *desc))
            .collect(),
        ..TestPath::new(id, title)
    };

    vec![
        plan(1, "Test Plan 1", &["Testfall 1"]),
        plan(2, "Test Plan 2", &["Testfall 1", "Testfall 2"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_labels() {
        let json = serde_json::to_string(&TestStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Bearbeitung\"");

        let parsed: TestStatus = serde_json::from_str("\"Fehlgeschlagen\"").unwrap();
        assert_eq!(parsed, TestStatus::Failed);
    }

    #[test]
    fn test_status_from_str_keywords() {
        assert_eq!("passed".parse::<TestStatus>().unwrap(), TestStatus::Passed);
        assert_eq!("In Progress".parse::<TestStatus>().unwrap(), TestStatus::InProgress);
        assert_eq!("Bestanden".parse::<TestStatus>().unwrap(), TestStatus::Passed);
        assert!("done-ish".parse::<TestStatus>().is_err());
    }

    #[test]
    fn test_reset_clears_comment_and_images() {
        for prior in TestStatus::ALL {
            let item = TestItem {
                status: prior,
                comment: Some("<p>broken</p>".to_string()),
                comment_images: Some(vec!["data:image/png;base64,iVBORw0KGgo".to_string()]),
                ..TestItem::new(3, "Login")
            };

            let reset = item.with_status(TestStatus::NotStarted);
            assert_eq!(reset.status, TestStatus::NotStarted);
            assert!(reset.comment.is_none(), "comment kept after reset from {prior}");
            assert!(reset.comment_images.is_none(), "images kept after reset from {prior}");
        }
    }

    #[test]
    fn test_status_change_keeps_comment() {
        let item = TestItem {
            comment: Some("note".to_string()),
            ..TestItem::new(0, "Step")
        };
        let updated = item.with_status(TestStatus::Failed);
        assert_eq!(updated.comment.as_deref(), Some("note"));
    }

    #[test]
    fn test_summary_completion() {
        let mut items = vec![
            TestItem::new(0, "a").with_status(TestStatus::Passed),
            TestItem::new(1, "b").with_status(TestStatus::Failed),
            TestItem::new(2, "c"),
        ];
        let summary = PathSummary::from_items(&items);
        assert_eq!(summary.completion(), 67);
        assert_eq!(summary.open(), 1);
        assert!(!summary.is_complete());

        items[2] = items[2].with_status(TestStatus::Passed);
        assert!(PathSummary::from_items(&items).is_complete());
        assert!(!PathSummary::default().is_complete());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let path = TestPath::new(1, "Plan");
        let value = serde_json::to_value(&path).unwrap();
        assert!(value.get("testerName").is_none());
        assert!(value.get("exportTimestamp").is_none());
        assert_eq!(value["items"], serde_json::json!([]));
    }

    #[test]
    fn test_default_paths() {
        let paths = default_test_paths();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1].items.len(), 2);
        assert_eq!(paths[1].next_item_id(), 2);
    }
}
