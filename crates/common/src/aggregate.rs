//! Cross-tester statistics over the comparison set
//!
//! Everything here is derived on demand from a slice of reports; nothing is
//! cached or mutated in place.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{PathSummary, TestItem, TestPath, TestStatus};

/// Tester label for runs that carry no name
pub const UNKNOWN_TESTER: &str = "Unbekannt";

/// Length of the failure ranking
pub const DEFAULT_TOP_FAILURES: usize = 5;

/// Comment and attachments one run left on an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunComment {
    pub tester_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comment_images: Vec<String>,
}

/// All runs of one checklist line within a title group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedItem {
    pub description: String,
    pub runs: usize,
    pub passed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub comments: Vec<RunComment>,
}

impl AggregatedItem {
    fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            runs: 0,
            passed: 0,
            failed: 0,
            in_progress: 0,
            not_started: 0,
            comments: Vec::new(),
        }
    }

    fn record(&mut self, item: &TestItem, tester: &str) {
        self.runs += 1;
        match item.status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::InProgress => self.in_progress += 1,
            TestStatus::NotStarted => self.not_started += 1,
        }
        if item.has_annotation() {
            self.comments.push(RunComment {
                tester_name: tester.to_string(),
                comment: item.comment.clone().filter(|c| !c.is_empty()),
                comment_images: item.images().to_vec(),
            });
        }
    }

    /// Pass rate over all runs in percent
    pub fn pass_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.passed as f64 / self.runs as f64 * 100.0
        }
    }

    /// Runs disagree when both passes and failures were recorded
    pub fn is_contested(&self) -> bool {
        self.passed > 0 && self.failed > 0
    }
}

/// Group every report titled `title` by item description.
///
/// Output order follows the first report with that title; descriptions that
/// only occur in later reports are not listed.
pub fn aggregate_title(reports: &[TestPath], title: &str, unknown_tester: &str) -> Vec<AggregatedItem> {
    let relevant: Vec<&TestPath> = reports.iter().filter(|r| r.title == title).collect();
    let Some(first) = relevant.first() else {
        return Vec::new();
    };

    let mut groups: HashMap<&str, AggregatedItem> = HashMap::new();
    for report in &relevant {
        let tester = report.tester().unwrap_or(unknown_tester);
        for item in &report.items {
            groups
                .entry(item.description.as_str())
                .or_insert_with(|| AggregatedItem::new(&item.description))
                .record(item, tester);
        }
    }

    let mut ordered = Vec::with_capacity(first.items.len());
    for item in &first.items {
        // Duplicate descriptions within the first report list the group once.
        if let Some(group) = groups.remove(item.description.as_str()) {
            ordered.push(group);
        }
    }
    ordered
}

/// One card per distinct title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedReport {
    pub title: String,
    /// Number of reports sharing the title
    pub tester_count: usize,
    pub items: Vec<AggregatedItem>,
}

impl AggregatedReport {
    /// Totals over every run of every item
    pub fn totals(&self) -> PathSummary {
        self.items.iter().fold(PathSummary::default(), |mut acc, item| {
            acc.total += item.runs;
            acc.passed += item.passed;
            acc.failed += item.failed;
            acc.in_progress += item.in_progress;
            acc.not_started += item.not_started;
            acc
        })
    }
}

/// Distinct titles in first-seen order
pub fn titles(reports: &[TestPath]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for report in reports {
        if !seen.contains(&report.title) {
            seen.push(report.title.clone());
        }
    }
    seen
}

pub fn aggregated_reports(reports: &[TestPath], unknown_tester: &str) -> Vec<AggregatedReport> {
    titles(reports)
        .into_iter()
        .map(|title| AggregatedReport {
            tester_count: reports.iter().filter(|r| r.title == title).count(),
            items: aggregate_title(reports, &title, unknown_tester),
            title,
        })
        .collect()
}

/// Status tally over every item of every report
pub fn overall_summary(reports: &[TestPath]) -> PathSummary {
    let mut summary = PathSummary::default();
    for item in reports.iter().flat_map(|r| r.items.iter()) {
        summary.add(item.status);
    }
    summary
}

/// Passed/failed counts per report, for bar charts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSeries {
    pub labels: Vec<String>,
    pub passed: Vec<usize>,
    pub failed: Vec<usize>,
}

pub fn performance_series(reports: &[TestPath]) -> PerformanceSeries {
    let mut series = PerformanceSeries::default();
    for report in reports {
        let summary = report.summary();
        series
            .labels
            .push(format!("{} ({})", report.title, report.tester().unwrap_or("N/A")));
        series.passed.push(summary.passed);
        series.failed.push(summary.failed);
    }
    series
}

/// A checklist line and how often it failed across the comparison set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCount {
    pub description: String,
    pub count: usize,
}

/// The `limit` most frequently failing descriptions. Equal counts keep the
/// order in which the descriptions first failed.
pub fn top_failures(reports: &[TestPath], limit: usize) -> Vec<FailureCount> {
    let mut counts: Vec<FailureCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for item in reports.iter().flat_map(|r| r.items.iter()) {
        if item.status != TestStatus::Failed {
            continue;
        }
        match index.get(item.description.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(item.description.as_str(), counts.len());
                counts.push(FailureCount {
                    description: item.description.clone(),
                    count: 1,
                });
            }
        }
    }
    // stable sort keeps first-encountered order among ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// One report's entry in a diff row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffCell {
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comment_images: Vec<String>,
}

/// Side-by-side view of the item at one position across selected reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRow {
    pub position: usize,
    /// Description from the first report that has an item at this position
    pub description: Option<String>,
    /// One cell per report; `None` where the report is shorter
    pub cells: Vec<Option<DiffCell>>,
    pub has_difference: bool,
    pub description_mismatch: bool,
}

/// Column headers for a diff: tester name, or `Bericht <n>` when absent
pub fn diff_headers(reports: &[&TestPath]) -> Vec<String> {
    reports
        .iter()
        .enumerate()
        .map(|(i, r)| {
            r.tester()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Bericht {}", i + 1))
        })
        .collect()
}

/// Compare reports item by item, by position
pub fn diff_rows(reports: &[&TestPath]) -> Vec<DiffRow> {
    let rows = reports.iter().map(|r| r.items.len()).max().unwrap_or(0);
    (0..rows)
        .map(|position| {
            let items: Vec<Option<&TestItem>> = reports.iter().map(|r| r.items.get(position)).collect();

            let mut statuses: Vec<TestStatus> = Vec::new();
            for item in items.iter().flatten() {
                if !statuses.contains(&item.status) {
                    statuses.push(item.status);
                }
            }

            let descriptions: Vec<&str> = items
                .iter()
                .flatten()
                .map(|i| i.description.as_str())
                .filter(|d| !d.is_empty())
                .collect();
            let description_mismatch = descriptions
                .first()
                .is_some_and(|first| descriptions.iter().any(|d| d.trim() != first.trim()));

            DiffRow {
                position,
                description: items.iter().flatten().next().map(|i| i.description.clone()),
                cells: items
                    .iter()
                    .map(|item| {
                        item.map(|i| DiffCell {
                            status: i.status,
                            comment: i.comment.clone(),
                            comment_images: i.images().to_vec(),
                        })
                    })
                    .collect(),
                has_difference: statuses.len() > 1,
                description_mismatch,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, description: &str, status: TestStatus) -> TestItem {
        TestItem {
            status,
            ..TestItem::new(id, description)
        }
    }

    fn report(title: &str, tester: Option<&str>, items: Vec<TestItem>) -> TestPath {
        TestPath {
            items,
            tester_name: tester.map(str::to_string),
            ..TestPath::new(1, title)
        }
    }

    #[test]
    fn test_runs_and_counts_by_description() {
        let reports = vec![
            report("Plan A", Some("Ann"), vec![item(0, "Step 1", TestStatus::Passed)]),
            report("Plan A", Some("Ben"), vec![item(7, "Step 1", TestStatus::Failed)]),
            report("Plan B", Some("Ben"), vec![item(0, "Step 1", TestStatus::Failed)]),
        ];
        let agg = aggregate_title(&reports, "Plan A", UNKNOWN_TESTER);
        assert_eq!(agg.len(), 1);
        assert_eq!(agg[0].runs, 2);
        assert_eq!(agg[0].passed, 1);
        assert_eq!(agg[0].failed, 1);
        assert!(agg[0].is_contested());
        assert_eq!(agg[0].pass_rate(), 50.0);
    }

    #[test]
    fn test_order_follows_first_report() {
        let first = report(
            "Plan",
            None,
            vec![item(0, "b", TestStatus::Passed), item(1, "a", TestStatus::Passed)],
        );
        let later = report(
            "Plan",
            None,
            vec![
                item(0, "a", TestStatus::Failed),
                item(1, "c", TestStatus::Failed),
                item(2, "b", TestStatus::Failed),
            ],
        );
        let agg = aggregate_title(&[first, later], "Plan", UNKNOWN_TESTER);
        let order: Vec<_> = agg.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_repeated_description_listed_once() {
        let reports = vec![
            report(
                "Plan",
                Some("Ann"),
                vec![item(0, "Retry", TestStatus::Passed), item(1, "Retry", TestStatus::Failed)],
            ),
            report("Plan", Some("Ben"), vec![item(0, "Retry", TestStatus::Failed)]),
        ];
        let agg = aggregate_title(&reports, "Plan", UNKNOWN_TESTER);
        assert_eq!(agg.len(), 1);
        assert_eq!(agg[0].runs, 3);
        assert_eq!(agg[0].passed, 1);
        assert_eq!(agg[0].failed, 2);
    }

    #[test]
    fn test_comments_only_from_annotated_runs() {
        let mut noted = item(0, "Step", TestStatus::Failed);
        noted.comment = Some("<p>crash</p>".to_string());
        let mut pictured = item(0, "Step", TestStatus::Failed);
        pictured.comment_images = Some(vec!["data:image/png;base64,AA".to_string()]);
        let mut empty_list = item(0, "Step", TestStatus::Passed);
        empty_list.comment_images = Some(Vec::new());

        let reports = vec![
            report("P", Some("Ann"), vec![noted]),
            report("P", None, vec![pictured]),
            report("P", Some("Cid"), vec![empty_list]),
        ];
        let agg = aggregate_title(&reports, "P", UNKNOWN_TESTER);
        let comments = &agg[0].comments;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].tester_name, "Ann");
        assert_eq!(comments[1].tester_name, "Unbekannt");
        assert_eq!(comments[1].comment_images.len(), 1);
    }

    #[test]
    fn test_unknown_title_is_empty() {
        assert!(aggregate_title(&[], "nope", UNKNOWN_TESTER).is_empty());
    }

    #[test]
    fn test_top_failures_ties_keep_first_seen() {
        let reports = vec![
            report(
                "P",
                None,
                vec![
                    item(0, "late", TestStatus::Failed),
                    item(1, "early", TestStatus::Failed),
                    item(2, "ok", TestStatus::Passed),
                ],
            ),
            report(
                "P",
                None,
                vec![item(0, "early", TestStatus::Failed), item(1, "tie", TestStatus::Failed)],
            ),
            report("Q", None, vec![item(0, "late", TestStatus::Failed)]),
        ];
        let top = top_failures(&reports, DEFAULT_TOP_FAILURES);
        let ranked: Vec<_> = top.iter().map(|f| (f.description.as_str(), f.count)).collect();
        assert_eq!(ranked, vec![("late", 2), ("early", 2), ("tie", 1)]);

        assert_eq!(top_failures(&reports, 1).len(), 1);
    }

    #[test]
    fn test_overall_and_series() {
        let reports = vec![
            report("P", Some("Ann"), vec![item(0, "a", TestStatus::Passed), item(1, "b", TestStatus::InProgress)]),
            report("Q", None, vec![item(0, "a", TestStatus::Failed)]),
        ];
        let overall = overall_summary(&reports);
        assert_eq!((overall.passed, overall.failed, overall.in_progress, overall.not_started), (1, 1, 1, 0));

        let series = performance_series(&reports);
        assert_eq!(series.labels, vec!["P (Ann)", "Q (N/A)"]);
        assert_eq!(series.passed, vec![1, 0]);
        assert_eq!(series.failed, vec![0, 1]);
    }

    #[test]
    fn test_aggregated_reports_per_title() {
        let reports = vec![
            report("B", None, vec![item(0, "x", TestStatus::Passed)]),
            report("A", None, vec![item(0, "x", TestStatus::Failed)]),
            report("B", None, vec![item(0, "x", TestStatus::Failed)]),
        ];
        let cards = aggregated_reports(&reports, UNKNOWN_TESTER);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "B");
        assert_eq!(cards[0].tester_count, 2);
        let totals = cards[0].totals();
        assert_eq!((totals.total, totals.passed, totals.failed), (2, 1, 1));
    }

    #[test]
    fn test_diff_rows() {
        let a = report("P", Some("Ann"), vec![item(0, "Login", TestStatus::Passed), item(1, "Pay", TestStatus::Passed)]);
        let b = report("P", None, vec![item(0, " Login ", TestStatus::Failed)]);
        let selected = vec![&a, &b];

        assert_eq!(diff_headers(&selected), vec!["Ann", "Bericht 2"]);

        let rows = diff_rows(&selected);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].has_difference);
        assert!(!rows[0].description_mismatch);
        assert_eq!(rows[1].description.as_deref(), Some("Pay"));
        assert!(rows[1].cells[1].is_none());
        assert!(!rows[1].has_difference);
    }
}
