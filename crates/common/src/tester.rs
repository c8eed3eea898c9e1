//! Tester identity for imported reports
//!
//! Exported files are named `test-plan-<title>-tester-<name>.json`, so the
//! tester can usually be recovered from the filename alone. Reports where
//! that fails wait in a pending queue until a name is supplied by hand.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::TestPath;

static TESTER_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)-tester-(.*?)(?:\.json|$)").expect("static regex"));

/// Tester name encoded in `filename`, if any.
///
/// `plan-tester-jane-doe.json` yields `Jane doe`.
pub fn tester_name_from_filename(filename: &str) -> Option<String> {
    let segment = TESTER_SEGMENT.captures(filename)?.get(1)?.as_str();
    if segment.is_empty() {
        return None;
    }
    let name = segment.replace('-', " ");
    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Which collection a report was imported for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportContext {
    Main,
    Comparison,
}

/// A report held back until its tester is named
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAssignment {
    pub report: TestPath,
    pub filename: String,
    pub context: ImportContext,
}

/// Attach the filename-derived tester to a report that has none.
/// Returns the report unchanged when it already names its tester.
pub fn enrich(report: TestPath, filename: &str) -> TestPath {
    if report.tester().is_some() {
        return report;
    }
    match tester_name_from_filename(filename) {
        Some(name) => TestPath {
            tester_name: Some(name),
            ..report
        },
        None => report,
    }
}

/// Distinct filenames in the queue, in first-seen order
pub fn pending_filenames(pending: &[PendingAssignment]) -> Vec<String> {
    let mut seen = Vec::new();
    for p in pending {
        if !seen.contains(&p.filename) {
            seen.push(p.filename.clone());
        }
    }
    seen
}

/// Reports resolved from the pending queue, split by destination
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedReports {
    pub main: Vec<TestPath>,
    pub comparison: Vec<TestPath>,
}

/// Apply hand-entered names to the queue.
///
/// Every distinct pending filename needs a non-blank name; otherwise nothing
/// is resolved and the missing filenames are reported.
pub fn resolve_pending(
    pending: &[PendingAssignment],
    names: &HashMap<String, String>,
) -> Result<ResolvedReports> {
    let mut trimmed = BTreeMap::new();
    let mut missing = Vec::new();
    for filename in pending_filenames(pending) {
        match names.get(&filename).map(|n| n.trim()).filter(|n| !n.is_empty()) {
            Some(name) => {
                trimmed.insert(filename, name.to_string());
            }
            None => missing.push(filename),
        }
    }
    if !missing.is_empty() {
        return Err(Error::MissingTesterNames(missing));
    }

    let mut resolved = ResolvedReports::default();
    for p in pending {
        let report = TestPath {
            tester_name: trimmed.get(&p.filename).cloned(),
            ..p.report.clone()
        };
        match p.context {
            ImportContext::Main => resolved.main.push(report),
            ImportContext::Comparison => resolved.comparison.push(report),
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("plan-tester-jane-doe.json", Some("Jane doe") ; "hyphenated name")]
    #[test_case("test-plan-checkout-tester-max.JSON", Some("Max") ; "uppercase extension")]
    #[test_case("Report-TESTER-anna-lena", Some("Anna lena") ; "no extension")]
    #[test_case("plan-tester-.json", None ; "empty segment")]
    #[test_case("plan.json", None ; "no marker")]
    #[test_case("tester-jane.json", None ; "marker needs leading hyphen")]
    fn test_tester_name_from_filename(filename: &str, expected: Option<&str>) {
        assert_eq!(tester_name_from_filename(filename).as_deref(), expected);
    }

    #[test]
    fn test_enrich_keeps_existing_name() {
        let report = TestPath {
            tester_name: Some("Bob".to_string()),
            ..TestPath::new(1, "Plan")
        };
        let enriched = enrich(report, "plan-tester-alice.json");
        assert_eq!(enriched.tester_name.as_deref(), Some("Bob"));

        let anonymous = enrich(TestPath::new(1, "Plan"), "plan-tester-alice.json");
        assert_eq!(anonymous.tester_name.as_deref(), Some("Alice"));
    }

    fn pending(filename: &str, context: ImportContext) -> PendingAssignment {
        PendingAssignment {
            report: TestPath::new(1, "Plan"),
            filename: filename.to_string(),
            context,
        }
    }

    #[test]
    fn test_resolve_requires_every_name() {
        let queue = vec![
            pending("a.json", ImportContext::Main),
            pending("b.json", ImportContext::Main),
        ];
        let names = HashMap::from([
            ("a.json".to_string(), "Ann".to_string()),
            ("b.json".to_string(), "   ".to_string()),
        ]);
        match resolve_pending(&queue, &names) {
            Err(Error::MissingTesterNames(missing)) => assert_eq!(missing, vec!["b.json"]),
            other => panic!("expected missing names, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_routes_by_context() {
        let queue = vec![
            pending("a.json", ImportContext::Main),
            pending("bulk.json", ImportContext::Comparison),
            pending("bulk.json", ImportContext::Comparison),
        ];
        assert_eq!(pending_filenames(&queue), vec!["a.json", "bulk.json"]);

        let names = HashMap::from([
            ("a.json".to_string(), " Ann ".to_string()),
            ("bulk.json".to_string(), "Ben".to_string()),
        ]);
        let resolved = resolve_pending(&queue, &names).unwrap();
        assert_eq!(resolved.main.len(), 1);
        assert_eq!(resolved.main[0].tester_name.as_deref(), Some("Ann"));
        assert_eq!(resolved.comparison.len(), 2);
        assert!(resolved
            .comparison
            .iter()
            .all(|r| r.tester_name.as_deref() == Some("Ben")));
    }
}
