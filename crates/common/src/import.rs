//! Report import pipeline
//!
//! bytes → JSON → migration → validation → tester enrichment.
//!
//! A batch is read concurrently and only handed back once every file has
//! been read. Failures are per file and never abort the rest of the batch.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::migrate::Migrator;
use crate::tester::{enrich, ImportContext, PendingAssignment};
use crate::types::TestPath;
use crate::validate::{classify, ValidationError};

/// Why a file was left out of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ImportErrorKind {
    /// The file could not be read
    Read(String),
    /// The content is not JSON
    Parse(String),
    /// JSON that is neither a report nor an array of reports
    Validation(String),
}

/// A file that did not make it into the batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportFailure {
    pub filename: String,
    pub error: ImportErrorKind,
}

impl std::fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error {
            ImportErrorKind::Read(e) => write!(f, "could not read {}: {}", self.filename, e),
            ImportErrorKind::Parse(e) => write!(f, "failed to parse {}: {}", self.filename, e),
            ImportErrorKind::Validation(e) => {
                write!(f, "{} is not a valid test plan ({})", self.filename, e)
            }
        }
    }
}

/// Accepted reports of one file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedFile {
    pub filename: String,
    pub reports: Vec<TestPath>,
}

/// Outcome of one import batch
#[derive(Debug, Clone, PartialEq)]
pub struct ImportBatch {
    pub context: ImportContext,
    /// Reports that carry a tester name and can be committed
    pub complete: Vec<TestPath>,
    /// Reports that still need a tester name
    pub pending: Vec<PendingAssignment>,
    pub failures: Vec<ImportFailure>,
}

impl ImportBatch {
    pub fn new(context: ImportContext) -> Self {
        Self {
            context,
            complete: Vec::new(),
            pending: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Collect per-file results, splitting reports by whether a tester is known
    pub fn from_results(
        context: ImportContext,
        results: Vec<std::result::Result<ImportedFile, ImportFailure>>,
    ) -> Self {
        let mut batch = Self::new(context);
        for result in results {
            match result {
                Ok(file) => {
                    for report in file.reports {
                        if report.tester().is_some() {
                            batch.complete.push(report);
                        } else {
                            batch.pending.push(PendingAssignment {
                                report,
                                filename: file.filename.clone(),
                                context,
                            });
                        }
                    }
                }
                Err(failure) => batch.failures.push(failure),
            }
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.complete.is_empty() && self.pending.is_empty()
    }
}

/// Turns raw file content into validated reports
#[derive(Debug, Clone, Default)]
pub struct Importer {
    migrator: Migrator,
}

/// Byte order mark some editors put in front of UTF-8 files
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

impl Importer {
    pub fn new(migrator: Migrator) -> Self {
        Self { migrator }
    }

    /// Parse, migrate, validate and enrich the content of one file
    pub fn import_bytes(&self, filename: &str, bytes: &[u8]) -> std::result::Result<ImportedFile, ImportFailure> {
        let fail = |error| ImportFailure {
            filename: filename.to_string(),
            error,
        };

        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let document: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| fail(ImportErrorKind::Parse(e.to_string())))?;
        let migrated = self.migrator.migrate(document);
        let shape = classify(migrated)
            .map_err(|e: ValidationError| fail(ImportErrorKind::Validation(e.to_string())))?;

        let reports: Vec<TestPath> = shape
            .into_reports()
            .into_iter()
            .map(|report| enrich(report, filename))
            .collect();
        debug!(file = %filename, reports = reports.len(), "imported file");

        Ok(ImportedFile {
            filename: filename.to_string(),
            reports,
        })
    }

    /// Read and import one file from disk
    pub async fn import_file(&self, path: &Path) -> std::result::Result<ImportedFile, ImportFailure> {
        let filename = display_name(path);
        match tokio::fs::read(path).await {
            Ok(bytes) => self.import_bytes(&filename, &bytes),
            Err(e) => Err(ImportFailure {
                filename,
                error: ImportErrorKind::Read(e.to_string()),
            }),
        }
    }

    /// Import every path concurrently; returns after all reads resolved
    pub async fn read_batch(&self, paths: &[PathBuf], context: ImportContext) -> ImportBatch {
        let results = join_all(paths.iter().map(|p| self.import_file(p))).await;
        let batch = ImportBatch::from_results(context, results);

        for failure in &batch.failures {
            warn!(file = %failure.filename, "{}", failure);
        }
        info!(
            files = paths.len(),
            complete = batch.complete.len(),
            pending = batch.pending.len(),
            failed = batch.failures.len(),
            "import batch read"
        );
        batch
    }
}

/// Filename shown to the user and used for tester inference
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_parse_failure() {
        let err = Importer::default().import_bytes("notes.txt", b"hello").unwrap_err();
        assert_eq!(err.filename, "notes.txt");
        assert!(matches!(err.error, ImportErrorKind::Parse(_)));
        assert!(err.to_string().contains("notes.txt"));
    }

    #[test]
    fn test_leading_bom_is_accepted() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(br#"{"id": 1, "title": "Plan", "items": []}"#);
        let file = Importer::default().import_bytes("plan.json", &bytes).unwrap();
        assert_eq!(file.reports[0].title, "Plan");
    }

    #[test]
    fn test_wrong_shape_is_validation_failure() {
        let err = Importer::default()
            .import_bytes("x.json", br#"{"id": 1, "items": []}"#)
            .unwrap_err();
        match err.error {
            ImportErrorKind::Validation(reason) => assert!(reason.contains("/title")),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_file_migrated_and_enriched() {
        let legacy = br#"{"id": 3, "title": "Plan", "items": [
            {"id": 0, "description": "Open app", "status": "Passed", "commentImages": ["iVBORw0KGgoAAA"]}
        ]}"#;
        let file = Importer::default()
            .import_bytes("plan-tester-jane-doe.json", legacy)
            .unwrap();
        let report = &file.reports[0];
        assert_eq!(report.tester_name.as_deref(), Some("Jane doe"));
        assert_eq!(report.items[0].status, crate::types::TestStatus::Passed);
        assert_eq!(
            report.items[0].images(),
            &["data:image/png;base64,iVBORw0KGgoAAA".to_string()]
        );
    }

    #[test]
    fn test_batch_splits_by_tester() {
        let importer = Importer::default();
        let named = importer
            .import_bytes("a.json", br#"{"id":1,"title":"A","items":[],"testerName":"Ann"}"#);
        let anonymous = importer.import_bytes("b.json", br#"[{"id":1,"title":"B","items":[]}]"#);
        let broken = importer.import_bytes("c.json", b"{");

        let batch = ImportBatch::from_results(ImportContext::Comparison, vec![named, anonymous, broken]);
        assert_eq!(batch.complete.len(), 1);
        assert_eq!(batch.pending.len(), 1);
        assert_eq!(batch.pending[0].filename, "b.json");
        assert_eq!(batch.pending[0].context, ImportContext::Comparison);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].filename, "c.json");
    }
}
