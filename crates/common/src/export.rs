//! JSON exports and attachment extraction

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::media::DataUrl;
use crate::types::TestPath;

/// Filename of the full working-set backup
pub const BACKUP_FILENAME: &str = "test-plans-backup.json";

/// Lowercase, with every run of characters outside `[a-z0-9]` collapsed to `-`
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut in_gap = false;
    for c in value.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            in_gap = false;
        } else if !in_gap {
            slug.push('-');
            in_gap = true;
        }
    }
    slug
}

/// `test-plan-<title>-tester-<tester>.json`; the name the tester-name
/// resolver reads back on import
pub fn report_filename(title: &str, tester: &str) -> String {
    format!("test-plan-{}-tester-{}.json", slugify(title), slugify(tester))
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T10:00:00.000Z`
pub fn export_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The report as written to disk, with tester and timestamp injected.
///
/// Only complete paths are exported: every item passed or failed.
pub fn prepare_report_export(path: &TestPath, tester: &str, at: DateTime<Utc>) -> Result<TestPath> {
    let tester = tester.trim();
    if tester.is_empty() {
        return Err(Error::InvalidInput("a tester name is required for export".to_string()));
    }
    let summary = path.summary();
    if !summary.is_complete() {
        return Err(Error::Incomplete {
            title: path.title.clone(),
            open: summary.open(),
        });
    }
    Ok(TestPath {
        tester_name: Some(tester.to_string()),
        export_timestamp: Some(export_timestamp(at)),
        ..path.clone()
    })
}

/// Write a single-report export into `dir`; returns the written file
pub fn write_report_export(path: &TestPath, tester: &str, dir: &Path) -> Result<PathBuf> {
    let report = prepare_report_export(path, tester, Utc::now())?;
    let target = dir.join(report_filename(&report.title, tester.trim()));
    write_json(&target, &report)?;
    info!(file = %target.display(), "exported report");
    Ok(target)
}

/// Write the whole working set, array form
pub fn write_backup(paths: &[TestPath], target: &Path) -> Result<()> {
    write_json(target, paths)?;
    info!(file = %target.display(), paths = paths.len(), "wrote working set backup");
    Ok(())
}

fn write_json<T: serde::Serialize + ?Sized>(target: &Path, value: &T) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(target, content)?;
    Ok(())
}

/// A decoded attachment written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// Position of the source report in the extracted batch
    pub report: usize,
    pub item_id: i64,
    pub path: PathBuf,
    pub bytes: usize,
}

fn attachment_stem(report: &TestPath) -> String {
    match report.tester() {
        Some(tester) => format!("{}-tester-{}", slugify(&report.title), slugify(tester)),
        None => slugify(&report.title),
    }
}

/// Decode every attachment of `reports` into `dir` as
/// `<slug(title)>[-tester-<slug(tester)>]-item<id>-<n>.<ext>`.
///
/// Reports that would still share a stem get their 1-based batch position
/// appended, so no file of the batch overwrites another.
pub fn extract_attachments(reports: &[TestPath], dir: &Path) -> Result<Vec<ExtractedImage>> {
    std::fs::create_dir_all(dir)?;
    let stems: Vec<String> = reports.iter().map(attachment_stem).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *counts.entry(stem.as_str()).or_default() += 1;
    }

    let mut written = Vec::new();
    for (index, (report, stem)) in reports.iter().zip(&stems).enumerate() {
        let stem = if counts[stem.as_str()] > 1 {
            format!("{}-{}", stem, index + 1)
        } else {
            stem.clone()
        };
        for item in &report.items {
            for (n, url) in item.images().iter().enumerate() {
                let data = DataUrl::parse(url)?;
                let bytes = data.decode()?;
                let path = dir.join(format!("{}-item{}-{}.{}", stem, item.id, n + 1, data.extension()));
                std::fs::write(&path, &bytes)?;
                written.push(ExtractedImage {
                    report: index,
                    item_id: item.id,
                    path,
                    bytes: bytes.len(),
                });
            }
        }
    }
    Ok(written)
}
