//! Comparison report renderings
//!
//! HTML, XLSX and PDF outputs share one precomputed [`ComparisonReport`];
//! the renderers only lay out numbers the aggregator already produced.
//! None of these outputs can be imported again.

mod html;
mod pdf;
mod xlsx;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::aggregate::{
    aggregated_reports, overall_summary, performance_series, top_failures, AggregatedReport,
    FailureCount, PerformanceSeries,
};
use crate::config::CompareConfig;
use crate::error::{Error, Result};
use crate::export::export_timestamp;
use crate::types::{PathSummary, TestPath};

pub use pdf::PdfDocument;

/// Everything a comparison rendering shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub generated_at: String,
    pub overall: PathSummary,
    pub top_failures: Vec<FailureCount>,
    pub performance: PerformanceSeries,
    pub aggregated: Vec<AggregatedReport>,
    pub reports: Vec<TestPath>,
}

impl ComparisonReport {
    pub fn build(reports: &[TestPath], config: &CompareConfig, at: DateTime<Utc>) -> Self {
        Self {
            generated_at: export_timestamp(at),
            overall: overall_summary(reports),
            top_failures: top_failures(reports, config.top_failures),
            performance: performance_series(reports),
            aggregated: aggregated_reports(reports, &config.unknown_tester),
            reports: reports.to_vec(),
        }
    }

    pub fn render(&self, format: RenderFormat) -> Result<Vec<u8>> {
        match format {
            RenderFormat::Html => Ok(html::render(self).into_bytes()),
            RenderFormat::Xlsx => xlsx::render(self),
            RenderFormat::Pdf => Ok(pdf::render(self)),
        }
    }

    /// Render into `target`, creating parent directories as needed
    pub fn write_to(&self, format: RenderFormat, target: &Path) -> Result<()> {
        let bytes = self.render(format)?;
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(target, &bytes)?;
        info!(file = %target.display(), format = format.name(), bytes = bytes.len(), "wrote comparison report");
        Ok(())
    }
}

/// Output format of a comparison rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Html,
    Xlsx,
    Pdf,
}

impl RenderFormat {
    pub fn name(&self) -> &'static str {
        match self {
            RenderFormat::Html => "html",
            RenderFormat::Xlsx => "xlsx",
            RenderFormat::Pdf => "pdf",
        }
    }

    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "html" | "htm" => Ok(RenderFormat::Html),
            "xlsx" => Ok(RenderFormat::Xlsx),
            "pdf" => Ok(RenderFormat::Pdf),
            other => Err(Error::Export(format!("unsupported report extension '{}'", other))),
        }
    }
}

/// Visible text of a rich-text comment: tags dropped, common entities
/// decoded, whitespace collapsed
pub fn comment_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TestItem, TestStatus};
    use chrono::TimeZone;

    pub(super) fn sample() -> ComparisonReport {
        let run = |tester: &str, status: TestStatus, comment: Option<&str>| TestPath {
            items: vec![
                TestItem {
                    status,
                    comment: comment.map(str::to_string),
                    ..TestItem::new(0, "Login")
                },
                TestItem::new(1, "Logout").with_status(TestStatus::Passed),
            ],
            tester_name: Some(tester.to_string()),
            ..TestPath::new(1, "Smoke <Web>")
        };
        let reports = vec![
            run("Ann", TestStatus::Passed, None),
            run("Ben", TestStatus::Failed, Some("<p>500 on &amp; submit</p>")),
        ];
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        ComparisonReport::build(&reports, &CompareConfig::default(), at)
    }

    #[test]
    fn test_build_collects_sections() {
        let report = sample();
        assert_eq!(report.generated_at, "2024-05-01T10:00:00.000Z");
        assert_eq!(report.overall.total, 4);
        assert_eq!(report.top_failures.len(), 1);
        assert_eq!(report.aggregated[0].tester_count, 2);
        assert_eq!(report.performance.labels.len(), 2);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(RenderFormat::from_path(Path::new("out/r.HTML")).unwrap(), RenderFormat::Html);
        assert_eq!(RenderFormat::from_path(Path::new("r.xlsx")).unwrap(), RenderFormat::Xlsx);
        assert!(RenderFormat::from_path(Path::new("r.docx")).is_err());
    }

    #[test]
    fn test_comment_text() {
        assert_eq!(comment_text("<p>500 on &amp; submit</p><ul><li>retry</li></ul>"), "500 on & submit retry");
        assert_eq!(comment_text("plain"), "plain");
    }

    #[test]
    fn test_write_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample();
        for name in ["c.html", "c.xlsx", "c.pdf"] {
            let target = dir.path().join("out").join(name);
            let format = RenderFormat::from_path(&target).unwrap();
            report.write_to(format, &target).unwrap();
            assert!(std::fs::metadata(&target).unwrap().len() > 0);
        }
    }
}
