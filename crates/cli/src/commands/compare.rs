//! Compare reports from several testers

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use testplan_common::aggregate::{AggregatedItem, AggregatedReport};
use testplan_common::render::comment_text;
use testplan_common::{
    diff_headers, diff_rows, Action, AppState, ComparisonReport, DiffRow, FailureCount, ImportContext, RenderFormat,
};

use super::plan::status_cell;
use super::{parse_names, report_failures, settle_pending, Context};
use crate::output::{print_document, print_list, print_success, print_table, print_warning, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct CompareArgs {
    /// Exported report files (JSON)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Tester name for a file without one, as FILE=NAME
    #[arg(short, long = "name", value_name = "FILE=NAME")]
    pub names: Vec<String>,

    /// Only show the aggregated analysis of this test path title
    #[arg(short, long)]
    pub title: Option<String>,

    /// Entries in the failure ranking (defaults to the configured value)
    #[arg(long)]
    pub top: Option<usize>,

    /// Reports to diff side by side, by position in the comparison set (0-based)
    #[arg(long, value_delimiter = ',')]
    pub diff: Vec<usize>,

    /// Write an HTML report
    #[arg(long, value_name = "FILE")]
    pub html: Option<PathBuf>,

    /// Write an XLSX workbook
    #[arg(long, value_name = "FILE")]
    pub xlsx: Option<PathBuf>,

    /// Write a PDF report
    #[arg(long, value_name = "FILE")]
    pub pdf: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct FailureDisplay {
    pub rank: usize,
    pub description: String,
    pub failures: usize,
}

impl TableDisplay for FailureDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["#", "Item", "Failures"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.rank.to_string(),
            self.description.clone(),
            self.failures.to_string().red().to_string(),
        ]
    }
}

impl FailureDisplay {
    fn from_ranked(rank: usize, failure: &FailureCount) -> Self {
        Self {
            rank: rank + 1,
            description: failure.description.clone(),
            failures: failure.count,
        }
    }
}

#[derive(Serialize)]
pub struct PerformanceDisplay {
    pub report: String,
    pub passed: usize,
    pub failed: usize,
}

impl TableDisplay for PerformanceDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Report", "Passed", "Failed"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.report.clone(), self.passed.to_string(), self.failed.to_string()]
    }
}

#[derive(Serialize)]
pub struct AggregatedItemDisplay {
    pub description: String,
    pub runs: usize,
    pub passed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub pass_rate: f64,
    pub contested: bool,
    pub comments: Vec<String>,
}

impl From<&AggregatedItem> for AggregatedItemDisplay {
    fn from(item: &AggregatedItem) -> Self {
        Self {
            description: item.description.clone(),
            runs: item.runs,
            passed: item.passed,
            failed: item.failed,
            in_progress: item.in_progress,
            not_started: item.not_started,
            pass_rate: item.pass_rate(),
            contested: item.is_contested(),
            comments: item
                .comments
                .iter()
                .map(|c| {
                    let text = c.comment.as_deref().map(comment_text).unwrap_or_default();
                    match c.comment_images.len() {
                        0 => format!("{}: {}", c.tester_name, text),
                        n => format!("{}: {} [{} image(s)]", c.tester_name, text, n),
                    }
                })
                .collect(),
        }
    }
}

impl TableDisplay for AggregatedItemDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Item", "Runs", "Passed", "Failed", "In Progress", "Not Started", "Pass Rate", "Comments"]
    }

    fn row(&self) -> Vec<String> {
        let description = if self.contested {
            format!("{} {}", self.description, "(contested)".yellow())
        } else {
            self.description.clone()
        };
        vec![
            description,
            self.runs.to_string(),
            self.passed.to_string(),
            self.failed.to_string(),
            self.in_progress.to_string(),
            self.not_started.to_string(),
            format!("{:.0}%", self.pass_rate),
            self.comments.join("\n"),
        ]
    }
}

/// Side-by-side diff of the selected reports
#[derive(Serialize)]
pub struct DiffView {
    pub headers: Vec<String>,
    pub rows: Vec<DiffRow>,
}

/// Everything `compare` prints in JSON/YAML mode
#[derive(Serialize)]
struct CompareOutput<'a> {
    #[serde(flatten)]
    report: &'a ComparisonReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<DiffView>,
}

pub async fn execute(args: CompareArgs, ctx: &Context) -> Result<()> {
    let given = parse_names(&args.names)?;
    let batch = ctx
        .workspace
        .importer()
        .read_batch(&args.files, ImportContext::Comparison)
        .await;
    report_failures(&batch);

    let state = AppState::with_working_set(Vec::new())
        .replay([Action::BeginComparison, Action::ImportComparison(batch)])?;
    let mut state = settle_pending(state, given)?;
    if state.comparison.is_empty() {
        bail!("no reports to compare");
    }

    for &index in &args.diff {
        state = state.apply(Action::ToggleDiffSelection(index))?;
    }
    let diff = if state.diff_selection.is_empty() {
        None
    } else {
        let selected = state.selected_for_diff();
        Some(DiffView {
            headers: diff_headers(&selected),
            rows: diff_rows(&selected),
        })
    };

    let mut compare_config = ctx.config.compare.clone();
    if let Some(top) = args.top {
        compare_config.top_failures = top;
    }
    let mut report = ComparisonReport::build(&state.comparison, &compare_config, Utc::now());
    if let Some(title) = &args.title {
        report.aggregated.retain(|card| &card.title == title);
        if report.aggregated.is_empty() {
            print_warning(&format!("No reports titled '{}'", title));
        }
    }

    let renderings = [
        (args.html.as_deref(), RenderFormat::Html),
        (args.xlsx.as_deref(), RenderFormat::Xlsx),
        (args.pdf.as_deref(), RenderFormat::Pdf),
    ];
    let written = renderings
        .into_iter()
        .filter_map(|(target, format)| target.map(|t| (t, format)))
        .map(|(target, format)| write_rendering(&report, format, target))
        .collect::<Result<Vec<_>>>()?;

    if ctx.format.is_structured() {
        print_document(&CompareOutput { report: &report, diff }, ctx.format);
        return Ok(());
    }

    print_summary(&report, ctx.format);
    if let Some(diff) = &diff {
        print_diff(diff);
    }
    for target in written {
        print_success(&format!("Wrote {}", target.display()));
    }
    Ok(())
}

fn write_rendering(report: &ComparisonReport, format: RenderFormat, target: &Path) -> Result<PathBuf> {
    report
        .write_to(format, target)
        .map_err(|e| anyhow!("failed to write {} report {}: {}", format.name(), target.display(), e))?;
    Ok(target.to_path_buf())
}

fn print_summary(report: &ComparisonReport, format: OutputFormat) {
    let o = &report.overall;
    println!();
    println!("{}", "━".repeat(60).dimmed());
    println!("{}", format!(" Comparison of {} report(s)", report.reports.len()).bold());
    println!("{}", "━".repeat(60).dimmed());
    println!(
        "   {} passed  {} failed  {} in progress  {} not started  ({} total)",
        o.passed.to_string().green(),
        o.failed.to_string().red(),
        o.in_progress.to_string().blue(),
        o.not_started.to_string().dimmed(),
        o.total
    );
    println!();

    if !report.top_failures.is_empty() {
        println!("{}", "Top failures".bold());
        let failures: Vec<_> = report
            .top_failures
            .iter()
            .enumerate()
            .map(|(rank, f)| FailureDisplay::from_ranked(rank, f))
            .collect();
        print_list(&failures, format);
        println!();
    }

    println!("{}", "Per report".bold());
    let perf = &report.performance;
    let performance: Vec<_> = perf
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| PerformanceDisplay {
            report: label.clone(),
            passed: perf.passed[i],
            failed: perf.failed[i],
        })
        .collect();
    print_list(&performance, format);

    for card in &report.aggregated {
        print_card(card, format);
    }
}

fn print_card(card: &AggregatedReport, format: OutputFormat) {
    println!();
    println!("{} {}", card.title.bold(), format!("({} tester(s))", card.tester_count).dimmed());
    let items: Vec<AggregatedItemDisplay> = card.items.iter().map(AggregatedItemDisplay::from).collect();
    print_list(&items, format);
}

fn print_diff(diff: &DiffView) {
    println!();
    println!("{}", "Side-by-side".bold());
    let mut headers = vec!["#".to_string(), "Item".to_string()];
    headers.extend(diff.headers.iter().cloned());

    let rows = diff
        .rows
        .iter()
        .map(|row| {
            let mut description = row.description.clone().unwrap_or_default();
            if row.description_mismatch {
                description = format!("{} {}", description, "(descriptions differ)".yellow());
            }
            let marker = if row.has_difference { "≠".yellow().to_string() } else { String::new() };
            let mut cells = vec![format!("{}{}", row.position + 1, marker), description];
            cells.extend(row.cells.iter().map(|cell| match cell {
                Some(cell) => {
                    let mut text = status_cell(cell.status);
                    if let Some(comment) = &cell.comment {
                        text = format!("{}\n{}", text, comment_text(comment).dimmed());
                    }
                    text
                }
                None => "-".to_string(),
            }));
            cells
        })
        .collect();
    print_table(headers, rows);
}
