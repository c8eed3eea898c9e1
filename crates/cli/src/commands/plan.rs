//! Working-set commands: browse, record results, export

use std::path::PathBuf;

use anyhow::{anyhow, Context as _, Result};
use base64::Engine;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use testplan_common::export::{write_backup, write_report_export, BACKUP_FILENAME};
use testplan_common::render::comment_text;
use testplan_common::{Action, MediaTypeTable, TestItem, TestPath, TestStatus};

use super::{select, Context};
use crate::output::{
    print_document, print_info, print_item, print_list, print_success, OutputFormat, TableDisplay,
};

#[derive(Args)]
pub struct ShowArgs {
    /// Test path ID
    pub path: i64,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Test path ID
    pub path: i64,

    /// Item ID
    pub item: i64,

    /// New status (passed, failed, in-progress, not-started or the exported label)
    pub status: TestStatus,
}

#[derive(Args)]
pub struct CommentArgs {
    /// Test path ID
    pub path: i64,

    /// Item ID
    pub item: i64,

    /// Comment text (HTML allowed)
    #[arg(short, long)]
    pub text: Option<String>,

    /// Image files to attach
    #[arg(short, long = "image")]
    pub images: Vec<PathBuf>,

    /// Keep the images already attached and add the new ones
    #[arg(long)]
    pub append: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Test path ID
    pub path: i64,

    /// Tester name (defaults to the configured one)
    #[arg(short, long, env = "TESTPLAN_TESTER")]
    pub tester: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct BackupArgs {
    /// Output directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Test path summary row
#[derive(Serialize)]
pub struct PathDisplay {
    pub id: i64,
    pub title: String,
    pub items: usize,
    pub passed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub completion: u32,
    pub tester: Option<String>,
}

impl From<&TestPath> for PathDisplay {
    fn from(path: &TestPath) -> Self {
        let summary = path.summary();
        Self {
            id: path.id,
            title: path.title.clone(),
            items: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            in_progress: summary.in_progress,
            not_started: summary.not_started,
            completion: summary.completion(),
            tester: path.tester().map(str::to_string),
        }
    }
}

impl TableDisplay for PathDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Title", "Items", "Passed", "Failed", "In Progress", "Not Started", "Done", "Tester"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.items.to_string(),
            self.passed.to_string(),
            self.failed.to_string(),
            self.in_progress.to_string(),
            self.not_started.to_string(),
            format!("{}%", self.completion),
            self.tester.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

/// Item row
#[derive(Serialize)]
pub struct ItemDisplay {
    pub id: i64,
    pub description: String,
    pub status: TestStatus,
    pub comment: Option<String>,
    pub images: usize,
}

impl From<&TestItem> for ItemDisplay {
    fn from(item: &TestItem) -> Self {
        Self {
            id: item.id,
            description: item.description.clone(),
            status: item.status,
            comment: item.comment.as_deref().map(comment_text),
            images: item.images().len(),
        }
    }
}

impl TableDisplay for ItemDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Description", "Status", "Comment", "Images"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.description.clone(),
            status_cell(self.status),
            self.comment.clone().unwrap_or_default(),
            self.images.to_string(),
        ]
    }
}

pub fn status_cell(status: TestStatus) -> String {
    let label = status.label();
    match status {
        TestStatus::Passed => label.green().to_string(),
        TestStatus::Failed => label.red().to_string(),
        TestStatus::InProgress => label.blue().to_string(),
        TestStatus::NotStarted => label.dimmed().to_string(),
    }
}

pub async fn list(ctx: &Context) -> Result<()> {
    let state = ctx.workspace.load()?;
    let displays: Vec<PathDisplay> = state.working_set.iter().map(PathDisplay::from).collect();
    print_list(&displays, ctx.format);
    Ok(())
}

pub async fn show(args: ShowArgs, ctx: &Context) -> Result<()> {
    let state = ctx.workspace.load()?;
    let path = state
        .path(args.path)
        .ok_or_else(|| anyhow!("no test path with id {}", args.path))?;

    if ctx.format.is_structured() {
        print_document(path, ctx.format);
        return Ok(());
    }

    let summary = path.summary();
    if ctx.format == OutputFormat::Table {
        println!();
        println!("{}", path.title.bold());
        println!(
            "   {} of {} done ({}%)  {} passed, {} failed",
            summary.passed + summary.failed,
            summary.total,
            summary.completion(),
            summary.passed.to_string().green(),
            summary.failed.to_string().red()
        );
        println!();
    }
    let items: Vec<ItemDisplay> = path.items.iter().map(ItemDisplay::from).collect();
    print_list(&items, ctx.format);
    Ok(())
}

pub async fn status(args: StatusArgs, ctx: &Context) -> Result<()> {
    let state = select(ctx.workspace.load()?, args.path)?;
    let state = state.apply(Action::SetStatus {
        item_id: args.item,
        status: args.status,
    })?;
    ctx.workspace.save(&state)?;

    if args.status == TestStatus::NotStarted {
        print_success(&format!("Item {} reset; comment and images cleared", args.item));
    } else {
        print_success(&format!("Item {} set to {}", args.item, args.status));
    }
    if let Some(path) = state.active_path() {
        if let Some(item) = path.item(args.item) {
            print_item(&ItemDisplay::from(item), ctx.format);
        }
        if path.summary().is_complete() {
            print_info(&format!("'{}' is complete and can be exported", path.title));
        }
    }
    Ok(())
}

/// Encode an image file as a data URL
fn read_image(file: &std::path::Path, media: &MediaTypeTable) -> Result<String> {
    let bytes = std::fs::read(file).with_context(|| format!("failed to read image {}", file.display()))?;
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(media.ensure_data_url(&payload))
}

/// Comment to save: `--append` without `--text` keeps the current one
fn merged_comment(text: Option<String>, existing: Option<&str>, append: bool) -> Option<String> {
    match text {
        Some(text) => Some(text),
        None if append => existing.map(str::to_string),
        None => None,
    }
}

pub async fn comment(args: CommentArgs, ctx: &Context) -> Result<()> {
    let state = select(ctx.workspace.load()?, args.path)?;
    let existing = state
        .active_path()
        .and_then(|p| p.item(args.item))
        .ok_or_else(|| anyhow!("no item {} in test path {}", args.item, args.path))?;

    let mut images = if args.append {
        existing.images().to_vec()
    } else {
        Vec::new()
    };
    for file in &args.images {
        images.push(read_image(file, &ctx.config.import.media_types)?);
    }
    let count = images.len();
    let comment = merged_comment(args.text, existing.comment.as_deref(), args.append);

    let state = state.apply(Action::SaveComment {
        item_id: args.item,
        comment,
        images,
    })?;
    ctx.workspace.save(&state)?;
    print_success(&format!("Comment saved for item {} ({} image(s))", args.item, count));
    Ok(())
}

pub async fn export(args: ExportArgs, ctx: &Context) -> Result<()> {
    let state = ctx.workspace.load()?;
    let path = state
        .path(args.path)
        .ok_or_else(|| anyhow!("no test path with id {}", args.path))?;
    let tester = args
        .tester
        .or_else(|| ctx.config.tester_name.clone())
        .ok_or_else(|| anyhow!("a tester name is required: pass --tester or set tester_name in the config"))?;
    let dir = args.out.unwrap_or_else(|| ctx.config.export.output_dir.clone());

    let file = write_report_export(path, &tester, &dir)?;
    print_success(&format!("Exported '{}' to {}", path.title, file.display()));
    Ok(())
}

pub async fn backup(args: BackupArgs, ctx: &Context) -> Result<()> {
    let state = ctx.workspace.load()?;
    let dir = args.out.unwrap_or_else(|| ctx.config.export.output_dir.clone());
    let target = dir.join(BACKUP_FILENAME);
    write_backup(&state.working_set, &target)?;
    print_success(&format!(
        "Backed up {} test path(s) to {}",
        state.working_set.len(),
        target.display()
    ));
    Ok(())
}
