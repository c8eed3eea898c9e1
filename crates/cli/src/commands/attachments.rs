//! Extract image attachments to files

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;

use testplan_common::export::extract_attachments;
use testplan_common::TestPath;

use super::Context;
use crate::output::{print_list, print_success, TableDisplay};

#[derive(Args)]
pub struct AttachmentsArgs {
    /// Test path ID in the working set
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub path: Option<i64>,

    /// Read the reports from an exported file instead
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct ImageDisplay {
    pub report: String,
    pub item: i64,
    pub file: String,
    pub bytes: usize,
}

impl TableDisplay for ImageDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Report", "Item", "File", "Bytes"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.report.clone(),
            self.item.to_string(),
            self.file.clone(),
            self.bytes.to_string(),
        ]
    }
}

async fn reports(args: &AttachmentsArgs, ctx: &Context) -> Result<Vec<TestPath>> {
    if let Some(file) = &args.file {
        let imported = ctx
            .workspace
            .importer()
            .import_file(file)
            .await
            .map_err(|failure| anyhow!("{}", failure))?;
        return Ok(imported.reports);
    }
    let state = ctx.workspace.load()?;
    let id = args.path.ok_or_else(|| anyhow!("a test path ID or --file is required"))?;
    let path = state
        .path(id)
        .cloned()
        .ok_or_else(|| anyhow!("no test path with id {}", id))?;
    Ok(vec![path])
}

pub async fn execute(args: AttachmentsArgs, ctx: &Context) -> Result<()> {
    let dir = args
        .out
        .clone()
        .unwrap_or_else(|| ctx.config.export.output_dir.join("attachments"));

    let reports = reports(&args, ctx).await?;
    let extracted: Vec<ImageDisplay> = extract_attachments(&reports, &dir)?
        .into_iter()
        .map(|image| ImageDisplay {
            report: reports[image.report].title.clone(),
            item: image.item_id,
            file: image.path.display().to_string(),
            bytes: image.bytes,
        })
        .collect();

    print_list(&extracted, ctx.format);
    if !extracted.is_empty() && !ctx.format.is_structured() {
        print_success(&format!("Extracted {} image(s) to {}", extracted.len(), dir.display()));
    }
    Ok(())
}
