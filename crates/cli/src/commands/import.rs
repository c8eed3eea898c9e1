//! Import reports into the working set

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use testplan_common::{Action, ImportContext};

use super::{parse_names, report_failures, settle_pending, Context};
use crate::output::{print_info, print_success, print_warning};
use crate::prompt;

#[derive(Args)]
pub struct ImportArgs {
    /// Report or backup files (JSON)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Replace the whole working set instead of merging
    #[arg(long)]
    pub replace: bool,

    /// Skip the confirmation for --replace
    #[arg(short, long)]
    pub yes: bool,

    /// Tester name for a file without one, as FILE=NAME
    #[arg(short, long = "name", value_name = "FILE=NAME")]
    pub names: Vec<String>,
}

pub async fn execute(args: ImportArgs, ctx: &Context) -> Result<()> {
    let given = parse_names(&args.names)?;
    let state = ctx.workspace.load()?;
    let batch = ctx
        .workspace
        .importer()
        .read_batch(&args.files, ImportContext::Main)
        .await;
    report_failures(&batch);

    if batch.is_empty() {
        bail!("no valid reports in {} file(s)", args.files.len());
    }

    if args.replace {
        let paths: Vec<_> = batch
            .complete
            .into_iter()
            .chain(batch.pending.into_iter().map(|p| p.report))
            .collect();
        let confirmed = args.yes
            || prompt::stdin_confirm(&format!(
                "Replace all {} test path(s) with {} imported one(s)?",
                state.working_set.len(),
                paths.len()
            ))?;
        if !confirmed {
            print_warning("Import cancelled; working set unchanged");
            return Ok(());
        }
        let count = paths.len();
        let state = state.apply(Action::ReplaceWorkingSet { paths, confirmed })?;
        ctx.workspace.save(&state)?;
        print_success(&format!("Working set replaced with {} test path(s)", count));
        return Ok(());
    }

    let before = state.working_set.len();
    let state = state.apply(Action::ImportMain(batch))?;
    let state = settle_pending(state, given)?;
    ctx.workspace.save(&state)?;

    let added = state.working_set.len() - before;
    print_success(&format!("Imported {} test path(s)", added));
    for path in &state.working_set[before..] {
        print_info(&format!(
            "#{} {} ({})",
            path.id,
            path.title,
            path.tester().unwrap_or("no tester")
        ));
    }
    Ok(())
}
