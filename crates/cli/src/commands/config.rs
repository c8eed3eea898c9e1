//! Configuration commands

use anyhow::{bail, Result};
use clap::Subcommand;

use testplan_common::TrackerConfig;

use super::Context;
use crate::output::{print_document, print_success};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn execute(cmd: ConfigCommands, ctx: &Context) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            if ctx.format.is_structured() {
                print_document(&ctx.config, ctx.format);
            } else {
                println!("# {}", ctx.config_path.display());
                print!("{}", toml::to_string_pretty(&ctx.config)?);
            }
        }

        ConfigCommands::Init { force } => {
            if ctx.config_path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", ctx.config_path.display());
            }
            TrackerConfig::default().save(&ctx.config_path)?;
            print_success(&format!("Wrote {}", ctx.config_path.display()));
        }
    }
    Ok(())
}
