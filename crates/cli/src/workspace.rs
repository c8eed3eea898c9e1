//! Working-set file
//!
//! The working set lives in a single JSON file in backup format. Loading it
//! goes through the regular import pipeline, so older files are migrated on
//! the way in; saving writes the current shape back.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use testplan_common::export::write_backup;
use testplan_common::import::display_name;
use testplan_common::merge::with_unique_ids;
use testplan_common::{AppState, Importer, Migrator, TrackerConfig};

pub struct Workspace {
    path: PathBuf,
    importer: Importer,
}

impl Workspace {
    pub fn new(path: PathBuf, config: &TrackerConfig) -> Self {
        Self {
            path,
            importer: Importer::new(Migrator::new(config.import.media_types.clone())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn importer(&self) -> &Importer {
        &self.importer
    }

    /// Current state; the built-in plans when no file exists yet
    pub fn load(&self) -> Result<AppState> {
        if !self.path.exists() {
            debug!(file = %self.path.display(), "no working set file, starting from defaults");
            return Ok(AppState::default());
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("failed to read working set {}", self.path.display()))?;
        let file = self
            .importer
            .import_bytes(&display_name(&self.path), &bytes)
            .map_err(|failure| anyhow!("{}", failure))?;
        debug!(file = %self.path.display(), paths = file.reports.len(), "loaded working set");
        Ok(AppState::with_working_set(with_unique_ids(file.reports)))
    }

    pub fn save(&self, state: &AppState) -> Result<()> {
        write_backup(&state.working_set, &self.path)
            .with_context(|| format!("failed to write working set {}", self.path.display()))
    }
}
