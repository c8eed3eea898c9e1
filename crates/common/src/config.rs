//! Tracker configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::aggregate::{DEFAULT_TOP_FAILURES, UNKNOWN_TESTER};
use crate::error::{Error, Result};
use crate::media::MediaTypeTable;

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Working-set file, in backup format
    pub workspace_path: PathBuf,

    /// Tester name used for exports when none is given on the command line
    pub tester_name: Option<String>,

    /// Import configuration
    pub import: ImportConfig,

    /// Comparison configuration
    pub compare: CompareConfig,

    /// Export configuration
    pub export: ExportConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            workspace_path: crate::default_workspace_path(),
            tester_name: None,
            import: ImportConfig::default(),
            compare: CompareConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Import configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Magic-prefix rules for bare base64 attachments
    pub media_types: MediaTypeTable,
}

/// Comparison configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Entries in the failure ranking
    pub top_failures: usize,

    /// Label for runs without a tester name
    pub unknown_tester: String,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            top_failures: DEFAULT_TOP_FAILURES,
            unknown_tester: UNKNOWN_TESTER.to_string(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for report exports and backups
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.compare.top_failures == 0 {
            return Err(Error::Config("compare.top_failures must be at least 1".to_string()));
        }
        if self.import.media_types.fallback.trim().is_empty() {
            return Err(Error::Config("import.media_types.fallback must not be empty".to_string()));
        }
        if let Some(rule) = self.import.media_types.rules.iter().find(|r| r.prefix.is_empty()) {
            return Err(Error::Config(format!(
                "empty magic prefix for media type '{}'",
                rule.media_type
            )));
        }
        Ok(())
    }
}
