//! Testplan Common Library
//!
//! Report model, import pipeline, comparison analytics and export
//! renderings for the Testplan tracker.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod media;
pub mod merge;
pub mod migrate;
pub mod render;
pub mod state;
pub mod tester;
pub mod types;
pub mod validate;

// Re-export commonly used types
pub use aggregate::{
    aggregated_reports, diff_headers, diff_rows, overall_summary, performance_series, top_failures,
    AggregatedItem, AggregatedReport, DiffRow, FailureCount, PerformanceSeries,
};
pub use config::TrackerConfig;
pub use error::{Error, Result};
pub use import::{ImportBatch, ImportFailure, Importer};
pub use media::MediaTypeTable;
pub use migrate::{migrate_imported_data, Migrator};
pub use render::{ComparisonReport, RenderFormat};
pub use state::{Action, AppState};
pub use tester::{tester_name_from_filename, ImportContext, PendingAssignment};
pub use types::*;
pub use validate::{classify, is_test_path, is_test_path_array, ImportShape, ValidationError};

/// Testplan version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default store path
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".testplan")
}

/// Default working-set file
pub fn default_workspace_path() -> std::path::PathBuf {
    default_store_path().join("workspace.json")
}

/// Default configuration file
pub fn default_config_path() -> std::path::PathBuf {
    default_store_path().join("config.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
