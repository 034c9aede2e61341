use crate::config::StrategyKind;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a finished build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildOutcome {
    Success,
    Failed,
}

/// Last build of a project, kept in .bento/state/build.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub timestamp: i64, // Unix timestamp
    pub outcome: BuildOutcome,
    pub strategy: StrategyKind,
    pub message: String,
}

impl BuildRecord {
    pub fn now(outcome: BuildOutcome, strategy: StrategyKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            outcome,
            strategy,
            message: message.into(),
        }
    }
}

fn state_file(project_path: &Path) -> PathBuf {
    project_path.join(".bento/state/build.json")
}

/// Load the last build record; `None` when absent or unreadable
pub fn load_build_record(project_path: &Path) -> Option<BuildRecord> {
    let content = fs::read_to_string(state_file(project_path)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Save the build record to .bento/state/build.json
pub fn save_build_record(project_path: &Path, record: &BuildRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    crate::fs::write_file_atomic(&state_file(project_path), json.as_bytes())
}
