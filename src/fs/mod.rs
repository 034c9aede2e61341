//! File system operations for project trees
//!
//! Responsibilities:
//! - File discovery (the ordered FileNode forest shown to editors)
//! - Raw read/write/create/delete primitives
//! - Atomic file writes
//! - Recursive directory copy used by the bundler

use crate::error::{BentoError, Result, ResultExt};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Names never shown in a file tree (build artifacts and dependency caches)
const EXCLUDED_NAMES: &[&str] = &["node_modules", "build", "dist"];

/// Point-in-time snapshot of one entry in a project tree
///
/// Not live: rebuild it after any create or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNode {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub children: Vec<FileNode>,
}

// ============================================================================
// File Discovery
// ============================================================================

/// Build the file tree under `root`.
///
/// Hidden entries and build artifacts are skipped. Each level lists
/// directories first, then files, both alphabetically. A missing root yields
/// an empty forest.
pub fn file_tree(root: &Path) -> Result<Vec<FileNode>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    build_level(root)
}

fn build_level(dir: &Path) -> Result<Vec<FileNode>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir).with_path(dir)? {
        let entry = entry.with_path(dir)?;
        let name = entry.file_name().to_string_lossy().to_string();
        if is_hidden_or_excluded(&name) {
            continue;
        }
        let path = entry.path();
        let is_directory = path.is_dir();
        entries.push((name, path, is_directory));
    }

    entries.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

    entries
        .into_iter()
        .map(|(name, path, is_directory)| {
            let children = if is_directory {
                build_level(&path)?
            } else {
                Vec::new()
            };
            Ok(FileNode {
                name,
                path,
                is_directory,
                children,
            })
        })
        .collect()
}

fn is_hidden_or_excluded(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_NAMES.contains(&name)
}

// ============================================================================
// Editing Primitives
// ============================================================================

pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_path(path)
}

/// Replace a file's contents atomically, creating parent directories
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    write_file_atomic(path, content.as_bytes())
}

/// Create an empty file `name` (may contain subdirectories) under `dir`.
/// An existing file is left untouched.
pub fn create_file(dir: &Path, name: &str) -> Result<PathBuf> {
    if name.trim().is_empty() {
        return Err(BentoError::validation("File name cannot be empty"));
    }
    if Path::new(name).is_absolute() || name.split(['/', '\\']).any(|c| c == "..") {
        return Err(BentoError::validation(format!(
            "File name must be relative to the project: {}",
            name
        )));
    }

    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_path(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_path(&path)?;
    Ok(path)
}

/// Delete a file or a whole directory
pub fn delete_path(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path).with_path(path)
    } else {
        fs::remove_file(path).with_path(path)
    }
}

// ============================================================================
// Atomic Operations
// ============================================================================

/// Write file atomically (write to temp, then rename)
pub fn write_file_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_path(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_path(&temp_path)?;

    file.write_all(content).with_path(&temp_path)?;
    file.sync_all().with_path(&temp_path)?;
    drop(file);

    fs::rename(&temp_path, path).with_path(path)?;

    Ok(())
}

/// Recursively copy every file under `source` into `target`, skipping files
/// whose name equals `skip_name` at any depth. Returns the number of files
/// copied.
pub fn copy_dir(source: &Path, target: &Path, skip_name: Option<&str>) -> Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            BentoError::io(path, e.into())
        })?;

        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| BentoError::NotFound(entry.path().to_path_buf()))?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).with_path(&destination)?;
            continue;
        }

        if skip_name.is_some_and(|skip| entry.file_name() == skip) {
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        fs::copy(entry.path(), &destination).with_path(entry.path())?;
        copied += 1;
    }

    Ok(copied)
}

/// True when `dir` exists and has at least one entry
pub fn is_non_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
