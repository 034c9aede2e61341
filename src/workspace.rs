//! Editor session over one open project.
//!
//! State is published through watch channels: one writer (this type), any
//! number of readers. All disk work runs on the blocking pool, and the file
//! tree is rebuilt after every create or delete.

use crate::error::{BentoError, Result};
use crate::fs::{self, FileNode};
use crate::log::LogSink;
use crate::orchestrator::run_blocking;
use crate::path;
use crate::projects::Project;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

#[derive(Debug)]
pub struct Workspace {
    log: LogSink,
    project: watch::Sender<Option<Project>>,
    tree: watch::Sender<Vec<FileNode>>,
    current_file: watch::Sender<Option<PathBuf>>,
    content: watch::Sender<String>,
}

impl Workspace {
    pub fn new(log: LogSink) -> Self {
        Self {
            log,
            project: watch::channel(None).0,
            tree: watch::channel(Vec::new()).0,
            current_file: watch::channel(None).0,
            content: watch::channel(String::new()).0,
        }
    }

    pub fn project(&self) -> Option<Project> {
        self.project.borrow().clone()
    }

    pub fn tree(&self) -> Vec<FileNode> {
        self.tree.borrow().clone()
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.current_file.borrow().clone()
    }

    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }

    pub fn subscribe_tree(&self) -> watch::Receiver<Vec<FileNode>> {
        self.tree.subscribe()
    }

    pub fn subscribe_current_file(&self) -> watch::Receiver<Option<PathBuf>> {
        self.current_file.subscribe()
    }

    pub fn subscribe_content(&self) -> watch::Receiver<String> {
        self.content.subscribe()
    }

    /// Switch to `project`, closing any open file
    pub async fn open_project(&self, project: Project) -> Result<()> {
        if !project.exists() {
            return Err(BentoError::NotFound(project.path.clone()));
        }
        tracing::info!("opened project '{}'", project.name);
        self.project.send_replace(Some(project));
        self.current_file.send_replace(None);
        self.content.send_replace(String::new());
        self.refresh_tree().await
    }

    pub async fn refresh_tree(&self) -> Result<()> {
        let root = self.root()?;
        let tree = run_blocking(move || fs::file_tree(&root)).await?;
        self.tree.send_replace(tree);
        Ok(())
    }

    /// Load a file of the open project into the editor buffer
    pub async fn open_file(&self, file: &Path) -> Result<String> {
        let file = self.contained(file)?;
        let read_path = file.clone();
        let text = run_blocking(move || fs::read_file(&read_path)).await?;

        self.current_file.send_replace(Some(file));
        self.content.send_replace(text.clone());
        Ok(text)
    }

    /// Write `text` to the open file
    pub async fn save_file(&self, text: String) -> Result<()> {
        let file = self
            .current_file()
            .ok_or_else(|| BentoError::validation("No file is open"))?;

        let write_path = file.clone();
        let written = text.clone();
        run_blocking(move || fs::write_file(&write_path, &written)).await?;

        self.content.send_replace(text);
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.log.line(format!("File saved: {}", name));
        Ok(())
    }

    /// Create an empty file `name` inside `dir` (relative to the project root)
    pub async fn create_file(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        let root = self.root()?;
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            root.join(dir)
        };
        let dir = self.contained(&dir)?;

        let name = name.to_string();
        let created = run_blocking(move || fs::create_file(&dir, &name)).await?;
        self.refresh_tree().await?;
        Ok(created)
    }

    /// Delete a file or directory of the open project. Closes the editor
    /// buffer when the open file goes with it.
    pub async fn delete(&self, target: &Path) -> Result<()> {
        let target = self.contained(target)?;
        if target == self.canonical_root()? {
            return Err(BentoError::validation("Refusing to delete the project root"));
        }

        let doomed = target.clone();
        run_blocking(move || fs::delete_path(&doomed)).await?;

        let closes_open_file = self
            .current_file()
            .is_some_and(|open| open.starts_with(&target));
        if closes_open_file {
            self.current_file.send_replace(None);
            self.content.send_replace(String::new());
        }

        self.refresh_tree().await
    }

    fn root(&self) -> Result<PathBuf> {
        self.project
            .borrow()
            .as_ref()
            .map(|p| p.path.clone())
            .ok_or_else(|| BentoError::validation("No project is open"))
    }

    fn canonical_root(&self) -> Result<PathBuf> {
        let root = self.root()?;
        std::fs::canonicalize(&root).map_err(|_| BentoError::NotFound(root))
    }

    /// Canonical form of `target`, which must live inside the project root
    fn contained(&self, target: &Path) -> Result<PathBuf> {
        let root = self.canonical_root()?;
        let target = if target.is_absolute() {
            target.to_path_buf()
        } else {
            root.join(target)
        };
        let canonical =
            std::fs::canonicalize(&target).map_err(|_| BentoError::NotFound(target.clone()))?;

        if !path::is_within(&root, &canonical) {
            return Err(BentoError::validation(format!(
                "Path is outside the project: {}",
                target.display()
            )));
        }
        Ok(canonical)
    }
}
