//! Project registry.
//!
//! Projects are recorded in one JSON array that is rewritten in full on every
//! mutation. There is no locking against concurrent writers.

mod scaffold;

use crate::error::{BentoError, Result, ResultExt};
use crate::path::SafePath;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A registered project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    pub created_at: i64,    // epoch millis
    pub last_modified: i64, // epoch millis
}

impl Project {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            name: name.into(),
            path: path.into(),
            created_at: now,
            last_modified: now,
        }
    }

    /// Unregistered project rooted at `path`, named after its directory
    pub fn from_dir(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, path)
    }

    pub fn root(&self) -> &Path {
        &self.path
    }

    pub fn src_dir(&self) -> PathBuf {
        self.path.join("src")
    }

    pub fn public_dir(&self) -> PathBuf {
        self.path.join("public")
    }

    pub fn output_dir(&self, out_dir: &str) -> PathBuf {
        self.path.join(out_dir)
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }
}

/// Persistent list of known projects
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    path: PathBuf,
}

impl ProjectRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All registered projects in insertion order. A missing or unreadable
    /// registry reads as empty.
    pub fn list(&self) -> Vec<Project> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str(&content) {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!("ignoring unreadable registry {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    pub fn find(&self, name: &str) -> Option<Project> {
        self.list().into_iter().find(|p| p.name == name)
    }

    fn save(&self, projects: &[Project]) -> Result<()> {
        let json = serde_json::to_string_pretty(projects)?;
        crate::fs::write_file_atomic(&self.path, json.as_bytes())
    }

    fn append(&self, project: Project) -> Result<Project> {
        let mut projects = self.list();
        projects.push(project.clone());
        self.save(&projects)?;
        tracing::info!("registered project '{}' at {}", project.name, project.path.display());
        Ok(project)
    }

    /// Scaffold a new project under `workspace` and register it
    pub fn create(&self, workspace: &Path, name: &str) -> Result<Project> {
        validate_name(name)?;

        let project_dir = workspace.join(name);
        if project_dir.exists() {
            return Err(BentoError::validation(format!(
                "Project already exists: {}",
                project_dir.display()
            )));
        }

        fs::create_dir_all(&project_dir).with_path(&project_dir)?;
        scaffold::write_template(&project_dir, name)?;

        let path = project_dir.canonicalize().with_path(&project_dir)?;
        self.append(Project::new(name, path))
    }

    /// Register an existing directory. It must contain a `src/` directory or
    /// a `package.json`.
    pub fn import(&self, input: &str) -> Result<Project> {
        let safe_path = SafePath::from_user_input(input)?;
        let dir = safe_path.require_dir()?.to_path_buf();
        if !dir.join("src").is_dir() && !dir.join("package.json").is_file() {
            return Err(BentoError::validation(format!(
                "Not a project directory (no src/ or package.json): {}",
                dir.display()
            )));
        }

        if self.list().iter().any(|p| p.path == dir) {
            return Err(BentoError::validation(format!(
                "Project already registered: {}",
                dir.display()
            )));
        }

        self.append(Project::from_dir(dir))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BentoError::validation("Project name cannot be empty"));
    }
    if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\']) {
        return Err(BentoError::validation(format!(
            "Invalid project name: {}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry(temp: &TempDir) -> ProjectRegistry {
        ProjectRegistry::new(temp.path().join("state/projects.json"))
    }

    #[test]
    fn test_missing_or_corrupt_registry_is_empty() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);
        assert!(reg.list().is_empty());

        fs::create_dir_all(temp.path().join("state")).unwrap();
        fs::write(reg.path(), "not json at all").unwrap();
        assert!(reg.list().is_empty());
    }

    #[test]
    fn test_create_scaffolds_and_registers() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("projects");
        let reg = registry(&temp);

        let project = reg.create(&workspace, "My App").unwrap();
        assert_eq!(project.name, "My App");
        assert!(project.src_dir().join("App.tsx").is_file());
        assert!(project.src_dir().join("main.tsx").is_file());
        assert!(project.public_dir().join("index.html").is_file());
        assert!(project.output_dir("dist").is_dir());

        let package = fs::read_to_string(project.root().join("package.json")).unwrap();
        assert!(package.contains("\"my-app\""));

        assert_eq!(reg.list(), vec![project.clone()]);
        assert_eq!(reg.find("My App"), Some(project));
        assert!(reg.find("Other").is_none());
    }

    #[test]
    fn test_create_existing_directory_is_rejected() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("projects");
        fs::create_dir_all(workspace.join("taken")).unwrap();
        let reg = registry(&temp);

        let err = reg.create(&workspace, "taken").unwrap_err();
        assert!(matches!(err, BentoError::Validation(_)));
        assert!(reg.list().is_empty());
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);
        for name in ["", "  ", "..", "a/b", "a\\b"] {
            assert!(reg.create(temp.path(), name).is_err(), "accepted {:?}", name);
        }
        assert!(!reg.path().exists());
    }

    #[test]
    fn test_import_requires_project_markers() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);

        let plain = temp.path().join("plain");
        fs::create_dir_all(&plain).unwrap();
        let err = reg.import(plain.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, BentoError::Validation(_)));
        assert!(reg.list().is_empty());

        let with_src = temp.path().join("site");
        fs::create_dir_all(with_src.join("src")).unwrap();
        let project = reg.import(with_src.to_str().unwrap()).unwrap();
        assert_eq!(project.name, "site");
        assert_eq!(reg.list().len(), 1);

        // Same directory twice
        assert!(reg.import(with_src.to_str().unwrap()).is_err());
        assert_eq!(reg.list().len(), 1);
    }

    #[test]
    fn test_import_missing_path_is_not_found() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);
        let missing = temp.path().join("missing");
        let err = reg.import(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, BentoError::NotFound(_)));
    }

    #[test]
    fn test_registry_format_is_flat_camel_case_array() {
        let temp = TempDir::new().unwrap();
        let reg = registry(&temp);
        reg.create(&temp.path().join("ws"), "one").unwrap();
        reg.create(&temp.path().join("ws"), "two").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(reg.path()).unwrap()).unwrap();
        let items = raw.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["name"], "one");
        assert!(items[1]["createdAt"].is_i64());
        assert!(items[1]["lastModified"].is_i64());
    }
}
