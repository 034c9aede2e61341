//! Path handling.
//!
//! User-supplied paths (CLI arguments, import targets) go through
//! [`SafePath`]. Paths requested over HTTP go through [`resolve_within`],
//! which only ever answers with canonical paths inside the served root.

use crate::error::{BentoError, Result};
use std::path::{Path, PathBuf};

/// Schemes that name something other than a local directory
const REMOTE_PREFIXES: &[&str] = &[
    "\\\\", "ssh://", "sftp://", "smb://", "nfs://", "http://", "https://",
];

/// A local path typed by the user, tilde-expanded and, when it exists,
/// canonicalized
#[derive(Debug, Clone)]
pub struct SafePath {
    expanded: PathBuf,
    canonical: Option<PathBuf>,
}

impl SafePath {
    /// Rejects empty input and remote locations (UNC shares, URLs). The path
    /// itself need not exist yet.
    pub fn from_user_input(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(BentoError::validation("Path cannot be empty"));
        }
        if REMOTE_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
            return Err(BentoError::validation(format!(
                "Only local paths are supported: {}",
                trimmed
            )));
        }

        let expanded = PathBuf::from(shellexpand::tilde(trimmed).as_ref());
        let canonical = expanded.canonicalize().ok();
        Ok(Self { expanded, canonical })
    }

    pub fn expanded(&self) -> &Path {
        &self.expanded
    }

    /// Canonical form when the path exists, else the expanded form
    pub fn as_path(&self) -> &Path {
        self.canonical.as_deref().unwrap_or(&self.expanded)
    }

    /// The path as a directory: `NotFound` when missing, `Validation` when it
    /// is something else
    pub fn require_dir(&self) -> Result<&Path> {
        if !self.expanded.exists() {
            return Err(BentoError::NotFound(self.expanded.clone()));
        }
        if !self.expanded.is_dir() {
            return Err(BentoError::validation(format!(
                "Not a directory: {}",
                self.expanded.display()
            )));
        }
        Ok(self.as_path())
    }
}

/// Outcome of resolving a request path inside a sandbox root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Canonical path of an existing file inside the root
    File(PathBuf),
    /// Canonical path of an existing directory inside the root
    Directory(PathBuf),
    /// Does not exist, or resolves outside the root
    Missing,
}

/// True when `candidate` is `root` or lies below it.
///
/// Both paths must already be canonical. The comparison is per component, so
/// `/srv/www-evil` is not inside `/srv/www`.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}

/// Resolve a request path (e.g. `/assets/logo.png`) against `root`.
///
/// The joined path is canonicalized before the containment check, which
/// defeats `..` segments and symlinks pointing out of the root.
pub fn resolve_within(root: &Path, request_path: &str) -> Resolved {
    let Ok(canonical_root) = root.canonicalize() else {
        return Resolved::Missing;
    };

    let relative = request_path.trim_start_matches(['/', '\\']);
    let candidate = canonical_root.join(relative);

    let Ok(canonical) = candidate.canonicalize() else {
        return Resolved::Missing;
    };

    if !is_within(&canonical_root, &canonical) {
        tracing::debug!(
            "rejecting {} (resolves outside {})",
            request_path,
            canonical_root.display()
        );
        return Resolved::Missing;
    }

    if canonical.is_dir() {
        Resolved::Directory(canonical)
    } else {
        Resolved::File(canonical)
    }
}
