//! Built-in transpile-and-bundle engine.
//!
//! Turns `<project>/src` and `<project>/public` into an output directory with:
//! - `index.html`: the entry document with stylesheet/script references injected
//! - `bundle.js`: every script-like source, detyped and concatenated
//! - `bundle.css`: every stylesheet concatenated (only when one exists)
//! - all other files of `public/`, copied verbatim
//!
//! There is no module resolution. Scripts are concatenated in a fixed
//! name-based order so that the file defining the mounted `App` symbol lands
//! after its helpers and the auto-mount trailer can reference it.

pub mod transform;

use crate::error::{BentoError, Result, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const ENTRY_DOCUMENT: &str = "index.html";
pub const SCRIPT_BUNDLE: &str = "bundle.js";
pub const STYLE_BUNDLE: &str = "bundle.css";
pub const MOUNT_ELEMENT_ID: &str = "root";
pub const ENTRY_SYMBOL: &str = "App";

const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];
const STYLE_EXTENSIONS: &[&str] = &["css"];

const RUNTIME_PREAMBLE: &str = "import React from 'https://esm.sh/react@18.2.0';\n\
import ReactDOM from 'https://esm.sh/react-dom@18.2.0/client';\n";

/// What a bundle run produced
#[derive(Debug, Clone, Default)]
pub struct BundleReport {
    /// Script sources in concatenation order
    pub scripts: Vec<PathBuf>,
    pub styles: Vec<PathBuf>,
    pub wrote_stylesheet: bool,
    pub assets_copied: usize,
    /// Files present in the output directory afterwards
    pub files_written: usize,
}

/// Bundles one project into one output directory
#[derive(Debug, Clone)]
pub struct Bundler {
    project_root: PathBuf,
    out_dir: PathBuf,
}

impl Bundler {
    pub fn new(project_root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn src_dir(&self) -> PathBuf {
        self.project_root.join("src")
    }

    pub fn public_dir(&self) -> PathBuf {
        self.project_root.join("public")
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Run the whole pipeline. On error the output directory is left as far
    /// as it got.
    pub fn bundle(&self) -> Result<BundleReport> {
        self.recreate_out_dir()?;

        let document = self.load_entry_document()?;

        let src_dir = self.src_dir();
        if !src_dir.is_dir() {
            return Err(BentoError::NotFound(src_dir));
        }
        let (scripts, styles) = discover_sources(&src_dir)?;
        let scripts = order_scripts(scripts);

        tracing::debug!(
            "bundling {} scripts and {} stylesheets from {}",
            scripts.len(),
            styles.len(),
            src_dir.display()
        );

        let script_bundle = bundle_scripts(&src_dir, &scripts)?;
        write(&self.out_dir.join(SCRIPT_BUNDLE), &script_bundle)?;

        let style_bundle = bundle_styles(&src_dir, &styles)?;
        let wrote_stylesheet = match &style_bundle {
            Some(css) if !css.is_empty() => {
                write(&self.out_dir.join(STYLE_BUNDLE), css)?;
                true
            }
            _ => false,
        };

        write(
            &self.out_dir.join(ENTRY_DOCUMENT),
            &inject_references(&document),
        )?;

        let public_dir = self.public_dir();
        let assets_copied = if public_dir.is_dir() {
            crate::fs::copy_dir(&public_dir, &self.out_dir, Some(ENTRY_DOCUMENT))?
        } else {
            0
        };

        let files_written = WalkDir::new(&self.out_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();

        Ok(BundleReport {
            scripts,
            styles,
            wrote_stylesheet,
            assets_copied,
            files_written,
        })
    }

    fn recreate_out_dir(&self) -> Result<()> {
        if self.out_dir.exists() {
            fs::remove_dir_all(&self.out_dir).with_path(&self.out_dir)?;
        }
        fs::create_dir_all(&self.out_dir).with_path(&self.out_dir)
    }

    /// `public/index.html`, or a minimal document with a single mount element
    fn load_entry_document(&self) -> Result<String> {
        let template = self.public_dir().join(ENTRY_DOCUMENT);
        if template.is_file() {
            return fs::read_to_string(&template).with_path(&template);
        }

        let title = self
            .project_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "App".to_string());
        Ok(default_document(&title))
    }
}

fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_path(path)
}

pub fn default_document(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
<html lang=\"en\">\n  \
<head>\n    \
<meta charset=\"UTF-8\" />\n    \
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />\n    \
<title>{}</title>\n  \
</head>\n  \
<body>\n    \
<div id=\"{}\"></div>\n  \
</body>\n\
</html>\n",
        title, MOUNT_ELEMENT_ID
    )
}

/// Insert the stylesheet link before `</head>` and the bundle script before
/// `</body>`. Only the first occurrence of each tag is touched.
pub fn inject_references(document: &str) -> String {
    document
        .replacen(
            "</head>",
            &format!("<link rel=\"stylesheet\" href=\"/{}\" /></head>", STYLE_BUNDLE),
            1,
        )
        .replacen(
            "</body>",
            &format!("<script type=\"module\" src=\"/{}\"></script></body>", SCRIPT_BUNDLE),
            1,
        )
}

/// Recursively collect script-like and style-like files, skipping
/// dot-directories. Both lists are in path order.
pub fn discover_sources(src_dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut scripts = Vec::new();
    let mut styles = Vec::new();

    let walker = WalkDir::new(src_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir() && e.file_name().to_string_lossy().starts_with('.'))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src_dir).to_path_buf();
            BentoError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let ext = entry
            .path()
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        if SCRIPT_EXTENSIONS.contains(&ext.as_str()) {
            scripts.push(entry.into_path());
        } else if STYLE_EXTENSIONS.contains(&ext.as_str()) {
            styles.push(entry.into_path());
        }
    }

    Ok((scripts, styles))
}

/// Concatenation rank of a script, by file name (case-insensitive):
/// everything else 0, "index" 1, "app" 2, "main" 3.
pub fn script_priority(path: &Path) -> u8 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if name.contains("main") {
        3
    } else if name.contains("app") {
        2
    } else if name.contains("index") {
        1
    } else {
        0
    }
}

/// Stable sort by [`script_priority`]; ties keep discovery order
pub fn order_scripts(mut scripts: Vec<PathBuf>) -> Vec<PathBuf> {
    scripts.sort_by_key(|p| script_priority(p));
    scripts
}

fn label(src_dir: &Path, path: &Path) -> String {
    path.strip_prefix(src_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Mounts the entry symbol into the mount element, if the bundle defined it
fn mount_trailer() -> String {
    format!(
        "// Auto-mount\n\
const __mountNode = document.getElementById('{id}');\n\
if (__mountNode && typeof {entry} !== 'undefined') {{\n  \
ReactDOM.createRoot(__mountNode).render(React.createElement({entry}));\n\
}}\n",
        id = MOUNT_ELEMENT_ID,
        entry = ENTRY_SYMBOL
    )
}

/// Runtime preamble, each transformed script under a file comment, then the
/// auto-mount trailer
pub fn bundle_scripts(src_dir: &Path, scripts: &[PathBuf]) -> Result<String> {
    let mut bundle = String::from(RUNTIME_PREAMBLE);
    bundle.push('\n');

    for script in scripts {
        let source = fs::read_to_string(script).with_path(script)?;
        bundle.push_str(&format!("// File: {}\n", label(src_dir, script)));
        bundle.push_str(&transform::transform_script(&source));
        bundle.push_str("\n\n");
    }

    bundle.push_str(&mount_trailer());
    Ok(bundle)
}

/// Raw stylesheet contents under file comments; `None` without stylesheets
pub fn bundle_styles(src_dir: &Path, styles: &[PathBuf]) -> Result<Option<String>> {
    if styles.is_empty() {
        return Ok(None);
    }

    let mut bundle = String::new();
    for style in styles {
        let source = fs::read_to_string(style).with_path(style)?;
        bundle.push_str(&format!("/* File: {} */\n", label(src_dir, style)));
        bundle.push_str(&source);
        bundle.push_str("\n\n");
    }
    Ok(Some(bundle))
}
