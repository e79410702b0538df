use crate::application::Snapshot;
use crate::domain::normalize::graph_from_document;
use crate::error::Result;
use crate::ports::SnapshotSource;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Reads snapshot documents (`*.json`) from explicit files and folders.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLoader {
    pub files: Vec<String>,
    pub folders: Vec<String>,
}

impl SnapshotLoader {
    pub fn new(files: Vec<String>, folders: Vec<String>) -> Self {
        Self { files, folders }
    }

    /// Parse one snapshot document from text.
    pub fn parse_str(name: &str, content: &str) -> Result<Snapshot> {
        let document: serde_json::Value = serde_json::from_str(content)?;
        Ok(Snapshot {
            name: name.to_string(),
            graph: graph_from_document(&document),
        })
    }

    pub fn load_file(path: &Path) -> Result<Snapshot> {
        let content = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse_str(&name, &content)
    }

    /// Every `*.json` under `dir`, sorted by path. Unparseable files are
    /// skipped with a warning rather than aborting the whole folder.
    pub fn load_folder(dir: &Path) -> Result<Vec<Snapshot>> {
        let mut paths = Vec::new();
        Self::collect_json_recursive(dir, &mut paths)?;
        paths.sort();

        let mut snapshots = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::load_file(Path::new(&path)) {
                Ok(s) => snapshots.push(s),
                Err(e) => warn!(path = %path, error = %e, "skipping unreadable snapshot"),
            }
        }
        Ok(snapshots)
    }

    fn collect_json_recursive(dir: &Path, out: &mut Vec<String>) -> Result<()> {
        if dir.ends_with("target") || dir.ends_with(".git") {
            return Ok(());
        }
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                Self::collect_json_recursive(&path, out)?;
            } else if let Some(ext) = path.extension() {
                if ext == "json" {
                    out.push(path.display().to_string());
                }
            }
        }
        Ok(())
    }
}

impl SnapshotSource for SnapshotLoader {
    fn load(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for file in &self.files {
            snapshots.push(Self::load_file(Path::new(file))?);
        }
        for folder in &self.folders {
            snapshots.extend(Self::load_folder(Path::new(folder))?);
        }
        debug!(count = snapshots.len(), "snapshots loaded");
        Ok(snapshots)
    }
}
