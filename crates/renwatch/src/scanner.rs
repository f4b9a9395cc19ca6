//! Job folder discovery.
//!
//! The render manager drops one folder per job under a shared root, at
//! varying depths depending on how operators group projects. The walk
//! visits every subdirectory in sorted order; folders whose name carries
//! the exclusion keyword are dropped before their contents are ever
//! listed.

use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::ScanError;

pub struct JobFolderScanner {
    root: PathBuf,
    exclude_keyword: String,
}

/// Outcome of one walk over the jobs root.
pub struct ScanReport {
    pub folders: Vec<PathBuf>,
    pub excluded: usize,
}

impl JobFolderScanner {
    pub fn new<P: AsRef<Path>>(root: P, exclude_keyword: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude_keyword: exclude_keyword.to_uppercase(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and return every non-excluded job folder in
    /// filesystem enumeration order (sorted per directory).
    pub fn scan(&self) -> ScanReport {
        let mut folders = Vec::new();
        let mut excluded = 0;

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if self.is_excluded(&name) {
                debug!("Excluded folder: {}", entry.path().display());
                excluded += 1;
                continue;
            }

            folders.push(entry.path().to_path_buf());
        }

        info!(
            "Found {} job folders under {} ({} excluded)",
            folders.len(),
            self.root.display(),
            excluded
        );
        ScanReport { folders, excluded }
    }

    fn is_excluded(&self, folder_name: &str) -> bool {
        !self.exclude_keyword.is_empty()
            && folder_name.to_uppercase().contains(&self.exclude_keyword)
    }
}

/// The manifest and log discovered inside one job folder. When several
/// candidates exist the lexicographically first of each kind wins.
#[derive(Debug, Clone)]
pub struct JobFolder {
    pub path: PathBuf,
    pub manifest: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

impl JobFolder {
    pub fn locate(path: &Path) -> Result<Self, ScanError> {
        let entries = std::fs::read_dir(path).map_err(|e| ScanError::ListDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let mut manifest = None;
        let mut log = None;
        for file in files {
            let ext = file
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase);
            match ext.as_deref() {
                Some("xml") if manifest.is_none() => manifest = Some(file),
                Some("txt") | Some("log") if log.is_none() => log = Some(file),
                _ => {}
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            manifest,
            log,
        })
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}
