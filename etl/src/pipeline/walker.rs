//! Input file discovery and per-file processing loop

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::core::config::FailurePolicy;
use crate::core::constants::DATA_FILE_EXTENSION;
use crate::data::WarehouseRepository;

use super::error::LoadError;

/// Parses one input file and writes its rows to the warehouse
#[async_trait]
pub trait FileLoader: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Load a single file. All of its rows commit together or not at all.
    async fn load(&self, repo: &dyn WarehouseRepository, path: &Path) -> Result<(), LoadError>;
}

/// Outcome of processing one directory tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub found: usize,
    pub loaded: usize,
    /// Files (or unreadable directories) skipped under [`FailurePolicy::Skip`]
    pub failed: Vec<PathBuf>,
}

fn is_data_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DATA_FILE_EXTENSION))
}

/// Data files found under a root, plus entries the walk could not read
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    /// Unreadable directories or symlink loops, kept only under
    /// [`FailurePolicy::Skip`]
    pub unreadable: Vec<PathBuf>,
}

/// Recursively collect `.json` files under `root`, sorted by path
///
/// A walk error fails discovery under [`FailurePolicy::Abort`]. Under
/// [`FailurePolicy::Skip`] the entry is logged and recorded instead.
pub fn discover_files(root: &Path, policy: FailurePolicy) -> Result<Discovery, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::MissingDirectory(root.to_path_buf()));
    }

    let mut discovery = Discovery::default();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if policy == FailurePolicy::Skip => {
                let path = source.path().unwrap_or(root).to_path_buf();
                tracing::warn!(path = %path.display(), error = %source, "Unreadable entry, skipping");
                discovery.unreadable.push(path);
                continue;
            }
            Err(source) => {
                return Err(LoadError::Walk {
                    root: root.to_path_buf(),
                    source,
                });
            }
        };
        if entry.file_type().is_file() && is_data_file(entry.path()) {
            discovery.files.push(entry.into_path());
        }
    }
    discovery.files.sort();
    Ok(discovery)
}

/// Discover every data file under `root` and hand each to `loader`
///
/// Files are processed one at a time in sorted order. Under
/// [`FailurePolicy::Abort`] the first failure stops the run; files already
/// loaded stay committed.
pub async fn process_directory(
    root: &Path,
    loader: &dyn FileLoader,
    repo: &dyn WarehouseRepository,
    policy: FailurePolicy,
) -> Result<WalkSummary, LoadError> {
    let Discovery { files, unreadable } = discover_files(root, policy)?;
    let total = files.len();
    tracing::info!(root = %root.display(), "{} files found", total);

    let mut summary = WalkSummary {
        found: total,
        loaded: 0,
        failed: unreadable,
    };

    for (i, file) in files.iter().enumerate() {
        match loader.load(repo, file).await {
            Ok(()) => summary.loaded += 1,
            Err(e) => match policy {
                FailurePolicy::Abort => {
                    tracing::error!(
                        loader = loader.name(),
                        path = %file.display(),
                        error = %e,
                        "File failed, aborting"
                    );
                    return Err(e);
                }
                FailurePolicy::Skip => {
                    let constraint = matches!(
                        &e,
                        LoadError::Data { source, .. } if source.is_constraint_violation()
                    );
                    tracing::warn!(
                        loader = loader.name(),
                        path = ?e.path().unwrap_or(file),
                        constraint,
                        error = %e,
                        "File failed, skipping"
                    );
                    summary.failed.push(file.clone());
                }
            },
        }
        tracing::info!(loader = loader.name(), "{}/{} files processed", i + 1, total);
    }

    tracing::info!(
        loader = loader.name(),
        found = summary.found,
        loaded = summary.loaded,
        failed = summary.failed.len(),
        "Directory processed"
    );
    Ok(summary)
}
