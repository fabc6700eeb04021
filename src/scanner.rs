use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::DeployError;
use crate::rules::TransferRules;

/// A local file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Slash-separated path relative to the local root
    pub relative: String,
    /// Path on disk
    pub path: PathBuf,
    /// Size in bytes at scan time
    pub size: u64,
}

/// Filtered view of the local build directory
#[derive(Debug, Clone, Default)]
pub struct LocalTree {
    /// Files sorted by relative path
    pub files: Vec<LocalFile>,
    /// Directories that contain at least one selected file
    pub dirs: BTreeSet<String>,
}

impl LocalTree {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Convert a relative path to the slash-separated form used on the remote side
pub fn to_slash(rel: &Path) -> String {
    let mut out = String::new();
    for component in rel.components() {
        if let Component::Normal(name) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&name.to_string_lossy());
        }
    }
    out
}

/// Walk the local root and collect every transferable file.
///
/// Excluded directories are pruned and not descended into. Symlinks are
/// followed so a linked asset directory is deployed as real files.
pub fn scan_local(root: &Path, rules: &TransferRules) -> Result<LocalTree, DeployError> {
    if !root.is_dir() {
        return Err(DeployError::LocalRootMissing {
            path: root.to_path_buf(),
        });
    }

    let mut tree = LocalTree::default();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            rules.is_transferable(rel, entry.file_type().is_dir())
        });

    for entry in walker {
        let entry = entry.map_err(|source| DeployError::Scan {
            path: root.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let relative = to_slash(rel);
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

        for parent in parent_dirs(&relative) {
            tree.dirs.insert(parent.to_string());
        }

        tree.files.push(LocalFile {
            relative,
            path: entry.path().to_path_buf(),
            size,
        });
    }

    tree.files.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(tree)
}

/// Every ancestor directory of a slash-separated relative path, outermost first
pub fn parent_dirs(relative: &str) -> impl Iterator<Item = &str> {
    relative
        .match_indices('/')
        .map(move |(idx, _)| &relative[..idx])
}
