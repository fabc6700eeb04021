//! Mirror planning and execution.
//!
//! The remote root is made to match the filtered local tree: stale remote
//! files and directories are removed, missing directories are created and
//! every local file is uploaded. Uploads always overwrite; no content
//! comparison is made.

use std::collections::BTreeSet;

use indicatif::ProgressBar;
use tracing::debug;

use crate::error::DeployError;
use crate::remote::{remote_join, EntryKind, RemoteFs};
use crate::scanner::{LocalFile, LocalTree};

/// Remote files and directories under the remote root, relative to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTree {
    pub files: BTreeSet<String>,
    pub dirs: BTreeSet<String>,
}

/// Ordered mirror operations
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Stale remote files
    pub delete_files: Vec<String>,
    /// Stale remote directories, deepest first
    pub delete_dirs: Vec<String>,
    /// Missing remote directories, parents first
    pub make_dirs: Vec<String>,
    /// Every selected local file
    pub uploads: Vec<LocalFile>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.delete_files.is_empty()
            && self.delete_dirs.is_empty()
            && self.make_dirs.is_empty()
            && self.uploads.is_empty()
    }
}

/// Counters collected while applying a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub files_uploaded: u64,
    pub bytes_uploaded: u64,
    pub files_deleted: u64,
    pub dirs_deleted: u64,
    pub dirs_created: u64,
}

/// Recursively list everything under `root`.
///
/// A missing root yields an empty tree.
pub fn walk_remote(fs: &mut dyn RemoteFs, root: &str) -> Result<RemoteTree, DeployError> {
    let mut tree = RemoteTree::default();
    let mut pending = vec![String::new()];

    while let Some(relative) = pending.pop() {
        let path = remote_join(root, &relative);
        let Some(entries) = fs.list_dir(&path)? else {
            continue;
        };

        for entry in entries {
            if entry.name.is_empty() || entry.name == "." || entry.name == ".." {
                continue;
            }
            let child = if relative.is_empty() {
                entry.name
            } else {
                format!("{relative}/{}", entry.name)
            };
            match entry.kind {
                EntryKind::Dir => {
                    tree.dirs.insert(child.clone());
                    pending.push(child);
                }
                EntryKind::File => {
                    tree.files.insert(child);
                }
            }
        }
    }

    Ok(tree)
}

/// Compute the operations that turn `remote` into a mirror of `local`
pub fn plan_sync(local: &LocalTree, remote: &RemoteTree) -> SyncPlan {
    let local_files: BTreeSet<&str> = local.files.iter().map(|f| f.relative.as_str()).collect();

    let delete_files = remote
        .files
        .iter()
        .filter(|path| !local_files.contains(path.as_str()))
        .cloned()
        .collect();

    // Reverse lexical order puts children ahead of their parents.
    let delete_dirs = remote
        .dirs
        .iter()
        .rev()
        .filter(|dir| !local.dirs.contains(*dir))
        .cloned()
        .collect();

    let make_dirs = local
        .dirs
        .iter()
        .filter(|dir| !remote.dirs.contains(*dir))
        .cloned()
        .collect();

    SyncPlan {
        delete_files,
        delete_dirs,
        make_dirs,
        uploads: local.files.clone(),
    }
}

/// Apply a plan against the remote root.
///
/// Stops at the first failing operation; nothing already done is undone.
pub fn apply_plan(
    fs: &mut dyn RemoteFs,
    plan: &SyncPlan,
    remote_root: &str,
    progress: &ProgressBar,
) -> Result<SyncStats, DeployError> {
    let mut stats = SyncStats::default();

    for relative in &plan.delete_files {
        let path = remote_join(remote_root, relative);
        debug!(path = %path, "removing stale file");
        fs.remove_file(&path)?;
        stats.files_deleted += 1;
    }

    for relative in &plan.delete_dirs {
        let path = remote_join(remote_root, relative);
        debug!(path = %path, "removing stale directory");
        fs.remove_dir(&path)?;
        stats.dirs_deleted += 1;
    }

    for relative in &plan.make_dirs {
        let path = remote_join(remote_root, relative);
        debug!(path = %path, "creating directory");
        fs.make_dir(&path)?;
        stats.dirs_created += 1;
    }

    for file in &plan.uploads {
        let path = remote_join(remote_root, &file.relative);
        progress.set_message(file.relative.clone());
        let bytes = fs.upload(&file.path, &path)?;
        debug!(path = %path, bytes, "uploaded");
        stats.files_uploaded += 1;
        stats.bytes_uploaded += bytes;
        progress.inc(1);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryFs;
    use crate::rules::TransferRules;
    use crate::scanner::scan_local;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn local_file(relative: &str) -> LocalFile {
        LocalFile {
            relative: relative.to_string(),
            path: PathBuf::from("/nonexistent").join(relative),
            size: 0,
        }
    }

    fn local_tree(files: &[&str]) -> LocalTree {
        let mut tree = LocalTree::default();
        for f in files {
            for parent in crate::scanner::parent_dirs(f) {
                tree.dirs.insert(parent.to_string());
            }
            tree.files.push(local_file(f));
        }
        tree.files.sort_by(|a, b| a.relative.cmp(&b.relative));
        tree
    }

    fn remote_tree(files: &[&str], dirs: &[&str]) -> RemoteTree {
        RemoteTree {
            files: files.iter().map(|s| s.to_string()).collect(),
            dirs: dirs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    // ==================== walk_remote tests ====================

    #[test]
    fn test_walk_remote_nested() {
        let mut fs = MemoryFs::new()
            .with_dir("/site")
            .with_file("/site/index.html", "x")
            .with_dir("/site/assets")
            .with_file("/site/assets/app.js", "y")
            .with_dir("/site/assets/img");

        let tree = walk_remote(&mut fs, "/site").unwrap();

        assert_eq!(tree, remote_tree(&["assets/app.js", "index.html"], &["assets", "assets/img"]));
    }

    #[test]
    fn test_walk_remote_missing_root_is_empty() {
        let mut fs = MemoryFs::new();
        let tree = walk_remote(&mut fs, "/site").unwrap();
        assert_eq!(tree, RemoteTree::default());
    }

    #[test]
    fn test_walk_remote_propagates_errors() {
        let mut fs = MemoryFs::new().with_dir("/site").fail_on("list /site");
        assert!(walk_remote(&mut fs, "/site").is_err());
    }

    // ==================== plan_sync tests ====================

    #[test]
    fn test_plan_fresh_remote() {
        let local = local_tree(&["index.html", "assets/app.js", "assets/img/logo.svg"]);

        let plan = plan_sync(&local, &RemoteTree::default());

        assert!(plan.delete_files.is_empty());
        assert!(plan.delete_dirs.is_empty());
        assert_eq!(plan.make_dirs, vec!["assets", "assets/img"]);
        assert_eq!(plan.uploads.len(), 3);
    }

    #[test]
    fn test_plan_deletes_stale_files() {
        let local = local_tree(&["index.html"]);
        let remote = remote_tree(&["index.html", "old.html"], &[]);

        let plan = plan_sync(&local, &remote);

        assert_eq!(plan.delete_files, vec!["old.html"]);
        assert_eq!(plan.uploads.len(), 1);
    }

    #[test]
    fn test_plan_deletes_stale_dirs_deepest_first() {
        let local = local_tree(&["index.html"]);
        let remote = remote_tree(
            &["legacy/a/b/x.js", "legacy/y.js"],
            &["legacy", "legacy/a", "legacy/a/b"],
        );

        let plan = plan_sync(&local, &remote);

        assert_eq!(plan.delete_files, vec!["legacy/a/b/x.js", "legacy/y.js"]);
        assert_eq!(plan.delete_dirs, vec!["legacy/a/b", "legacy/a", "legacy"]);
    }

    #[test]
    fn test_plan_keeps_existing_dirs() {
        let local = local_tree(&["assets/app.js"]);
        let remote = remote_tree(&["assets/app.js"], &["assets"]);

        let plan = plan_sync(&local, &remote);

        assert!(plan.make_dirs.is_empty());
        assert!(plan.delete_dirs.is_empty());
        assert!(plan.delete_files.is_empty());
        assert_eq!(plan.uploads.len(), 1);
    }

    #[test]
    fn test_plan_file_replaced_by_directory() {
        let local = local_tree(&["docs/index.html"]);
        let remote = remote_tree(&["docs"], &[]);

        let plan = plan_sync(&local, &remote);

        assert_eq!(plan.delete_files, vec!["docs"]);
        assert_eq!(plan.make_dirs, vec!["docs"]);
    }

    #[test]
    fn test_plan_empty_everything() {
        let plan = plan_sync(&LocalTree::default(), &RemoteTree::default());
        assert!(plan.is_empty());
    }

    // ==================== apply_plan tests ====================

    #[test]
    fn test_apply_mirrors_local_tree() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "index.html", "<html>");
        write(temp.path(), ".htaccess", "RewriteEngine On");
        write(temp.path(), "assets/app.js", "js");
        write(temp.path(), "debug.log", "excluded");

        let mut fs = MemoryFs::new()
            .with_dir("/site")
            .with_file("/site/old.html", "stale")
            .with_dir("/site/legacy")
            .with_file("/site/legacy/x.js", "stale")
            .with_file("/site/debug.log", "remote log");

        let local = scan_local(temp.path(), &TransferRules::standard()).unwrap();
        let remote = walk_remote(&mut fs, "/site").unwrap();
        let plan = plan_sync(&local, &remote);
        let stats = apply_plan(&mut fs, &plan, "/site", &ProgressBar::hidden()).unwrap();

        assert_eq!(fs.read("/site/index.html"), Some(b"<html>".to_vec()));
        assert_eq!(fs.read("/site/.htaccess"), Some(b"RewriteEngine On".to_vec()));
        assert_eq!(fs.read("/site/assets/app.js"), Some(b"js".to_vec()));
        assert!(!fs.exists("/site/old.html"));
        assert!(!fs.exists("/site/legacy"));
        assert!(!fs.exists("/site/debug.log"));

        assert_eq!(
            stats,
            SyncStats {
                files_uploaded: 3,
                bytes_uploaded: 6 + 16 + 2,
                files_deleted: 3,
                dirs_deleted: 1,
                dirs_created: 1,
            }
        );
    }

    #[test]
    fn test_apply_deletes_before_uploading() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "index.html", "new");

        let mut fs = MemoryFs::new()
            .with_dir("/site")
            .with_file("/site/old.html", "stale");

        let local = scan_local(temp.path(), &TransferRules::standard()).unwrap();
        let remote = walk_remote(&mut fs, "/site").unwrap();
        let plan = plan_sync(&local, &remote);
        apply_plan(&mut fs, &plan, "/site", &ProgressBar::hidden()).unwrap();

        let ops = fs.state().ops.clone();
        let rm = ops.iter().position(|op| op == "rm /site/old.html").unwrap();
        let up = ops.iter().position(|op| op == "upload /site/index.html").unwrap();
        assert!(rm < up);
    }

    #[test]
    fn test_apply_stops_on_first_failure() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.html", "a");
        write(temp.path(), "b.html", "b");

        let mut fs = MemoryFs::new()
            .with_dir("/site")
            .fail_on("upload /site/a.html");

        let local = scan_local(temp.path(), &TransferRules::standard()).unwrap();
        let plan = plan_sync(&local, &RemoteTree::default());
        let err = apply_plan(&mut fs, &plan, "/site", &ProgressBar::hidden()).unwrap_err();

        assert!(err.to_string().contains("simulated failure"));
        assert!(!fs.exists("/site/b.html"));
    }

    #[test]
    fn test_apply_advances_progress() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.html", "a");
        write(temp.path(), "b.html", "b");

        let mut fs = MemoryFs::new().with_dir("/site");
        let local = scan_local(temp.path(), &TransferRules::standard()).unwrap();
        let plan = plan_sync(&local, &RemoteTree::default());
        let progress = ProgressBar::hidden();
        progress.set_length(plan.uploads.len() as u64);

        apply_plan(&mut fs, &plan, "/site", &progress).unwrap();

        assert_eq!(progress.position(), 2);
    }
}
