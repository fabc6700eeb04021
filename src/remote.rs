//! Remote filesystem seam shared by the FTP and SFTP backends.
//!
//! Paths handed to a [`RemoteFs`] are absolute slash-separated remote paths.
//! Every call blocks until the remote side has answered.

use std::path::Path;

use crate::config::DeploymentConfig;
use crate::error::DeployError;

/// Kind of a remote directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// A single entry returned by [`RemoteFs::list_dir`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Base name, never `.` or `..`
    pub name: String,
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }
}

/// Operations the mirror needs from a remote host
pub trait RemoteFs {
    /// List a directory; `Ok(None)` when it does not exist
    fn list_dir(&mut self, path: &str) -> Result<Option<Vec<RemoteEntry>>, DeployError>;

    /// Create a single directory whose parent exists
    fn make_dir(&mut self, path: &str) -> Result<(), DeployError>;

    /// Upload a local file, replacing any remote file. Returns bytes written.
    fn upload(&mut self, local: &Path, remote: &str) -> Result<u64, DeployError>;

    fn remove_file(&mut self, path: &str) -> Result<(), DeployError>;

    /// Remove an empty directory
    fn remove_dir(&mut self, path: &str) -> Result<(), DeployError>;

    /// Close the session politely
    fn close(&mut self) -> Result<(), DeployError>;
}

/// Opens a [`RemoteFs`] session for a deployment
pub trait Connector {
    fn connect(&self, config: &DeploymentConfig) -> Result<Box<dyn RemoteFs>, DeployError>;
}

/// Join a remote base path and a slash-separated relative path
pub fn remote_join(base: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return relative.to_string();
    }
    if base.ends_with('/') {
        format!("{base}{relative}")
    } else {
        format!("{base}/{relative}")
    }
}

/// Create a remote directory and any missing parents
pub fn make_dir_all(fs: &mut dyn RemoteFs, path: &str) -> Result<(), DeployError> {
    let absolute = path.starts_with('/');
    let mut current = String::new();

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current = if current.is_empty() && absolute {
            format!("/{segment}")
        } else {
            remote_join(&current, segment)
        };

        if fs.list_dir(&current)?.is_none() {
            fs.make_dir(&current)?;
        }
    }

    Ok(())
}

/// In-memory [`RemoteFs`], used by tests and benchmarks
pub mod memory {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::rc::Rc;

    use super::{Connector, EntryKind, RemoteEntry, RemoteFs};
    use crate::config::DeploymentConfig;
    use crate::error::DeployError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Node {
        File(Vec<u8>),
        Dir,
    }

    /// Shared state so a test can inspect the tree after the session is gone
    #[derive(Debug, Default)]
    pub struct MemoryState {
        pub nodes: BTreeMap<String, Node>,
        /// Operation log, e.g. `upload /site/index.html`
        pub ops: Vec<String>,
        /// Fail any operation whose log line starts with this prefix
        pub fail_on: Option<String>,
        pub closed: bool,
    }

    #[derive(Debug, Clone, Default)]
    pub struct MemoryFs {
        state: Rc<RefCell<MemoryState>>,
    }

    impl MemoryFs {
        pub fn new() -> Self {
            let fs = Self::default();
            fs.state.borrow_mut().nodes.insert("/".to_string(), Node::Dir);
            fs
        }

        pub fn with_dir(self, path: &str) -> Self {
            self.state
                .borrow_mut()
                .nodes
                .insert(path.to_string(), Node::Dir);
            self
        }

        pub fn with_file(self, path: &str, content: &str) -> Self {
            self.state
                .borrow_mut()
                .nodes
                .insert(path.to_string(), Node::File(content.as_bytes().to_vec()));
            self
        }

        pub fn fail_on(self, prefix: &str) -> Self {
            self.state.borrow_mut().fail_on = Some(prefix.to_string());
            self
        }

        pub fn state(&self) -> std::cell::Ref<'_, MemoryState> {
            self.state.borrow()
        }

        pub fn exists(&self, path: &str) -> bool {
            self.state.borrow().nodes.contains_key(path)
        }

        pub fn read(&self, path: &str) -> Option<Vec<u8>> {
            match self.state.borrow().nodes.get(path) {
                Some(Node::File(data)) => Some(data.clone()),
                _ => None,
            }
        }

        fn record(&self, op: &'static str, path: &str) -> Result<(), DeployError> {
            let mut state = self.state.borrow_mut();
            let line = format!("{op} {path}");
            if let Some(prefix) = &state.fail_on {
                if line.starts_with(prefix.as_str()) {
                    return Err(DeployError::transfer(op, path, "550 simulated failure"));
                }
            }
            state.ops.push(line);
            Ok(())
        }

        fn parent_exists(&self, path: &str) -> bool {
            let parent = match path.rfind('/') {
                Some(0) => "/",
                Some(idx) => &path[..idx],
                None => return true,
            };
            matches!(self.state.borrow().nodes.get(parent), Some(Node::Dir))
        }

        fn has_children(&self, path: &str) -> bool {
            let prefix = format!("{}/", path.trim_end_matches('/'));
            self.state
                .borrow()
                .nodes
                .keys()
                .any(|k| k.starts_with(&prefix))
        }
    }

    impl RemoteFs for MemoryFs {
        fn list_dir(&mut self, path: &str) -> Result<Option<Vec<RemoteEntry>>, DeployError> {
            self.record("list", path)?;
            let state = self.state.borrow();
            if !matches!(state.nodes.get(path), Some(Node::Dir)) {
                return Ok(None);
            }

            let prefix = format!("{}/", path.trim_end_matches('/'));
            let entries = state
                .nodes
                .iter()
                .filter_map(|(key, node)| {
                    let rest = key.strip_prefix(&prefix)?;
                    if rest.is_empty() || rest.contains('/') {
                        return None;
                    }
                    let kind = match node {
                        Node::Dir => EntryKind::Dir,
                        Node::File(_) => EntryKind::File,
                    };
                    Some(RemoteEntry {
                        name: rest.to_string(),
                        kind,
                    })
                })
                .collect();
            Ok(Some(entries))
        }

        fn make_dir(&mut self, path: &str) -> Result<(), DeployError> {
            self.record("mkdir", path)?;
            if !self.parent_exists(path) {
                return Err(DeployError::transfer("mkdir", path, "550 parent missing"));
            }
            self.state
                .borrow_mut()
                .nodes
                .insert(path.to_string(), Node::Dir);
            Ok(())
        }

        fn upload(&mut self, local: &Path, remote: &str) -> Result<u64, DeployError> {
            self.record("upload", remote)?;
            if !self.parent_exists(remote) {
                return Err(DeployError::transfer("upload", remote, "553 parent missing"));
            }
            let data = std::fs::read(local)?;
            let len = data.len() as u64;
            self.state
                .borrow_mut()
                .nodes
                .insert(remote.to_string(), Node::File(data));
            Ok(len)
        }

        fn remove_file(&mut self, path: &str) -> Result<(), DeployError> {
            self.record("rm", path)?;
            let mut state = self.state.borrow_mut();
            if !matches!(state.nodes.get(path), Some(Node::File(_))) {
                return Err(DeployError::transfer("rm", path, "550 no such file"));
            }
            state.nodes.remove(path);
            Ok(())
        }

        fn remove_dir(&mut self, path: &str) -> Result<(), DeployError> {
            self.record("rmdir", path)?;
            if self.has_children(path) {
                return Err(DeployError::transfer("rmdir", path, "550 directory not empty"));
            }
            self.state.borrow_mut().nodes.remove(path);
            Ok(())
        }

        fn close(&mut self) -> Result<(), DeployError> {
            self.state.borrow_mut().closed = true;
            Ok(())
        }
    }

    /// Hands out sessions sharing one [`MemoryFs`]
    #[derive(Debug, Clone, Default)]
    pub struct MemoryConnector {
        pub fs: MemoryFs,
        /// Simulated connection failure message
        pub refuse: Option<String>,
        pub connects: Rc<RefCell<u32>>,
    }

    impl MemoryConnector {
        pub fn new(fs: MemoryFs) -> Self {
            Self {
                fs,
                refuse: None,
                connects: Rc::default(),
            }
        }

        pub fn refusing(message: &str) -> Self {
            Self {
                fs: MemoryFs::new(),
                refuse: Some(message.to_string()),
                connects: Rc::default(),
            }
        }

        pub fn connect_count(&self) -> u32 {
            *self.connects.borrow()
        }
    }

    impl Connector for MemoryConnector {
        fn connect(&self, config: &DeploymentConfig) -> Result<Box<dyn RemoteFs>, DeployError> {
            *self.connects.borrow_mut() += 1;
            if let Some(message) = &self.refuse {
                return Err(DeployError::Connect {
                    host: config.host.clone(),
                    port: config.port,
                    message: message.clone(),
                });
            }
            Ok(Box::new(self.fs.clone()))
        }
    }
}
