//! MemFileSystem - in-memory FileSystem for tests and dry runs.
//!
//! # 実装詳細
//! - BTreeMap<PathBuf, Node> で木構造を表現（root は暗黙的に存在）
//! - std::sync::Mutex 一つで全操作を直列化するので create_new はアトミック
//! - ロックを保持したまま await しない

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::ports::{FileSystem, FsError, FsErrorKind, FsMetadata};

#[derive(Debug, Clone)]
enum Node {
    Dir { modified: SystemTime },
    File { data: Vec<u8>, modified: SystemTime },
}

#[derive(Debug, Default)]
pub struct MemFileSystem {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
}

fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.parent().is_none()
}

fn not_a_directory(path: &Path) -> FsError {
    FsError::new(FsErrorKind::Other, path, "not a directory")
}

fn is_a_directory(path: &Path) -> FsError {
    FsError::new(FsErrorKind::Other, path, "is a directory")
}

impl MemFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn nodes(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of files and directories currently stored (root excluded).
    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }

    fn check_parent(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> Result<(), FsError> {
        match path.parent() {
            None => Ok(()),
            Some(parent) if is_root(parent) => Ok(()),
            Some(parent) => match nodes.get(parent) {
                Some(Node::Dir { .. }) => Ok(()),
                Some(Node::File { .. }) => Err(not_a_directory(parent)),
                None => Err(FsError::not_found(parent)),
            },
        }
    }
}

#[async_trait]
impl FileSystem for MemFileSystem {
    async fn metadata(&self, path: &Path) -> Result<FsMetadata, FsError> {
        if is_root(path) {
            return Ok(FsMetadata {
                is_dir: true,
                len: 0,
                modified: SystemTime::UNIX_EPOCH,
            });
        }
        match self.nodes().get(path) {
            Some(Node::Dir { modified }) => Ok(FsMetadata {
                is_dir: true,
                len: 0,
                modified: *modified,
            }),
            Some(Node::File { data, modified }) => Ok(FsMetadata {
                is_dir: false,
                len: data.len() as u64,
                modified: *modified,
            }),
            None => Err(FsError::not_found(path)),
        }
    }

    async fn create_dir(&self, path: &Path, _mode: u32) -> Result<(), FsError> {
        let mut nodes = self.nodes();
        if is_root(path) || nodes.contains_key(path) {
            return Err(FsError::already_exists(path));
        }
        Self::check_parent(&nodes, path)?;
        nodes.insert(
            path.to_path_buf(),
            Node::Dir {
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path, _mode: u32) -> Result<(), FsError> {
        let mut nodes = self.nodes();
        let mut ancestors: Vec<&Path> = path.ancestors().filter(|p| !is_root(p)).collect();
        ancestors.reverse();
        for dir in ancestors {
            match nodes.get(dir) {
                Some(Node::Dir { .. }) => {}
                Some(Node::File { .. }) => return Err(not_a_directory(dir)),
                None => {
                    nodes.insert(
                        dir.to_path_buf(),
                        Node::Dir {
                            modified: SystemTime::now(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        match self.nodes().get(path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(is_a_directory(path)),
            None if is_root(path) => Err(is_a_directory(path)),
            None => Err(FsError::not_found(path)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8], _mode: u32) -> Result<(), FsError> {
        let mut nodes = self.nodes();
        if is_root(path) || matches!(nodes.get(path), Some(Node::Dir { .. })) {
            return Err(is_a_directory(path));
        }
        Self::check_parent(&nodes, path)?;
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: data.to_vec(),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn create_new(&self, path: &Path, _mode: u32) -> Result<(), FsError> {
        let mut nodes = self.nodes();
        if is_root(path) || nodes.contains_key(path) {
            return Err(FsError::already_exists(path));
        }
        Self::check_parent(&nodes, path)?;
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: Vec::new(),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let mut nodes = self.nodes();
        match nodes.get(path) {
            Some(Node::File { .. }) => {
                nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir { .. }) => Err(is_a_directory(path)),
            None => Err(FsError::not_found(path)),
        }
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut nodes = self.nodes();
        if is_root(path) {
            nodes.clear();
            return Ok(());
        }
        if !nodes.contains_key(path) {
            return Err(FsError::not_found(path));
        }
        nodes.retain(|key, _| !key.starts_with(path));
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut nodes = self.nodes();
        if is_root(from) || !nodes.contains_key(from) {
            return Err(FsError::not_found(from));
        }
        if is_root(to) || nodes.contains_key(to) {
            return Err(FsError::already_exists(to));
        }
        if to.starts_with(from) {
            return Err(FsError::new(
                FsErrorKind::Other,
                to,
                "cannot move a directory into itself",
            ));
        }
        Self::check_parent(&nodes, to)?;

        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|key| key.starts_with(from))
            .cloned()
            .collect();
        for old in moved {
            let new = match old.strip_prefix(from) {
                Ok(rel) if !rel.as_os_str().is_empty() => to.join(rel),
                _ => to.to_path_buf(),
            };
            if let Some(node) = nodes.remove(&old) {
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let nodes = self.nodes();
        if !is_root(path) {
            match nodes.get(path) {
                Some(Node::Dir { .. }) => {}
                Some(Node::File { .. }) => return Err(not_a_directory(path)),
                None => return Err(FsError::not_found(path)),
            }
        }
        let names = nodes
            .keys()
            .filter(|key| match key.parent() {
                Some(parent) if is_root(path) => is_root(parent),
                Some(parent) => parent == path,
                None => false,
            })
            .filter_map(|key| key.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        Ok(names)
    }
}
