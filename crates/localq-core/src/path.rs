//! QueuePath - a filesystem location bound to a FileSystem backend.
//!
//! Every component performs I/O only through this type. Deriving a path
//! (`join`, `parent`, `resolve`) produces a new value and never touches the
//! backend; the receiver is left as is.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::ports::{FileSystem, FsError, FsMetadata};

#[derive(Clone)]
pub struct QueuePath {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    mode: u32,
}

impl QueuePath {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, mode: u32) -> Self {
        Self {
            path: path.into(),
            fs,
            mode,
        }
    }

    fn with_path(&self, path: PathBuf) -> Self {
        Self {
            path,
            fs: Arc::clone(&self.fs),
            mode: self.mode,
        }
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.path.clone()
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    // ------------------------------------------------------------------
    // Pure path arithmetic
    // ------------------------------------------------------------------

    /// Absolute, with `.` and `..` folded away lexically.
    ///
    /// Relative paths are anchored at the process's current directory,
    /// which is the only part that can fail.
    pub fn resolve(&self) -> Result<Self, FsError> {
        let absolute = if self.path.is_absolute() {
            self.path.clone()
        } else {
            let cwd = std::env::current_dir().map_err(|e| FsError::from_io(&self.path, e))?;
            cwd.join(&self.path)
        };
        Ok(self.with_path(normalize(&absolute)))
    }

    pub fn join(&self, segment: impl AsRef<Path>) -> Self {
        self.with_path(self.path.join(segment))
    }

    /// The containing directory; a root is its own parent.
    pub fn parent(&self) -> Self {
        match self.path.parent() {
            Some(parent) => self.with_path(parent.to_path_buf()),
            None => self.clone(),
        }
    }

    /// Last component, e.g. `file.txt`.
    pub fn name(&self) -> String {
        match self.path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => self.path.to_string_lossy().into_owned(),
        }
    }

    /// Name without its last extension, e.g. `file` for `file.txt`.
    pub fn stem(&self) -> String {
        match self.path.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => self.name(),
        }
    }

    /// Last extension including the dot, or empty.
    pub fn suffix(&self) -> String {
        match self.path.extension() {
            Some(ext) => format!(".{}", ext.to_string_lossy()),
            None => String::new(),
        }
    }

    // ------------------------------------------------------------------
    // Backend operations
    // ------------------------------------------------------------------

    pub async fn stat(&self) -> Result<FsMetadata, FsError> {
        self.fs.metadata(&self.path).await
    }

    pub async fn mod_time(&self) -> Result<DateTime<Utc>, FsError> {
        Ok(DateTime::<Utc>::from(self.stat().await?.modified))
    }

    /// Any failure (including permission errors) reads as "absent".
    pub async fn exists(&self) -> bool {
        self.stat().await.is_ok()
    }

    pub async fn is_dir(&self) -> bool {
        self.stat().await.map(|m| m.is_dir).unwrap_or(false)
    }

    pub async fn is_file(&self) -> bool {
        self.stat().await.map(|m| m.is_file()).unwrap_or(false)
    }

    pub async fn mkdir(&self) -> Result<(), FsError> {
        self.fs.create_dir(&self.path, self.mode).await
    }

    pub async fn mkdirs(&self) -> Result<(), FsError> {
        self.fs.create_dir_all(&self.path, self.mode).await
    }

    pub async fn read(&self) -> Result<Vec<u8>, FsError> {
        self.fs.read(&self.path).await
    }

    pub async fn write(&self, data: &[u8]) -> Result<(), FsError> {
        self.fs.write(&self.path, data, self.mode).await
    }

    /// Exclusive create; see `FileSystem::create_new`.
    pub async fn create_new(&self) -> Result<(), FsError> {
        self.fs.create_new(&self.path, self.mode).await
    }

    /// Remove a file, or a directory with everything below it.
    pub async fn remove(&self) -> Result<(), FsError> {
        if self.stat().await?.is_dir {
            self.fs.remove_dir_all(&self.path).await
        } else {
            self.fs.remove_file(&self.path).await
        }
    }

    /// Atomic move within the same backend; `to` must not exist.
    pub async fn rename(&self, to: &QueuePath) -> Result<(), FsError> {
        self.fs.rename(&self.path, &to.path).await
    }

    /// Immediate children. Called on a file, lists the file's directory.
    pub async fn read_dir(&self) -> Result<Vec<QueuePath>, FsError> {
        let dir = if self.is_file().await {
            self.parent()
        } else {
            self.clone()
        };
        let names = self.fs.read_dir(&dir.path).await?;
        Ok(names.into_iter().map(|name| dir.join(name)).collect())
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl PartialEq for QueuePath {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.mode == other.mode && Arc::ptr_eq(&self.fs, &other.fs)
    }
}

impl Eq for QueuePath {}

impl fmt::Debug for QueuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuePath")
            .field("path", &self.path)
            .field("mode", &format_args!("{:o}", self.mode))
            .finish()
    }
}

impl fmt::Display for QueuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::MemFileSystem;

    fn make_path() -> QueuePath {
        QueuePath::new("/some/root", Arc::new(MemFileSystem::new()), 0o777)
    }

    #[test]
    fn clone_is_equal() {
        let pth = make_path();
        assert_eq!(pth.clone(), pth);
        assert_eq!(pth.to_string(), "/some/root");
    }

    #[test]
    fn dir_info() {
        let pth = make_path();
        assert_eq!(pth.name(), "root");
        assert_eq!(pth.suffix(), "");
        assert_eq!(pth.stem(), "root");
    }

    #[test]
    fn file_info() {
        let pth = make_path().join("file.txt");
        assert_eq!(pth.name(), "file.txt");
        assert_eq!(pth.suffix(), ".txt");
        assert_eq!(pth.stem(), "file");

        let pth = make_path().join("archive.tar.gz");
        assert_eq!(pth.suffix(), ".gz");
        assert_eq!(pth.stem(), "archive.tar");
    }

    #[test]
    fn derived_paths_leave_original_untouched() {
        let pth = make_path();
        let child = pth.join("a").join("b");
        assert_eq!(child.to_string(), "/some/root/a/b");
        assert_eq!(child.parent().to_string(), "/some/root/a");
        assert_eq!(pth.to_string(), "/some/root");
        assert_eq!(QueuePath::new("/", Arc::new(MemFileSystem::new()), 0o777).parent().to_string(), "/");
    }

    #[test]
    fn resolve_folds_dots() {
        let pth = QueuePath::new("/q/./a/../b", Arc::new(MemFileSystem::new()), 0o777);
        assert_eq!(pth.resolve().unwrap().to_string(), "/q/b");

        let rel = QueuePath::new("local", Arc::new(MemFileSystem::new()), 0o777);
        let resolved = rel.resolve().unwrap();
        assert!(resolved.as_path().is_absolute());
        assert_eq!(resolved.name(), "local");
    }

    #[tokio::test]
    async fn mkdirs_and_mkdir() {
        let pth = make_path();
        assert!(!pth.exists().await);

        pth.mkdirs().await.unwrap();
        assert!(pth.exists().await);
        assert!(pth.is_dir().await);

        let foo = pth.join("foo");
        foo.mkdir().await.unwrap();
        assert!(foo.is_dir().await);
        assert!(foo.mkdir().await.unwrap_err().is_already_exists());
    }

    #[tokio::test]
    async fn write_then_read() {
        let pth = make_path();
        pth.mkdirs().await.unwrap();
        let file = pth.join("file.txt");

        assert!(!file.exists().await);
        file.write(b"data").await.unwrap();
        assert!(file.is_file().await);
        assert_eq!(file.read().await.unwrap(), b"data");
        assert!(file.mod_time().await.is_ok());
    }

    #[tokio::test]
    async fn read_dir_on_file_lists_siblings() {
        let pth = make_path();
        pth.mkdirs().await.unwrap();
        pth.join("a.txt").write(b"a").await.unwrap();
        pth.join("b").mkdir().await.unwrap();

        let mut names: Vec<String> = pth
            .join("a.txt")
            .read_dir()
            .await
            .unwrap()
            .iter()
            .map(QueuePath::name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn remove_is_recursive_for_directories() {
        let pth = make_path();
        pth.join("x/y").mkdirs().await.unwrap();
        pth.join("x/y/z.json").write(b"{}").await.unwrap();

        pth.join("x").remove().await.unwrap();
        assert!(!pth.join("x").exists().await);
        assert!(pth.exists().await);

        let err = pth.join("x").remove().await.unwrap_err();
        assert!(err.is_not_found());
    }
}
