use super::{FileSystem, FsError};
use crate::paths;
use async_trait::async_trait;
use rustc_hash::FxHashMap as HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Link hops before giving up, matching the usual `ELOOP` limit.
const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
enum Entry {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
    Failing(io::ErrorKind),
}

/// In-memory filesystem for hosts and tests.
///
/// Paths are used verbatim as keys (no normalization). Symlinks in parent
/// components are followed when reading; [`MemoryFileSystem::operations`]
/// counts every call made through [`FileSystem`].
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    entries: Mutex<HashMap<PathBuf, Entry>>,
    operations: AtomicUsize,
}

impl MemoryFileSystem {
    /// Create an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with the given contents.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, contents);
        self
    }

    /// Add a directory.
    #[must_use]
    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.insert(path.into(), Entry::Dir);
        self
    }

    /// Add a symbolic link storing `target` verbatim.
    #[must_use]
    pub fn with_symlink(self, link: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.insert(link.into(), Entry::Symlink(target.into()));
        self
    }

    /// Make every operation on `path` fail with `kind`.
    #[must_use]
    pub fn with_failure(self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.insert(path.into(), Entry::Failing(kind));
        self
    }

    /// Add or replace a file after construction.
    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.insert(path.into(), Entry::File(contents.into()));
    }

    /// Number of [`FileSystem`] calls served so far.
    #[must_use]
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::Relaxed)
    }

    fn insert(&self, path: PathBuf, entry: Entry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, entry);
    }

    fn get(&self, path: &Path) -> Option<Entry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Rewrite `path` until no ancestor (or, with `follow_last`, the path
    /// itself) is a symlink.
    fn follow(&self, path: &Path, follow_last: bool) -> Result<PathBuf, FsError> {
        let mut current = path.to_path_buf();

        'hops: for _ in 0..MAX_LINK_HOPS {
            let candidates: Vec<PathBuf> = current
                .ancestors()
                .skip(usize::from(!follow_last))
                .map(Path::to_path_buf)
                .collect();

            // Outermost link first, so earlier components resolve before later ones.
            for ancestor in candidates.iter().rev() {
                if let Some(Entry::Symlink(target)) = self.get(ancestor) {
                    let parent = ancestor.parent().unwrap_or(Path::new("/"));
                    let rest = current.strip_prefix(ancestor).unwrap_or(Path::new(""));
                    let resolved = paths::join(parent, target);
                    current = if rest.as_os_str().is_empty() {
                        resolved
                    } else {
                        resolved.join(rest)
                    };
                    continue 'hops;
                }
            }

            return Ok(current);
        }

        Err(FsError::io(
            path,
            io::Error::other("too many levels of symbolic links"),
        ))
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        self.operations.fetch_add(1, Ordering::Relaxed);
        let resolved = self.follow(path, false)?;

        match self.get(&resolved) {
            Some(Entry::Symlink(target)) => Ok(target),
            Some(Entry::File(_) | Entry::Dir) => Err(FsError::NotALink(path.to_path_buf())),
            Some(Entry::Failing(kind)) => Err(FsError::io(path, io::Error::from(kind))),
            None => Err(FsError::NotFound(path.to_path_buf())),
        }
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.operations.fetch_add(1, Ordering::Relaxed);
        let resolved = self.follow(path, true)?;

        match self.get(&resolved) {
            Some(Entry::File(contents)) => Ok(contents),
            Some(Entry::Dir) => Err(FsError::io(
                path,
                io::Error::other("is a directory"),
            )),
            Some(Entry::Failing(kind)) => Err(FsError::io(path, io::Error::from(kind))),
            Some(Entry::Symlink(_)) | None => Err(FsError::NotFound(path.to_path_buf())),
        }
    }
}
