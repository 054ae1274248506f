//! File system access for resolution and loading.
//!
//! The resolver and graph builder only ever see files through the
//! [`FileSystem`] trait. Production builds use [`OsFileSystem`]; tests and
//! embedders that already hold sources in memory use [`MemoryFileSystem`].
//!
//! Paths are normalized lexically (no symlink resolution) so the same file
//! reached through `./a/../b.js` and `./b.js` gets one module identity.

use rustc_hash::{FxHashMap, FxHashSet};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Read-only view of a file tree.
pub trait FileSystem: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;
}

/// The real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// An in-memory file tree. Directories exist implicitly for every ancestor
/// of an inserted file.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: FxHashMap<PathBuf, Vec<u8>>,
    dirs: FxHashSet<PathBuf>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        MemoryFileSystem::default()
    }

    /// Insert or replace a file.
    pub fn insert(&mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = normalize_path(path.as_ref());
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if !self.dirs.insert(dir.to_path_buf()) {
                break;
            }
            parent = dir.parent();
        }
        self.files.insert(path, contents.into());
    }

    /// Builder-style variant of [`MemoryFileSystem::insert`].
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(&normalize_path(path))
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Leading `..` on a relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Render a path with forward slashes relative to `base` when possible.
/// Used for display names in diagnostics, chunk keys and the metafile.
pub fn relative_display(path: &Path, base: &Path) -> String {
    let rel = match path.strip_prefix(base) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => relative_path(base, path).unwrap_or_else(|| path.to_path_buf()),
    };
    let text = rel.to_string_lossy().replace('\\', "/");
    if text.is_empty() { ".".to_string() } else { text }
}

/// Compute `to` relative to the directory `from`, both absolute.
pub fn relative_path(from: &Path, to: &Path) -> Option<PathBuf> {
    if from.is_absolute() != to.is_absolute() {
        return None;
    }
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for component in &to[common..] {
        rel.push(component.as_os_str());
    }
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_folds_dots() {
        assert_eq!(
            normalize_path(Path::new("/a/./b/../c.js")),
            PathBuf::from("/a/c.js")
        );
        assert_eq!(normalize_path(Path::new("../x/./y")), PathBuf::from("../x/y"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_memory_fs_implicit_dirs() {
        let fs = MemoryFileSystem::new().with_file("/proj/src/a.js", "x");
        assert!(fs.is_file(Path::new("/proj/src/a.js")));
        assert!(fs.is_dir(Path::new("/proj/src")));
        assert!(fs.is_dir(Path::new("/proj")));
        assert!(!fs.is_file(Path::new("/proj/src")));
        assert_eq!(fs.read_to_string(Path::new("/proj/src/../src/a.js")).unwrap(), "x");
    }

    #[test]
    fn test_memory_fs_missing_file_is_not_found() {
        let fs = MemoryFileSystem::new();
        let err = fs.read(Path::new("/nope.js")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_relative_display() {
        assert_eq!(
            relative_display(Path::new("/proj/src/a.js"), Path::new("/proj")),
            "src/a.js"
        );
        assert_eq!(
            relative_display(Path::new("/other/a.js"), Path::new("/proj")),
            "../other/a.js"
        );
    }
}
