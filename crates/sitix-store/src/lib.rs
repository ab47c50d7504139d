//! Abstract source/output stores (spec §6) plus their filesystem-backed
//! implementations. The object graph and render engine depend only on the
//! traits in this crate — `FsSourceStore`/`FsOutputStore` are what
//! `sitix-bin` wires in, grounded in `original_source/src/fileman.cpp`'s
//! `FileMan`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sitix_config::paths;
use sitix_text::ByteWindow;
use sitix_writer::{BufferedSink, Writer};

/// What a path in the source tree turned out to be, mirroring
/// `FileMan::PathState` (minus `Error`/`CNEP`, which collapse to `Missing`
/// here — the Rust store surfaces I/O failures through `Result` instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Missing,
    File,
    Directory,
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("source path {0:?} refused to initialise: {1}")]
    Init(PathBuf, io::Error),
    #[error("i/o error on {0:?}: {1}")]
    Io(PathBuf, io::Error),
}

/// Read-side abstraction over the tree of source files (spec §6).
pub trait SourceStore {
    fn exists(&self, path: &str) -> PathKind;
    /// Open (and cache) the byte window for `path`. Returns `None` if the
    /// path doesn't name a regular file.
    fn open(&mut self, path: &str) -> Option<ByteWindow>;
    fn list_dir(&self, path: &str) -> Vec<String>;
    /// Rewrite an absolute filesystem path to one relative to the store's root.
    fn relativise(&self, abs: &Path) -> String;
    /// Evict a cached window — called when a change event arrives for `path`.
    fn invalidate(&mut self, path: &str);
}

/// Write-side abstraction over the output tree (spec §6).
pub trait OutputStore {
    /// Open a fresh (truncating) writable sink at `rel_path`, creating parent
    /// directories as needed.
    fn create(&mut self, rel_path: &str) -> io::Result<Box<dyn Writer>>;
    /// Remove a previously written output file (watch-mode `Deleted`/
    /// `MovedFrom` handling, spec §4.7). A missing file is not an error.
    fn remove(&mut self, rel_path: &str) -> io::Result<()>;
    /// Implements the `.sitix` marker contract: if the marker is missing,
    /// `confirm` is invoked before the directory is recursively emptied;
    /// returns whether the directory was (re)initialised. Generic, so it
    /// isn't part of the trait's object-safe surface (`Self: Sized`) —
    /// called on the concrete store before it's boxed for the driver.
    fn empty_with_confirmation(&mut self, confirm: impl FnMut() -> bool) -> io::Result<bool>
    where
        Self: Sized;
}

const MARKER_NAME: &str = ".sitix";
const MARKER_NOTICE: &str = "This directory is managed by Sitix. Its contents are regenerated on every build and will be deleted without warning.\n";

/// Filesystem-backed [`SourceStore`], caching opened windows by canonical
/// (root-relative) path. Ground truth: `FileMan::open`'s `maps` cache and
/// `FileMan::checkPath`.
pub struct FsSourceStore {
    root: PathBuf,
    cache: HashMap<String, ByteWindow>,
}

impl FsSourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    fn abs(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl SourceStore for FsSourceStore {
    fn exists(&self, path: &str) -> PathKind {
        match fs::symlink_metadata(self.abs(path)) {
            Ok(meta) if meta.is_dir() => PathKind::Directory,
            Ok(meta) if meta.is_file() => PathKind::File,
            Ok(_) => PathKind::Other,
            Err(_) => PathKind::Missing,
        }
    }

    fn open(&mut self, path: &str) -> Option<ByteWindow> {
        if let Some(w) = self.cache.get(path) {
            return Some(w.clone());
        }
        let bytes = fs::read(self.abs(path)).ok()?;
        let window = ByteWindow::new(bytes);
        self.cache.insert(path.to_string(), window.clone());
        Some(window)
    }

    fn list_dir(&self, path: &str) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(self.abs(path)) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|n| !n.starts_with('.'))
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    fn relativise(&self, abs: &Path) -> String {
        abs.strip_prefix(&self.root)
            .unwrap_or(abs)
            .to_string_lossy()
            .into_owned()
    }

    fn invalidate(&mut self, path: &str) {
        self.cache.remove(path);
    }
}

/// Filesystem-backed [`OutputStore`] rooted at a managed output directory.
/// Ground truth: `FileMan::create`/`FileMan::empty`.
pub struct FsOutputStore {
    root: PathBuf,
}

impl FsOutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn abs(&self, rel_path: &str) -> PathBuf {
        self.root.join(rel_path.trim_start_matches('/'))
    }
}

impl OutputStore for FsOutputStore {
    fn create(&mut self, rel_path: &str) -> io::Result<Box<dyn Writer>> {
        let path = self.abs(rel_path);
        paths::mkdir_recursive(&path)?;
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(Box::new(BufferedSink::new(file)))
    }

    fn remove(&mut self, rel_path: &str) -> io::Result<()> {
        match fs::remove_file(self.abs(rel_path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn empty_with_confirmation(&mut self, mut confirm: impl FnMut() -> bool) -> io::Result<bool> {
        let marker = self.root.join(MARKER_NAME);
        if !marker.exists() && !confirm() {
            return Ok(false);
        }
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)?;
        fs::write(&marker, MARKER_NOTICE)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;

    #[test]
    fn source_store_reports_path_kind() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.html"), b"hi").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let store = FsSourceStore::new(dir.path());
        assert_eq!(store.exists("a.html"), PathKind::File);
        assert_eq!(store.exists("sub"), PathKind::Directory);
        assert_eq!(store.exists("nope"), PathKind::Missing);
    }

    #[test]
    fn source_store_caches_then_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.html");
        fs::write(&file, b"one").unwrap();
        let mut store = FsSourceStore::new(dir.path());
        let first = store.open("a.html").unwrap();
        assert_eq!(first.to_string_lossy_free(), "one");
        fs::write(&file, b"two").unwrap();
        let still_cached = store.open("a.html").unwrap();
        assert_eq!(still_cached.to_string_lossy_free(), "one");
        store.invalidate("a.html");
        let fresh = store.open("a.html").unwrap();
        assert_eq!(fresh.to_string_lossy_free(), "two");
    }

    #[test]
    fn list_dir_skips_dotfiles_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.html"), b"").unwrap();
        fs::write(dir.path().join("a.html"), b"").unwrap();
        fs::write(dir.path().join(".sitix"), b"").unwrap();
        let store = FsSourceStore::new(dir.path());
        assert_eq!(store.list_dir(""), vec!["a.html", "b.html"]);
    }

    #[test]
    fn output_store_remove_deletes_file_and_ignores_missing() {
        let out_root = tempfile::tempdir().unwrap();
        let mut store = FsOutputStore::new(out_root.path());
        {
            let mut sink = store.create("posts/one.html").unwrap();
            sink.write_str("x");
        }
        assert!(out_root.path().join("posts/one.html").exists());
        store.remove("posts/one.html").unwrap();
        assert!(!out_root.path().join("posts/one.html").exists());
        store.remove("posts/one.html").unwrap();
    }

    #[test]
    fn output_store_create_makes_parent_dirs() {
        let out_root = tempfile::tempdir().unwrap();
        let mut store = FsOutputStore::new(out_root.path());
        {
            let mut sink = store.create("posts/one.html").unwrap();
            sink.write_str("rendered");
        }
        let mut contents = String::new();
        fs::File::open(out_root.path().join("posts/one.html"))
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "rendered");
    }

    #[test]
    fn empty_with_confirmation_requires_confirm_when_marker_absent() {
        let out_root = tempfile::tempdir().unwrap();
        fs::write(out_root.path().join("stale.html"), b"old").unwrap();
        let mut store = FsOutputStore::new(out_root.path());
        let declined = store.empty_with_confirmation(|| false).unwrap();
        assert!(!declined);
        assert!(out_root.path().join("stale.html").exists());

        let accepted = store.empty_with_confirmation(|| true).unwrap();
        assert!(accepted);
        assert!(!out_root.path().join("stale.html").exists());
        assert!(out_root.path().join(".sitix").exists());
    }

    #[test]
    fn empty_with_confirmation_skips_prompt_when_marker_present() {
        let out_root = tempfile::tempdir().unwrap();
        fs::create_dir_all(out_root.path()).unwrap();
        fs::write(out_root.path().join(".sitix"), MARKER_NOTICE).unwrap();
        fs::write(out_root.path().join("keep.html"), b"x").unwrap();
        let mut store = FsOutputStore::new(out_root.path());
        let mut asked = false;
        let did = store
            .empty_with_confirmation(|| {
                asked = true;
                false
            })
            .unwrap();
        assert!(did);
        assert!(!asked);
        assert!(!out_root.path().join("keep.html").exists());
    }
}
