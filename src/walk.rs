//! Depth-first discovery of the JavaScript files to migrate.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::ports::filesystem::{DirEntry, EntryKind, FileSystem};

/// Extensions of files eligible for migration.
const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx"];

/// Secondary extensions marking a test file (`foo.test.js`, `foo.spec.jsx`).
const TEST_MARKERS: &[&str] = &["test", "spec"];

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["__tests__", "node_modules", ".git"];

/// Returns `true` if `path` names a migratable, non-test source file.
#[must_use]
pub fn is_eligible_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !SOURCE_EXTENSIONS.contains(&ext) {
        return false;
    }
    let marker = path
        .file_stem()
        .map(Path::new)
        .and_then(|stem| stem.extension())
        .and_then(|e| e.to_str());
    !marker.is_some_and(|m| TEST_MARKERS.contains(&m))
}

/// Returns `true` if the walker should descend into `path`.
#[must_use]
pub fn is_walkable_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |name| !SKIPPED_DIRS.contains(&name))
}

/// Lazy, depth-first iterator over eligible files below a root.
///
/// Pending entries live on an explicit stack, so arbitrarily deep trees never
/// grow the call stack. Children are pushed in reverse so they pop in listing
/// order, which yields the same pre-order as a recursive walk.
pub struct Walk<'a> {
    fs: &'a dyn FileSystem,
    pending: Vec<DirEntry>,
}

impl Walk<'_> {
    fn expand(&mut self, dir: &Path) {
        match self.fs.list_dir(dir) {
            Ok(children) => self.pending.extend(children.into_iter().rev()),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot read directory, skipping");
            }
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        while let Some(entry) = self.pending.pop() {
            match entry.kind {
                EntryKind::Dir if is_walkable_dir(&entry.path) => self.expand(&entry.path),
                EntryKind::File if is_eligible_file(&entry.path) => return Some(entry.path),
                _ => debug!(path = %entry.path.display(), "skipped"),
            }
        }
        None
    }
}

/// Starts a walk at `root`. The root itself is always listed, whatever its name.
#[must_use]
pub fn walk<'a>(fs: &'a dyn FileSystem, root: &Path) -> Walk<'a> {
    let mut walk = Walk {
        fs,
        pending: Vec::new(),
    };
    walk.expand(root);
    walk
}
