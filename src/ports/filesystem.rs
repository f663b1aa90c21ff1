//! Filesystem port for file I/O operations.

use std::path::{Path, PathBuf};

/// Boxed error type returned by [`FileSystem`] operations.
pub type FsError = Box<dyn std::error::Error + Send + Sync>;

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Dir,
    /// Anything else (symlink, socket, ...). Never descended into.
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full path of the entry.
    pub path: PathBuf,
    /// What the entry is.
    pub kind: EntryKind,
}

/// Provides filesystem access for reading, writing and removing files.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Writes the given contents to a file, creating or overwriting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Returns `true` if any entry, even a dangling link, occupies `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Lists the entries of a directory in the order the platform returns them.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError>;
}
