//! In-memory file representation shared by targets, processors and diffs

use std::collections::BTreeMap;
use std::fmt;

/// Git-style file mode.
///
/// Only the permission bits matter for patch output; they are collapsed to
/// git's two regular-file modes by [`FileMode::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Regular, non-executable file.
    pub const REGULAR: FileMode = FileMode(0o100644);
    /// Regular, executable file.
    pub const EXECUTABLE: FileMode = FileMode(0o100755);

    /// Whether any execute bit is set.
    pub fn is_executable(self) -> bool {
        self.0 & 0o111 != 0
    }

    /// Collapse to `100644` or `100755`.
    pub fn normalized(self) -> FileMode {
        if self.is_executable() {
            FileMode::EXECUTABLE
        } else {
            FileMode::REGULAR
        }
    }
}

impl Default for FileMode {
    fn default() -> Self {
        FileMode::REGULAR
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.normalized().0)
    }
}

#[cfg(unix)]
impl From<&std::fs::Metadata> for FileMode {
    fn from(metadata: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::PermissionsExt;
        FileMode(metadata.permissions().mode())
    }
}

#[cfg(not(unix))]
impl From<&std::fs::Metadata> for FileMode {
    fn from(_metadata: &std::fs::Metadata) -> Self {
        FileMode::REGULAR
    }
}

/// File content plus mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileEntry {
    /// File content as bytes
    pub content: Vec<u8>,
    /// File mode
    pub mode: FileMode,
}

impl FileEntry {
    /// Create a regular file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            mode: FileMode::REGULAR,
        }
    }

    /// Create a file with content and an explicit mode
    pub fn with_mode(content: Vec<u8>, mode: FileMode) -> Self {
        Self { content, mode }
    }

    /// Create a regular file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Whether the content looks binary: it contains a NUL byte or is not UTF-8.
    pub fn is_binary(&self) -> bool {
        self.text().is_none()
    }

    /// Content as text, if it decodes cleanly.
    pub fn text(&self) -> Option<&str> {
        if self.content.contains(&0) {
            return None;
        }
        std::str::from_utf8(&self.content).ok()
    }
}

/// In-memory filesystem keyed by target-relative path.
///
/// Archive targets are unpacked into one of these, and tests use it to build
/// targets without touching the disk. Keys use `/` separators.
#[derive(Debug, Clone, Default)]
pub struct MemoryFS {
    files: BTreeMap<String, FileEntry>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn add_file(&mut self, path: impl Into<String>, file: FileEntry) {
        self.files.insert(path.into(), file);
    }

    /// Add a regular file with string content
    pub fn add_file_string(&mut self, path: impl Into<String>, content: &str) {
        self.add_file(path, FileEntry::from_string(content));
    }

    /// Get a file by path
    pub fn get_file(&self, path: &str) -> Option<&FileEntry> {
        self.files.get(path)
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all files in path order
    pub fn files(&self) -> impl Iterator<Item = (&String, &FileEntry)> {
        self.files.iter()
    }
}
