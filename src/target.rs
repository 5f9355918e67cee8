//! # Target Tree
//!
//! A read-only view over the unmodified source tree that patches are
//! generated against. The target is opened once per run and then shared by
//! reference across all worker threads; nothing in this module mutates it.
//!
//! Three kinds of target are supported:
//!
//! - a plain directory, read lazily file by file,
//! - a zip archive, unpacked into a [`MemoryFS`] when opened,
//! - a tar archive (optionally gzip-compressed), unpacked the same way.
//!
//! Lookups take clean target paths with `/` separators. A path that does not
//! exist yields `None`, which downstream means "add" semantics.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;

use crate::error::{Error, Result};
use crate::filesystem::{FileEntry, FileMode, MemoryFS};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

/// Read-only view over a target directory or archive
#[derive(Debug)]
pub enum Target {
    /// A directory on disk
    Directory(PathBuf),
    /// An archive unpacked into memory
    Archive(MemoryFS),
}

impl Target {
    /// Open a target, detecting whether it is a directory or an archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| Error::Target {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        if metadata.is_dir() {
            debug!("Using directory target {}", path.display());
            return Ok(Target::Directory(path.to_path_buf()));
        }

        let files = match sniff_archive(path)? {
            ArchiveKind::Zip => read_zip(path)?,
            ArchiveKind::Tar => read_tar(path, false)?,
            ArchiveKind::TarGz => read_tar(path, true)?,
        };
        debug!(
            "Loaded archive target {} ({} files)",
            path.display(),
            files.len()
        );

        Ok(Target::Archive(files))
    }

    /// Build a target from an in-memory filesystem.
    pub fn from_memory(files: MemoryFS) -> Self {
        Target::Archive(files)
    }

    /// Look up a file by clean target path.
    pub fn get(&self, path: &str) -> Result<Option<FileEntry>> {
        match self {
            Target::Directory(root) => {
                let full = root.join(path);
                let metadata = match fs::metadata(&full) {
                    Ok(metadata) => metadata,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(Error::Io(e)),
                };
                if !metadata.is_file() {
                    return Ok(None);
                }
                let content = fs::read(&full)?;
                Ok(Some(FileEntry::with_mode(content, FileMode::from(&metadata))))
            }
            Target::Archive(files) => Ok(files.get_file(path).cloned()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
}

fn sniff_archive(path: &Path) -> Result<ArchiveKind> {
    let mut file = fs::File::open(path)?;
    let mut head = vec![0u8; 512];
    let mut filled = 0;
    while filled < head.len() {
        let n = file.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    head.truncate(filled);

    if head.starts_with(ZIP_MAGIC) || head.starts_with(ZIP_EMPTY_MAGIC) {
        return Ok(ArchiveKind::Zip);
    }
    if head.starts_with(GZIP_MAGIC) {
        return Ok(ArchiveKind::TarGz);
    }
    if head.len() >= TAR_MAGIC_OFFSET + TAR_MAGIC.len()
        && &head[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()] == TAR_MAGIC
    {
        return Ok(ArchiveKind::Tar);
    }

    Err(Error::Target {
        path: path.display().to_string(),
        message: "not a directory, zip or tar archive".to_string(),
    })
}

fn archive_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Target {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Strip `./` and leading `/` from archive member names.
fn member_name(name: &str) -> String {
    let mut name = name.trim_start_matches('/');
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    name.to_string()
}

fn read_zip(path: &Path) -> Result<MemoryFS> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| archive_error(path, e))?;
    let mut files = MemoryFS::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| archive_error(path, e))?;
        if entry.is_dir() {
            continue;
        }
        // Entries created on Unix carry their st_mode in the upper bits
        let mode = entry.unix_mode().map(FileMode).unwrap_or_default();
        let name = member_name(entry.name());
        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content)?;
        files.add_file(name, FileEntry::with_mode(content, mode));
    }

    Ok(files)
}

fn read_tar(path: &Path, gzip: bool) -> Result<MemoryFS> {
    let file = fs::File::open(path)?;
    let reader: Box<dyn Read> = if gzip {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut archive = tar::Archive::new(reader);
    let mut files = MemoryFS::new();

    for entry in archive.entries().map_err(|e| archive_error(path, e))? {
        let mut entry = entry.map_err(|e| archive_error(path, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = member_name(&entry.path()?.to_string_lossy());
        let mode = entry.header().mode().map(FileMode).unwrap_or_default();
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        files.add_file(name, FileEntry::with_mode(content, mode));
    }

    Ok(files)
}
