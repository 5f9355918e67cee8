//! # Patchset Resolver
//!
//! Expands the INPUT glob patterns into concrete patchset files and maps each
//! one to its clean target path.
//!
//! ## Rules
//!
//! - Relative patterns are resolved against the working directory.
//! - Only regular files are kept; a file matched by several patterns is
//!   counted once. Files listed in [`ResolveOptions::exclude`] (the loaded
//!   configuration file) are never inputs.
//! - The clean path is computed relative to the patchset root (the working
//!   directory unless `--root` is given) by stripping the `#`-decoration from
//!   the file name. Directory components are used verbatim.
//! - Two distinct files with the same clean path are a fatal
//!   [`Error::ResolutionConflict`].
//! - The result is ordered by clean path, independent of pattern order and
//!   filesystem enumeration order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use glob::Pattern;
use log::debug;

use crate::error::{Error, Result};
use crate::path::{clean_path, CleanPath};

/// One patchset file mapped onto the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    /// Location of the patchset file on disk
    pub source: PathBuf,
    /// Path of the patchset file relative to the patchset root, as displayed
    pub display: String,
    /// Clean target path and raw decoration
    pub clean: CleanPath,
}

/// Where and how to look for patchset files
#[derive(Debug, Clone)]
pub struct ResolveOptions<'a> {
    /// Directory relative patterns are resolved against
    pub working_dir: &'a Path,
    /// Directory clean paths are computed relative to
    pub root: Option<&'a Path>,
    /// Files never treated as patchset inputs
    pub exclude: &'a [PathBuf],
}

/// Expand `patterns` into resolved inputs, ordered by clean path.
pub fn resolve(patterns: &[String], options: &ResolveOptions<'_>) -> Result<Vec<ResolvedInput>> {
    let root = match options.root {
        Some(root) if root.is_absolute() => root.to_path_buf(),
        Some(root) => options.working_dir.join(root),
        None => options.working_dir.to_path_buf(),
    };

    let excluded: Vec<PathBuf> = options
        .exclude
        .iter()
        .filter_map(|path| path.canonicalize().ok())
        .collect();

    let mut files = BTreeSet::new();
    for pattern in patterns {
        let absolute = absolute_pattern(pattern, options.working_dir);
        debug!("Expanding patchset pattern {}", absolute);
        for entry in glob::glob(&absolute)? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            if path
                .canonicalize()
                .is_ok_and(|canonical| excluded.contains(&canonical))
            {
                debug!("Skipping configuration file {}", path.display());
                continue;
            }
            files.insert(path);
        }
    }

    let mut by_clean_path: BTreeMap<String, ResolvedInput> = BTreeMap::new();
    for source in files {
        let relative = source
            .strip_prefix(&root)
            .map_err(|_| Error::InvalidInput {
                input: source.display().to_string(),
                message: format!("not inside the patchset root {}", root.display()),
            })?
            .to_path_buf();
        let clean = clean_path(&relative)?;
        let display = relative.to_string_lossy().replace('\\', "/");

        if let Some(existing) = by_clean_path.get(&clean.path) {
            return Err(Error::ResolutionConflict {
                path: clean.path,
                first: existing.display.clone(),
                second: display,
            });
        }

        debug!("Resolved {} -> {}", display, clean.path);
        by_clean_path.insert(
            clean.path.clone(),
            ResolvedInput {
                source,
                display,
                clean,
            },
        );
    }

    Ok(by_clean_path.into_values().collect())
}

/// The default pattern used when only a patchset root is given.
pub fn root_pattern(root: &Path) -> String {
    format!("{}/**/*", Pattern::escape(&root.to_string_lossy()))
}

fn absolute_pattern(pattern: &str, working_dir: &Path) -> String {
    if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        format!(
            "{}/{}",
            Pattern::escape(&working_dir.to_string_lossy()),
            pattern.trim_start_matches("./")
        )
    }
}
