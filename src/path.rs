//! Path manipulation utilities for patchtree
//!
//! Patchset files mirror the target tree: every directory component is used
//! verbatim and only the file name may carry a `#`-decoration. The helpers
//! here turn an on-disk patchset path into the clean, `/`-separated,
//! target-relative path used for target lookup and diff headers.

use std::path::{Component, Path};

use crate::error::{Error, Result};

/// Separator between the base name and each processor directive.
pub const DIRECTIVE_DELIMITER: char = '#';

/// Split a file name into its clean base name and the decoration after the
/// first `#` (without that `#`).
///
/// ```
/// use patchtree::path::split_decoration;
///
/// assert_eq!(split_decoration("foo.c#jinja#cocci"), ("foo.c", Some("jinja#cocci")));
/// assert_eq!(split_decoration("foo.c"), ("foo.c", None));
/// ```
pub fn split_decoration(file_name: &str) -> (&str, Option<&str>) {
    match file_name.split_once(DIRECTIVE_DELIMITER) {
        Some((base, rest)) => (base, Some(rest)),
        None => (file_name, None),
    }
}

/// A patchset path split into its clean target path and raw decoration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPath {
    /// Target-relative path with `/` separators and no decoration
    pub path: String,
    /// Everything after the first `#` of the file name, if any
    pub decoration: Option<String>,
}

/// Compute the clean target path for a patchset file given relative to the
/// patchset root.
///
/// Directory components are kept untouched. The path must be relative and
/// must not climb out of the root.
pub fn clean_path(relative: &Path) -> Result<CleanPath> {
    let invalid = |message: &str| Error::InvalidInput {
        input: relative.display().to_string(),
        message: message.to_string(),
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| invalid("path is not valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(invalid("path escapes the patchset root"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("path is not relative to the patchset root"));
            }
        }
    }

    let file_name = parts.pop().ok_or_else(|| invalid("empty path"))?;
    let (base, decoration) = split_decoration(file_name);
    if base.is_empty() {
        return Err(invalid("file name is empty once decorations are removed"));
    }

    parts.push(base);
    Ok(CleanPath {
        path: parts.join("/"),
        decoration: decoration.map(str::to_string),
    })
}

/// Extension used to select a diff strategy.
///
/// This is the suffix of the file name starting at its first `.`, ignoring a
/// leading dot, so `foo.tar.gz` yields `.tar.gz` and `.gitignore` yields
/// nothing.
pub fn extension(clean_path: &str) -> Option<&str> {
    let name = clean_path.rsplit('/').next().unwrap_or(clean_path);
    let idx = name
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '.')
        .map(|(i, _)| i)?;
    Some(&name[idx..])
}
