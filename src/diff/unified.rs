//! Line-based unified diff in git's patch format

use similar::TextDiff;

use crate::error::{Error, Result};
use crate::filesystem::FileEntry;

use super::{git_header, DiffEngine, DiffResult};

/// What to do when either side is binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryPolicy {
    /// Fail with a diff error
    Reject,
    /// Write a `Binary files ... differ` marker
    Marker,
}

/// Unified diff engine
#[derive(Debug, Clone, Copy)]
pub struct Unified {
    binary: BinaryPolicy,
}

impl Unified {
    pub fn new(binary: BinaryPolicy) -> Self {
        Self { binary }
    }
}

impl DiffEngine for Unified {
    fn diff(
        &self,
        path: &str,
        old: Option<&FileEntry>,
        new: &FileEntry,
        context: usize,
    ) -> Result<DiffResult> {
        let content_changed = old.is_none_or(|old| old.content != new.content);
        let mode_changed = old.is_some_and(|old| old.mode.normalized() != new.mode.normalized());
        if !content_changed && !mode_changed {
            return Ok(DiffResult::unchanged(path));
        }

        let mut text = git_header(path, old.map(|old| old.mode), new.mode);
        if content_changed && !(old.is_none() && new.content.is_empty()) {
            let old_label = match old {
                Some(_) => format!("a/{}", path),
                None => "/dev/null".to_string(),
            };
            let new_label = format!("b/{}", path);

            let old_text = match old {
                Some(old) => old.text(),
                None => Some(""),
            };
            match (old_text, new.text()) {
                (Some(old_text), Some(new_text)) => {
                    let diff = TextDiff::from_lines(old_text, new_text);
                    let body = diff
                        .unified_diff()
                        .context_radius(context)
                        .header(&old_label, &new_label)
                        .to_string();
                    text.push_str(&body);
                }
                _ => match self.binary {
                    BinaryPolicy::Marker => {
                        text.push_str(&format!(
                            "Binary files {} and {} differ\n",
                            old_label, new_label
                        ));
                    }
                    BinaryPolicy::Reject => {
                        return Err(Error::Diff {
                            path: path.to_string(),
                            message: "binary content cannot be written as a unified diff"
                                .to_string(),
                        });
                    }
                },
            }
        }

        Ok(DiffResult {
            path: path.to_string(),
            text,
        })
    }
}
