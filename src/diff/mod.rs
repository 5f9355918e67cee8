//! # Diff engines
//!
//! A [`DiffEngine`] turns the target file and an entry's final content into
//! one git-style file section. The [`DiffRegistry`] picks the engine for a
//! clean path by its extension (see [`crate::path::extension`]), falling back
//! to the configured default strategy.
//!
//! ## Built-in strategies
//!
//! - `unified`: line-based unified diff; binary content is a diff error
//! - `binary`: like `unified`, but binary content is written as a
//!   `Binary files ... differ` replacement marker
//!
//! Every engine must be a pure function of its arguments so repeated runs
//! on the same inputs produce identical output.

use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filesystem::{FileEntry, FileMode};
use crate::path;

pub mod unified;

pub use unified::{BinaryPolicy, Unified};

/// One file's section of the patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    /// Clean target path
    pub path: String,
    /// Section text, empty when content and mode are unchanged
    pub text: String,
}

impl DiffResult {
    pub fn unchanged(path: &str) -> Self {
        Self {
            path: path.to_string(),
            text: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Computes the patch section for one file.
///
/// `old` is the target file, or `None` when the entry creates it.
pub trait DiffEngine: Send + Sync {
    fn diff(
        &self,
        path: &str,
        old: Option<&FileEntry>,
        new: &FileEntry,
        context: usize,
    ) -> Result<DiffResult>;
}

/// Writes the `diff --git` line and the mode lines of a file section.
///
/// Returns the text with a trailing newline. Modes are compared after
/// normalisation, so `100664` and `100644` are the same mode.
pub fn git_header(path: &str, old_mode: Option<FileMode>, new_mode: FileMode) -> String {
    let mut header = String::new();
    // Writing to a String cannot fail
    let _ = write_git_header(&mut header, path, old_mode, new_mode);
    header
}

fn write_git_header(
    out: &mut String,
    path: &str,
    old_mode: Option<FileMode>,
    new_mode: FileMode,
) -> fmt::Result {
    writeln!(out, "diff --git a/{} b/{}", path, path)?;
    match old_mode {
        None => writeln!(out, "new file mode {}", new_mode)?,
        Some(old) if old.normalized() != new_mode.normalized() => {
            writeln!(out, "old mode {}", old)?;
            writeln!(out, "new mode {}", new_mode)?;
        }
        Some(_) => {}
    }
    Ok(())
}

/// Diff strategies by name, and the extension mapping used to pick one
#[derive(Clone)]
pub struct DiffRegistry {
    engines: BTreeMap<String, Arc<dyn DiffEngine>>,
    extensions: BTreeMap<String, String>,
    default: String,
}

impl DiffRegistry {
    /// Built-in strategies with the extension mapping and default from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::default();
        registry.configure(config)?;
        Ok(registry)
    }

    /// Apply the default strategy and extension mapping from `config`.
    pub fn configure(&mut self, config: &Config) -> Result<()> {
        self.set_default(&config.default_diff)?;
        for (extension, strategy) in &config.diff_strategies {
            self.map_extension(extension, strategy)?;
        }
        Ok(())
    }

    /// Register or replace a strategy.
    pub fn register(&mut self, name: impl Into<String>, engine: impl DiffEngine + 'static) {
        self.engines.insert(name.into(), Arc::new(engine));
    }

    /// Use strategy `name` for clean paths with this exact extension.
    pub fn map_extension(&mut self, extension: &str, name: &str) -> Result<()> {
        self.check_known(name)?;
        self.extensions
            .insert(extension.to_string(), name.to_string());
        Ok(())
    }

    /// Use strategy `name` when no extension matches.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        self.check_known(name)?;
        self.default = name.to_string();
        Ok(())
    }

    /// Registered strategy names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }

    /// Name of the strategy used for `clean_path`
    pub fn strategy_for(&self, clean_path: &str) -> &str {
        path::extension(clean_path)
            .and_then(|ext| self.extensions.get(ext))
            .unwrap_or(&self.default)
    }

    /// Engine used for `clean_path`
    pub fn select(&self, clean_path: &str) -> Result<&Arc<dyn DiffEngine>> {
        let name = self.strategy_for(clean_path);
        self.engines.get(name).ok_or_else(|| Error::Diff {
            path: clean_path.to_string(),
            message: format!("diff strategy `{}` is not registered", name),
        })
    }

    fn check_known(&self, name: &str) -> Result<()> {
        if self.engines.contains_key(name) {
            return Ok(());
        }
        Err(Error::Configuration {
            message: format!("unknown diff strategy `{}`", name),
            hint: Some(format!("available strategies: {}", self.names().join(", "))),
        })
    }
}

impl Default for DiffRegistry {
    fn default() -> Self {
        let mut registry = Self {
            engines: BTreeMap::new(),
            extensions: BTreeMap::new(),
            default: crate::defaults::DIFF_STRATEGY.to_string(),
        };
        registry.register("unified", Unified::new(BinaryPolicy::Reject));
        registry.register("binary", Unified::new(BinaryPolicy::Marker));
        registry
    }
}

impl fmt::Debug for DiffRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffRegistry")
            .field("engines", &self.names())
            .field("extensions", &self.extensions)
            .field("default", &self.default)
            .finish()
    }
}
