//! # Configuration
//!
//! This module defines the structured configuration object read at startup
//! and the logic for loading it from a `.patchtree.yaml` file. The format is
//! purely declarative: every option is an explicit field, and custom
//! processors are described as commands to run rather than code to execute.
//!
//! ## Example
//!
//! ```yaml
//! diff_context: 3
//! output_shebang: true
//! on_error: continue
//! timeout_secs: 30
//! template_vars:
//!   version: "1.2.0"
//! diff_strategies:
//!   .png: binary
//! processors:
//!   fmt:
//!     command: [clang-format, --style=file]
//! ```
//!
//! ## Lookup
//!
//! [`load`] uses the first of: the explicitly given path (`--config` or
//! `PATCHTREE_CONFIG`), `./.patchtree.yaml`, the user configuration file
//! (see [`crate::defaults::user_config_path`]). Without any file the
//! defaults apply. An explicitly given path that does not exist is an error.
//!
//! Every field is optional and unknown fields are rejected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::context::TemplateVarMap;
use crate::defaults;
use crate::directive::is_identifier;
use crate::error::{Error, Result};

/// What to do when a single entry fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Abort the run on the first failed entry and emit no patch
    #[default]
    Halt,
    /// Skip failed entries, emit the rest, exit non-zero
    Continue,
}

/// Which content a command processor receives on stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandInput {
    /// The working content produced by the previous directive
    #[default]
    Current,
    /// The target file's content
    Target,
}

/// A processor implemented by an external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandProcessorConfig {
    /// Program and arguments. Directive positional arguments are appended.
    pub command: Vec<String>,
    /// Content piped to the command's stdin
    #[serde(default)]
    pub input: CommandInput,
}

/// Structured configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Context lines in unified diffs
    pub diff_context: usize,
    /// Emit a `git apply` shebang line
    pub output_shebang: bool,
    /// Emit the `patchtree output (version X)` line
    pub output_header: bool,
    /// Extra header line, e.g. a license notice
    pub license: Option<String>,
    /// Failure policy for per-entry errors
    pub on_error: ErrorPolicy,
    /// External tool timeout in seconds; 0 disables the timeout
    pub timeout_secs: u64,
    /// Worker thread count; `None` lets rayon decide
    pub jobs: Option<usize>,
    /// Semantic patch engine executable
    pub cocci_binary: String,
    /// Variables for the default template variable provider
    pub template_vars: TemplateVarMap,
    /// Strategy used when no extension matches
    pub default_diff: String,
    /// Extension (with leading `.`) to diff strategy name
    pub diff_strategies: BTreeMap<String, String>,
    /// Additional command processors by identifier
    pub processors: BTreeMap<String, CommandProcessorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            diff_context: defaults::DIFF_CONTEXT,
            output_shebang: false,
            output_header: true,
            license: None,
            on_error: ErrorPolicy::Halt,
            timeout_secs: defaults::TIMEOUT_SECS,
            jobs: None,
            cocci_binary: defaults::COCCI_BINARY.to_string(),
            template_vars: TemplateVarMap::new(),
            default_diff: defaults::DIFF_STRATEGY.to_string(),
            diff_strategies: BTreeMap::new(),
            processors: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Timeout for a single external tool invocation
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Check structural constraints that serde cannot express.
    ///
    /// Strategy and processor names are checked against the registries when
    /// the session is built.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == Some(0) {
            return Err(Error::Configuration {
                message: "jobs must be at least 1".to_string(),
                hint: Some("omit `jobs` to use one worker per CPU".to_string()),
            });
        }

        for extension in self.diff_strategies.keys() {
            if !extension.starts_with('.') || extension.len() < 2 {
                return Err(Error::Configuration {
                    message: format!("invalid extension `{}` in diff_strategies", extension),
                    hint: Some(format!("write it with a leading dot, e.g. `.{}`", extension.trim_start_matches('.'))),
                });
            }
        }

        for (name, processor) in &self.processors {
            if !is_identifier(name) {
                return Err(Error::Configuration {
                    message: format!("invalid processor name `{}`", name),
                    hint: Some("names may not contain `#`, `,`, `=` or whitespace".to_string()),
                });
            }
            if processor.command.is_empty() || processor.command[0].trim().is_empty() {
                return Err(Error::config(format!(
                    "processor `{}` has an empty command",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Parse a YAML string into a validated `Config`.
///
/// An empty document yields the defaults.
pub fn parse(yaml_content: &str) -> Result<Config> {
    if yaml_content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(yaml_content).map_err(|e| Error::Configuration {
        message: e.to_string(),
        hint: None,
    })?;
    config.validate()?;
    Ok(config)
}

/// Parse a `Config` from a YAML file path
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::Configuration {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}

/// Locate and load the configuration.
///
/// Returns the configuration and the file it came from, if any.
pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Configuration {
                message: format!("configuration file not found: {}", path.display()),
                hint: Some(format!(
                    "create it, or drop --config to use {}",
                    defaults::CONFIG_FILE_NAME
                )),
            });
        }
        return Ok((from_file(path)?, Some(path.to_path_buf())));
    }

    let candidates = std::iter::once(working_dir.join(defaults::CONFIG_FILE_NAME))
        .chain(defaults::user_config_path());
    for candidate in candidates {
        if candidate.is_file() {
            debug!("Loading configuration from {}", candidate.display());
            return Ok((from_file(&candidate)?, Some(candidate)));
        }
    }

    debug!("No configuration file found, using defaults");
    Ok((Config::default(), None))
}
