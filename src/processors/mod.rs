//! # Processors
//!
//! A processor is one content transformation step in a patchset entry's
//! chain. Every processor implements the same [`Processor`] trait and is
//! looked up by identifier in a [`ProcessorRegistry`], so new processors can
//! be registered without the chain executor knowing anything about them.
//!
//! ## Built-in processors
//!
//! | Identifier | Input | Output |
//! |---|---|---|
//! | `id` | ignored | target content, input mode |
//! | `cocci` | semantic patch script | target after the semantic patch engine ran |
//! | `jinja` | template source | rendered text |
//! | `exec` | script with `#!` line | script stdout, given the target on stdin |
//! | `merge` | lines to merge | target merged with the input per strategy |
//!
//! Custom command processors can also be declared in the configuration
//! file (see [`command`]).
//!
//! ## Chain execution
//!
//! [`ChainRun`] applies an entry's directives right-to-left, starting from
//! the raw patchset file. Any failure stops the chain for that entry only.

use std::collections::BTreeMap;
use std::fmt;
use std::process::Command;
use std::sync::Arc;

use log::debug;

use crate::config::Config;
use crate::context::Context;
use crate::directive::{PatchsetEntry, ProcessorDirective};
use crate::error::{Error, Result};
use crate::filesystem::FileEntry;
use crate::process::{self, Captured, RunError};

pub mod cocci;
pub mod command;
pub mod exec;
pub mod identity;
pub mod jinja;
pub mod merge;

/// A content transformation step.
///
/// `input` is the working content produced by the previous step (or the raw
/// patchset file for the first step). The target file and run-wide settings
/// are reachable through `ctx`. Implementations must not keep mutable state
/// between calls.
pub trait Processor: Send + Sync {
    fn transform(
        &self,
        input: FileEntry,
        directive: &ProcessorDirective,
        ctx: &Context<'_>,
    ) -> Result<FileEntry>;
}

impl<F> Processor for F
where
    F: Fn(FileEntry, &ProcessorDirective, &Context<'_>) -> Result<FileEntry> + Send + Sync,
{
    fn transform(
        &self,
        input: FileEntry,
        directive: &ProcessorDirective,
        ctx: &Context<'_>,
    ) -> Result<FileEntry> {
        self(input, directive, ctx)
    }
}

/// Maps processor identifiers to implementations
#[derive(Clone)]
pub struct ProcessorRegistry {
    processors: BTreeMap<String, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    /// Registry without any processors
    pub fn empty() -> Self {
        Self {
            processors: BTreeMap::new(),
        }
    }

    /// Built-in processors plus the command processors declared in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::default();
        registry.register_commands(config)?;
        Ok(registry)
    }

    /// Add the command processors declared in `config`.
    ///
    /// A declared name that is already registered is a configuration error.
    pub fn register_commands(&mut self, config: &Config) -> Result<()> {
        for (name, spec) in &config.processors {
            if self.contains(name) {
                return Err(Error::Configuration {
                    message: format!("processor `{}` is already defined", name),
                    hint: Some(format!(
                        "registered processors are: {}",
                        self.names().join(", ")
                    )),
                });
            }
            self.register(name, command::CommandProcessor::new(name, spec.clone()));
        }
        Ok(())
    }

    /// Register or replace a processor.
    pub fn register(&mut self, name: impl Into<String>, processor: impl Processor + 'static) {
        self.processors.insert(name.into(), Arc::new(processor));
    }

    /// Look up a processor
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Processor>> {
        self.processors.get(name)
    }

    /// Whether a processor is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.processors.contains_key(name)
    }

    /// Registered identifiers, sorted
    pub fn names(&self) -> Vec<&str> {
        self.processors.keys().map(String::as_str).collect()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("id", identity::Identity);
        registry.register("cocci", cocci::Coccinelle);
        registry.register("jinja", jinja::Jinja);
        registry.register("exec", exec::Exec);
        registry.register("merge", merge::Merge::default());
        registry
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.processors.keys()).finish()
    }
}

/// Lifecycle of one entry's processor chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Not started
    Pending,
    /// Applying the directive at this position in application order
    Running { step: usize },
    /// All directives applied
    Done,
    /// A directive failed; the remaining ones were skipped
    Failed,
}

/// Executes one entry's directives against its context
pub struct ChainRun<'e, 's> {
    entry: &'e PatchsetEntry,
    ctx: Context<'s>,
    state: ChainState,
}

impl<'e, 's> ChainRun<'e, 's> {
    pub fn new(entry: &'e PatchsetEntry, ctx: Context<'s>) -> Self {
        Self {
            entry,
            ctx,
            state: ChainState::Pending,
        }
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Apply every directive, right-to-left.
    pub fn run(&mut self) -> Result<()> {
        let result = self.apply_all();
        self.state = if result.is_ok() {
            ChainState::Done
        } else {
            ChainState::Failed
        };
        result
    }

    fn apply_all(&mut self) -> Result<()> {
        let session = self.ctx.session();
        for (step, directive) in self.entry.application_order().enumerate() {
            self.state = ChainState::Running { step };

            if session.cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    path: self.entry.clean_path.clone(),
                });
            }

            let processor =
                session
                    .processors
                    .get(&directive.name)
                    .ok_or_else(|| Error::DirectiveParse {
                        path: self.entry.clean_path.clone(),
                        message: format!("unknown processor `{}`", directive.name),
                    })?;

            debug!("{}: applying {}", self.entry.clean_path, directive);
            let input = self.ctx.take_current();
            let output = processor.transform(input, directive, &self.ctx)?;
            self.ctx.set_current(output);
        }
        Ok(())
    }

    /// Hand back the context, holding the final content once `run` succeeded.
    pub fn into_context(self) -> Context<'s> {
        self.ctx
    }
}

/// Run an external tool for processor `name` and require a zero exit status.
pub(crate) fn run_tool(
    name: &str,
    ctx: &Context<'_>,
    command: Command,
    stdin: Option<Vec<u8>>,
) -> Result<Captured> {
    let session = ctx.session();
    let captured = process::run(command, stdin, session.config.timeout(), &session.cancel)
        .map_err(|e| match e {
            RunError::Cancelled => Error::Cancelled {
                path: ctx.path().to_string(),
            },
            other => Error::processor(name, ctx.path(), other.to_string()),
        })?;

    if !captured.status.success() {
        let stderr = captured.stderr_text();
        let status = match captured.status.code() {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        let message = if stderr.is_empty() {
            status
        } else {
            format!("{}: {}", status, stderr)
        };
        return Err(Error::processor(name, ctx.path(), message));
    }

    Ok(captured)
}
