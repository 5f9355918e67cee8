//! `merge`: merge the patchset content into the target file
//!
//! The strategy is named by the first positional argument or the `strategy`
//! key (`merge,ignore` or `merge,strategy=ignore`) and defaults to `ignore`.
//!
//! ## Strategies
//!
//! - `ignore`: emit every target line, then append the input lines that are
//!   not already present, in input order, each at most once. Duplicates of
//!   existing lines are ignored, which makes the merge idempotent. Lines
//!   compare without their `\n` or `\r\n` ending, and target lines are
//!   copied unchanged.
//!
//! Further strategies can be registered through [`MergeStrategies::register`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::context::Context;
use crate::defaults;
use crate::directive::ProcessorDirective;
use crate::error::{Error, Result};
use crate::filesystem::FileEntry;

use super::Processor;

const NAME: &str = "merge";

/// A line-oriented merge of `input` into `target`
pub trait MergeStrategy: Send + Sync {
    fn merge(&self, target: &str, input: &str) -> String;
}

/// Append input lines missing from the target
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreDuplicates;

impl MergeStrategy for IgnoreDuplicates {
    fn merge(&self, target: &str, input: &str) -> String {
        let eol = if target.contains("\r\n") { "\r\n" } else { "\n" };
        let mut seen: HashSet<&str> = HashSet::new();
        let mut output = String::with_capacity(target.len() + input.len());

        // Target lines are kept byte for byte
        for line in target.split_inclusive('\n') {
            seen.insert(strip_eol(line));
            output.push_str(line);
        }
        if !output.is_empty() && !output.ends_with('\n') {
            output.push_str(eol);
        }

        for line in input.split_inclusive('\n') {
            if seen.insert(strip_eol(line)) {
                output.push_str(line);
                if !line.ends_with('\n') {
                    output.push_str(eol);
                }
            }
        }

        output
    }
}

fn strip_eol(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Merge strategies by name
#[derive(Clone)]
pub struct MergeStrategies {
    strategies: BTreeMap<String, Arc<dyn MergeStrategy>>,
}

impl MergeStrategies {
    /// Register or replace a strategy.
    pub fn register(&mut self, name: impl Into<String>, strategy: impl MergeStrategy + 'static) {
        self.strategies.insert(name.into(), Arc::new(strategy));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn MergeStrategy>> {
        self.strategies.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }
}

impl Default for MergeStrategies {
    fn default() -> Self {
        let mut strategies = Self {
            strategies: BTreeMap::new(),
        };
        strategies.register("ignore", IgnoreDuplicates);
        strategies
    }
}

/// The `merge` processor
#[derive(Clone, Default)]
pub struct Merge {
    strategies: MergeStrategies,
}

impl Merge {
    pub fn new(strategies: MergeStrategies) -> Self {
        Self { strategies }
    }
}

impl Processor for Merge {
    fn transform(
        &self,
        input: FileEntry,
        directive: &ProcessorDirective,
        ctx: &Context<'_>,
    ) -> Result<FileEntry> {
        let name = directive
            .first_positional()
            .or_else(|| directive.get("strategy"))
            .unwrap_or(defaults::MERGE_STRATEGY);
        let strategy = self.strategies.get(name).ok_or_else(|| {
            Error::processor(
                NAME,
                ctx.path(),
                format!(
                    "unknown merge strategy `{}` (known: {})",
                    name,
                    self.strategies.names().join(", ")
                ),
            )
        })?;

        let target = ctx.target_text(NAME)?;
        let text = input
            .text()
            .ok_or_else(|| Error::processor(NAME, ctx.path(), "input is not text"))?;

        let merged = strategy.merge(target, text);
        Ok(FileEntry::with_mode(merged.into_bytes(), input.mode))
    }
}
