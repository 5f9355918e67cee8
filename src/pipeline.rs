//! # Run orchestration
//!
//! A run goes through four stages:
//!
//! 1. **Resolve** the INPUT patterns into patchset files (fatal on conflict)
//! 2. **Parse** every file name into a [`PatchsetEntry`]. All entries are
//!    parsed before anything runs, so an unknown processor is reported
//!    before any external tool is spawned.
//! 3. **Execute** each entry's processor chain and diff it against the
//!    target. Entries are independent and run in parallel on a rayon pool,
//!    each with its own [`Context`].
//! 4. **Assemble** the sections into a [`Patch`] in clean-path order.
//!
//! Per-entry failures are collected as [`EntryFailure`]s. Under the halt
//! policy the first failure trips the session's cancel token, which kills
//! in-flight subprocesses and stops the remaining chains; the caller must
//! then discard the patch. Under the continue policy the patch holds every
//! entry that succeeded.

use std::fs;
use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::{Config, ErrorPolicy};
use crate::context::{default_template_vars, CancelToken, Context, Session, TemplateVars};
use crate::diff::{DiffEngine, DiffRegistry, DiffResult};
use crate::directive::{parse_entry, PatchsetEntry};
use crate::error::{Error, Result};
use crate::exit_codes;
use crate::filesystem::{FileEntry, FileMode};
use crate::patch::{Patch, PatchHeader};
use crate::processors::merge::{Merge, MergeStrategies};
use crate::processors::{ChainRun, Processor, ProcessorRegistry};
use crate::resolve::{resolve, ResolveOptions, ResolvedInput};
use crate::target::Target;

/// A failed entry
#[derive(Debug)]
pub struct EntryFailure {
    /// Clean target path of the entry
    pub path: String,
    pub error: Error,
}

/// Outcome of a run
#[derive(Debug)]
pub struct RunReport {
    /// Sections of every entry that succeeded
    pub patch: Patch,
    /// Failed entries in clean-path order, without entries that were only
    /// cancelled because another one failed
    pub failures: Vec<EntryFailure>,
    /// Number of resolved entries
    pub entries: usize,
    pub policy: ErrorPolicy,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether the patch may be written
    pub fn should_emit(&self) -> bool {
        self.entries > 0 && (self.is_success() || self.policy == ErrorPolicy::Continue)
    }

    /// Exit code of the first failure, or success
    pub fn exit_code(&self) -> i32 {
        self.failures
            .first()
            .map(|failure| failure.error.exit_code())
            .unwrap_or(exit_codes::SUCCESS)
    }
}

/// Builds a [`Pipeline`] with programmatically registered extensions.
///
/// Registrations happen before the configuration is applied, so
/// `diff_strategies` may name a strategy registered here.
pub struct PipelineBuilder {
    config: Config,
    processors: ProcessorRegistry,
    diffs: DiffRegistry,
    template_vars: Option<Arc<dyn TemplateVars>>,
}

impl PipelineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            processors: ProcessorRegistry::default(),
            diffs: DiffRegistry::default(),
            template_vars: None,
        }
    }

    /// Add or replace a processor.
    pub fn processor(mut self, name: impl Into<String>, processor: impl Processor + 'static) -> Self {
        self.processors.register(name, processor);
        self
    }

    /// Add or replace a diff strategy.
    pub fn diff_strategy(mut self, name: impl Into<String>, engine: impl DiffEngine + 'static) -> Self {
        self.diffs.register(name, engine);
        self
    }

    /// Replace the strategies available to the `merge` processor.
    pub fn merge_strategies(mut self, strategies: MergeStrategies) -> Self {
        self.processors.register("merge", Merge::new(strategies));
        self
    }

    /// Replace the template variable provider of the `jinja` processor.
    pub fn template_vars(mut self, provider: impl TemplateVars + 'static) -> Self {
        self.template_vars = Some(Arc::new(provider));
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let Self {
            config,
            mut processors,
            mut diffs,
            template_vars,
        } = self;

        config.validate()?;
        processors.register_commands(&config)?;
        diffs.configure(&config)?;
        let template_vars = template_vars.unwrap_or_else(|| default_template_vars(&config));

        Ok(Pipeline {
            session: Session::from_parts(config, processors, diffs, template_vars),
        })
    }
}

/// A configured run
pub struct Pipeline {
    session: Session,
}

impl Pipeline {
    /// Pipeline with the built-in processors and diff strategies.
    pub fn new(config: Config) -> Result<Self> {
        PipelineBuilder::new(config).build()
    }

    pub fn builder(config: Config) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Token that aborts the run, including in-flight subprocesses.
    pub fn cancel_token(&self) -> CancelToken {
        self.session.cancel.clone()
    }

    /// Resolve, parse, execute and assemble.
    ///
    /// Resolution and configuration errors are returned as `Err`; per-entry
    /// errors end up in the report.
    pub fn run(
        &self,
        target: &Target,
        patterns: &[String],
        options: &ResolveOptions<'_>,
    ) -> Result<RunReport> {
        let inputs = resolve(patterns, options)?;
        if inputs.is_empty() {
            debug!("No patchset files matched {:?}", patterns);
        }
        self.run_inputs(target, &inputs)
    }

    /// Parse, execute and assemble already resolved inputs.
    pub fn run_inputs(&self, target: &Target, inputs: &[ResolvedInput]) -> Result<RunReport> {
        let config = &self.session.config;
        let mut failures = Vec::new();

        let mut entries = Vec::with_capacity(inputs.len());
        for input in inputs {
            match parse_entry(input, &self.session.processors) {
                Ok(entry) => entries.push(entry),
                Err(error) => failures.push(EntryFailure {
                    path: input.clean.path.clone(),
                    error,
                }),
            }
        }

        let mut patch = Patch::new(PatchHeader::from_config(config));
        if failures.is_empty() || config.on_error == ErrorPolicy::Continue {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.jobs.unwrap_or(0))
                .build()
                .map_err(|e| Error::config(format!("cannot start worker pool: {}", e)))?;

            let outcomes: Vec<(String, Result<DiffResult>)> = pool.install(|| {
                entries
                    .par_iter()
                    .map(|entry| {
                        let outcome = self.process_entry(target, entry);
                        if outcome.is_err() && config.on_error == ErrorPolicy::Halt {
                            self.session.cancel.cancel();
                        }
                        (entry.clean_path.clone(), outcome)
                    })
                    .collect()
            });

            for (path, outcome) in outcomes {
                match outcome {
                    Ok(section) => patch.push(section),
                    Err(error) => failures.push(EntryFailure { path, error }),
                }
            }
        }

        let failures = settle_failures(failures);
        for failure in &failures {
            match config.on_error {
                ErrorPolicy::Continue => warn!("skipping {}: {}", failure.path, failure.error),
                ErrorPolicy::Halt => debug!("{} failed: {}", failure.path, failure.error),
            }
        }
        info!(
            "{} entries, {} file sections, {} failed",
            inputs.len(),
            patch.len(),
            failures.len()
        );

        Ok(RunReport {
            patch,
            failures,
            entries: inputs.len(),
            policy: config.on_error,
        })
    }

    /// Run one entry's chain and diff the result against the target.
    pub fn process_entry(&self, target: &Target, entry: &PatchsetEntry) -> Result<DiffResult> {
        let session = &self.session;
        if session.cancel.is_cancelled() {
            return Err(Error::Cancelled {
                path: entry.clean_path.clone(),
            });
        }

        let input = read_patchset_file(entry)?;
        let original = target.get(&entry.clean_path)?;
        debug!(
            "{}: {} ({})",
            entry.clean_path,
            entry.raw,
            if original.is_some() { "modify" } else { "add" }
        );

        let ctx = Context::new(session, entry.clean_path.as_str(), original, input);
        let mut chain = ChainRun::new(entry, ctx);
        chain.run()?;
        let (current, original) = chain.into_context().finish();

        session.diffs.select(&entry.clean_path)?.diff(
            &entry.clean_path,
            original.as_ref(),
            &current,
            session.config.diff_context,
        )
    }
}

fn read_patchset_file(entry: &PatchsetEntry) -> Result<FileEntry> {
    let metadata = fs::metadata(&entry.source)?;
    let content = fs::read(&entry.source)?;
    Ok(FileEntry::with_mode(content, FileMode::from(&metadata)))
}

/// Sort by clean path and drop cancellations caused by another failure.
fn settle_failures(mut failures: Vec<EntryFailure>) -> Vec<EntryFailure> {
    failures.sort_by(|a, b| a.path.cmp(&b.path));
    if failures
        .iter()
        .any(|f| !matches!(f.error, Error::Cancelled { .. }))
    {
        failures.retain(|f| !matches!(f.error, Error::Cancelled { .. }));
    }
    failures
}
