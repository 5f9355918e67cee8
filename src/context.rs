//! # Per-entry Context
//!
//! Two layers of state are passed to processors and diff engines:
//!
//! - [`Session`]: everything that is fixed for the whole run (configuration,
//!   registries, template variable provider, cancellation token). It is built
//!   once, never mutated afterwards, and shared by reference between worker
//!   threads.
//! - [`Context`]: created fresh for every patchset entry. It holds the target
//!   file for the entry's clean path and the working content that each
//!   processor in the chain replaces. A `Context` is dropped as soon as its
//!   entry has been diffed, so nothing leaks between entries.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::diff::DiffRegistry;
use crate::error::{Error, Result};
use crate::filesystem::{FileEntry, FileMode};
use crate::processors::ProcessorRegistry;

/// Template variables handed to the `jinja` processor.
pub type TemplateVarMap = BTreeMap<String, serde_json::Value>;

/// Source of template variables for the `jinja` processor.
///
/// Implementations must not keep per-entry mutable state; the same provider
/// is called concurrently for different entries.
pub trait TemplateVars: Send + Sync {
    /// Variables for the entry described by `ctx`.
    fn vars(&self, ctx: &Context<'_>) -> Result<TemplateVarMap>;
}

/// Provider that yields no variables
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTemplateVars;

impl TemplateVars for NoTemplateVars {
    fn vars(&self, _ctx: &Context<'_>) -> Result<TemplateVarMap> {
        Ok(TemplateVarMap::new())
    }
}

/// Provider that yields the same fixed set of variables for every entry
#[derive(Debug, Default, Clone)]
pub struct StaticTemplateVars {
    vars: TemplateVarMap,
}

impl StaticTemplateVars {
    pub fn new(vars: TemplateVarMap) -> Self {
        Self { vars }
    }
}

impl TemplateVars for StaticTemplateVars {
    fn vars(&self, _ctx: &Context<'_>) -> Result<TemplateVarMap> {
        Ok(self.vars.clone())
    }
}

/// Provider for `config.template_vars`, or no variables when there are none.
pub fn default_template_vars(config: &Config) -> Arc<dyn TemplateVars> {
    if config.template_vars.is_empty() {
        Arc::new(NoTemplateVars)
    } else {
        Arc::new(StaticTemplateVars::new(config.template_vars.clone()))
    }
}

/// Run-wide cancellation flag.
///
/// Cloning shares the flag. Subprocess invocations poll it and kill their
/// child when it trips.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of all in-flight work.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only state shared by every entry of a run
pub struct Session {
    /// Effective configuration
    pub config: Config,
    /// Processor identifiers and implementations
    pub processors: ProcessorRegistry,
    /// Diff strategies by name and extension
    pub diffs: DiffRegistry,
    /// Template variable source for `jinja`
    pub template_vars: Arc<dyn TemplateVars>,
    /// Cancellation flag for in-flight subprocesses
    pub cancel: CancelToken,
}

impl Session {
    /// Session with built-in registries and no template variables.
    pub fn new(config: Config) -> Result<Self> {
        let diffs = DiffRegistry::from_config(&config)?;
        let processors = ProcessorRegistry::from_config(&config)?;
        let template_vars = default_template_vars(&config);
        Ok(Self::from_parts(config, processors, diffs, template_vars))
    }

    /// Session from already configured registries.
    pub fn from_parts(
        config: Config,
        processors: ProcessorRegistry,
        diffs: DiffRegistry,
        template_vars: Arc<dyn TemplateVars>,
    ) -> Self {
        Self {
            config,
            processors,
            diffs,
            template_vars,
            cancel: CancelToken::new(),
        }
    }
}

/// Per-entry state passed through the processor chain and to the diff engine
pub struct Context<'s> {
    path: String,
    target: Option<FileEntry>,
    current: FileEntry,
    session: &'s Session,
}

impl<'s> Context<'s> {
    /// Create a context for one entry.
    ///
    /// `current` is the raw patchset file; `target` is the target file at the
    /// clean path, or `None` if the entry adds a new file.
    pub fn new(
        session: &'s Session,
        path: impl Into<String>,
        target: Option<FileEntry>,
        current: FileEntry,
    ) -> Self {
        Self {
            path: path.into(),
            target,
            current,
            session,
        }
    }

    /// Clean target path of the entry
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Target file, if it exists
    pub fn target(&self) -> Option<&FileEntry> {
        self.target.as_ref()
    }

    /// Target content, empty if the file does not exist
    pub fn target_content(&self) -> &[u8] {
        self.target
            .as_ref()
            .map(|t| t.content.as_slice())
            .unwrap_or_default()
    }

    /// Target mode, or regular-file mode if the file does not exist
    pub fn target_mode(&self) -> FileMode {
        self.target.as_ref().map(|t| t.mode).unwrap_or_default()
    }

    /// Target content as text, for processors that require text.
    pub fn target_text(&self, processor: &str) -> Result<&str> {
        std::str::from_utf8(self.target_content()).map_err(|_| {
            Error::processor(processor, &self.path, "target content is not valid UTF-8")
        })
    }

    /// Working content produced so far
    pub fn current(&self) -> &FileEntry {
        &self.current
    }

    /// Take the working content, leaving an empty file in its place.
    pub fn take_current(&mut self) -> FileEntry {
        std::mem::take(&mut self.current)
    }

    /// Replace the working content.
    pub fn set_current(&mut self, entry: FileEntry) {
        self.current = entry;
    }

    /// Run-wide state
    pub fn session(&self) -> &'s Session {
        self.session
    }

    /// Effective configuration
    pub fn config(&self) -> &'s Config {
        &self.session.config
    }

    /// Split the context into its final working content and target.
    pub fn finish(self) -> (FileEntry, Option<FileEntry>) {
        (self.current, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Config::default()).unwrap()
    }

    #[test]
    fn test_context_absent_target_defaults() {
        let session = session();
        let ctx = Context::new(&session, "new.c", None, FileEntry::from_string("x"));
        assert!(ctx.target().is_none());
        assert!(ctx.target_content().is_empty());
        assert_eq!(ctx.target_mode(), FileMode::REGULAR);
        assert_eq!(ctx.path(), "new.c");
    }

    #[test]
    fn test_context_take_and_set_current() {
        let session = session();
        let mut ctx = Context::new(
            &session,
            "a.c",
            Some(FileEntry::from_string("target")),
            FileEntry::from_string("input"),
        );
        let taken = ctx.take_current();
        assert_eq!(taken.content, b"input");
        ctx.set_current(FileEntry::from_string("output"));
        let (current, target) = ctx.finish();
        assert_eq!(current.content, b"output");
        assert_eq!(target.unwrap().content, b"target");
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_static_template_vars_come_from_config() {
        let mut config = Config::default();
        config
            .template_vars
            .insert("name".to_string(), serde_json::json!("world"));
        let session = Session::new(config).unwrap();
        let ctx = Context::new(&session, "a.txt", None, FileEntry::default());
        let vars = session.template_vars.vars(&ctx).unwrap();
        assert_eq!(vars.get("name"), Some(&serde_json::json!("world")));
    }

    #[test]
    fn test_target_text_rejects_binary() {
        let session = session();
        let ctx = Context::new(
            &session,
            "a.bin",
            Some(FileEntry::new(vec![0xff, 0xfe])),
            FileEntry::default(),
        );
        assert!(ctx.target_text("merge").is_err());
    }
}
