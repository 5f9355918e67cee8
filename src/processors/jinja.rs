//! `jinja`: render the input as a Jinja template.
//!
//! Blocks are trimmed (`trim_blocks` and `lstrip_blocks`) so control tags on
//! their own line leave no blank lines behind. The trailing newline of the
//! template is kept.
//!
//! Variables, lowest precedence first: `path` (clean target path) and
//! `target` (target text, empty for new files), then the session's
//! [`TemplateVars`](crate::context::TemplateVars) provider, then keyed
//! directive arguments (`file#jinja,name=value`).

use minijinja::Environment;

use crate::context::{Context, TemplateVarMap};
use crate::directive::ProcessorDirective;
use crate::error::{Error, Result};
use crate::filesystem::FileEntry;

use super::Processor;

const NAME: &str = "jinja";

/// The template processor
#[derive(Debug, Default, Clone, Copy)]
pub struct Jinja;

impl Jinja {
    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        // Plain Jinja drops one trailing newline; patched files keep theirs
        env.set_keep_trailing_newline(true);
        env
    }

    fn variables(directive: &ProcessorDirective, ctx: &Context<'_>) -> Result<TemplateVarMap> {
        let mut vars = TemplateVarMap::new();
        vars.insert("path".to_string(), ctx.path().into());
        let target = match ctx.target() {
            Some(_) => ctx.target_text(NAME)?,
            None => "",
        };
        vars.insert("target".to_string(), target.into());

        vars.extend(ctx.session().template_vars.vars(ctx)?);
        for (key, value) in &directive.keyed {
            vars.insert(key.clone(), value.as_str().into());
        }
        Ok(vars)
    }
}

impl Processor for Jinja {
    fn transform(
        &self,
        input: FileEntry,
        directive: &ProcessorDirective,
        ctx: &Context<'_>,
    ) -> Result<FileEntry> {
        let source = input
            .text()
            .ok_or_else(|| Error::processor(NAME, ctx.path(), "template is not text"))?;
        let vars = Self::variables(directive, ctx)?;

        let rendered = Self::environment()
            .render_str(source, &vars)
            .map_err(|e| Error::processor(NAME, ctx.path(), format!("{:#}", e)))?;

        Ok(FileEntry::with_mode(rendered.into_bytes(), input.mode))
    }
}
