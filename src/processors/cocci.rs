//! `cocci`: apply the input as a Coccinelle semantic patch to the target.
//!
//! The engine binary (`cocci_binary`, default `spatch`) is looked up on
//! `PATH` for every invocation. The script and a copy of the target are
//! written to a private temporary directory; the copy keeps the target's
//! file name so language detection by extension still works. Positional
//! directive arguments are appended to the engine's command line.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use crate::context::Context;
use crate::directive::ProcessorDirective;
use crate::error::{Error, Result};
use crate::filesystem::FileEntry;

use super::{run_tool, Processor};

const NAME: &str = "cocci";
const SCRIPT_NAME: &str = "patch.cocci";

/// The semantic patch processor
#[derive(Debug, Default, Clone, Copy)]
pub struct Coccinelle;

impl Processor for Coccinelle {
    fn transform(
        &self,
        input: FileEntry,
        directive: &ProcessorDirective,
        ctx: &Context<'_>,
    ) -> Result<FileEntry> {
        let binary_name = &ctx.config().cocci_binary;
        let binary = which::which(binary_name).map_err(|e| {
            Error::processor(
                NAME,
                ctx.path(),
                format!("semantic patch engine `{}` not found: {}", binary_name, e),
            )
        })?;

        let file_name = Path::new(ctx.path())
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "target".into());

        let workdir = TempDir::new()?;
        let script = workdir.path().join(SCRIPT_NAME);
        let target = workdir.path().join(&file_name);
        fs::write(&script, &input.content)?;
        fs::write(&target, ctx.target_content())?;

        let mut command = Command::new(binary);
        command
            .current_dir(workdir.path())
            .arg("--very-quiet")
            .arg("--sp-file")
            .arg(&script)
            .arg("--in-place")
            .arg(&target)
            .args(&directive.positional);

        run_tool(NAME, ctx, command, None)?;

        let content = fs::read(&target)?;
        Ok(FileEntry::with_mode(content, ctx.target_mode()))
    }
}
