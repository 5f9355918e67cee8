//! `exec`: run the input as a script
//!
//! The input must start with an interpreter line (`#!/bin/sh`,
//! `#!/usr/bin/env python3`). The script is written to a temporary file and
//! run through that interpreter rather than executed directly, so the
//! temporary file never needs the execute bit. As with the kernel, everything
//! after the interpreter path is passed as one optional argument.
//!
//! The script receives the target content on stdin, the directive's
//! positional arguments as argv and the clean target path in
//! `PATCHTREE_PATH`. Its stdout becomes the new content, with the target's
//! mode.

use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;

use crate::context::Context;
use crate::directive::ProcessorDirective;
use crate::error::{Error, Result};
use crate::filesystem::FileEntry;

use super::{run_tool, Processor};

const NAME: &str = "exec";

/// Environment variable holding the entry's clean path
pub const PATH_ENV: &str = "PATCHTREE_PATH";

/// The script processor
#[derive(Debug, Default, Clone, Copy)]
pub struct Exec;

/// Interpreter and optional argument from a `#!` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shebang {
    pub interpreter: String,
    pub argument: Option<String>,
}

/// Parse the interpreter line at the start of `script`.
pub fn parse_shebang(script: &[u8]) -> Option<Shebang> {
    let rest = script.strip_prefix(b"#!")?;
    let line = rest.split(|&b| b == b'\n').next().unwrap_or_default();
    let line = std::str::from_utf8(line).ok()?.trim();

    let (interpreter, argument) = match line.split_once(char::is_whitespace) {
        Some((interpreter, argument)) => (interpreter, Some(argument.trim())),
        None => (line, None),
    };
    if interpreter.is_empty() {
        return None;
    }

    Some(Shebang {
        interpreter: interpreter.to_string(),
        argument: argument.filter(|a| !a.is_empty()).map(str::to_string),
    })
}

impl Processor for Exec {
    fn transform(
        &self,
        input: FileEntry,
        directive: &ProcessorDirective,
        ctx: &Context<'_>,
    ) -> Result<FileEntry> {
        let shebang = parse_shebang(&input.content).ok_or_else(|| {
            Error::processor(NAME, ctx.path(), "script has no `#!` interpreter line")
        })?;

        let mut script = NamedTempFile::new()?;
        script.write_all(&input.content)?;
        script.flush()?;

        let mut command = Command::new(&shebang.interpreter);
        command
            .args(shebang.argument.iter())
            .arg(script.path())
            .args(&directive.positional)
            .env(PATH_ENV, ctx.path());

        let captured = run_tool(NAME, ctx, command, Some(ctx.target_content().to_vec()))?;
        Ok(FileEntry::with_mode(captured.stdout, ctx.target_mode()))
    }
}
