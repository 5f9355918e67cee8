//! Processors declared in the configuration file
//!
//! ```yaml
//! processors:
//!   fmt:
//!     command: [clang-format, --style=file]
//!     input: current
//! ```
//!
//! The command gets the working content (or the target, with
//! `input: target`) on stdin. Its stdout replaces the working content and the
//! input mode is kept. Directive positional arguments are appended to the
//! command line.

use std::process::Command;

use crate::config::{CommandInput, CommandProcessorConfig};
use crate::context::Context;
use crate::directive::ProcessorDirective;
use crate::error::{Error, Result};
use crate::filesystem::FileEntry;

use super::{run_tool, Processor};

/// An external command used as a processor
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    name: String,
    spec: CommandProcessorConfig,
}

impl CommandProcessor {
    pub fn new(name: &str, spec: CommandProcessorConfig) -> Self {
        Self {
            name: name.to_string(),
            spec,
        }
    }
}

impl Processor for CommandProcessor {
    fn transform(
        &self,
        input: FileEntry,
        directive: &ProcessorDirective,
        ctx: &Context<'_>,
    ) -> Result<FileEntry> {
        let Some((program, args)) = self.spec.command.split_first() else {
            return Err(Error::processor(&self.name, ctx.path(), "empty command"));
        };

        let mut command = Command::new(program);
        command.args(args).args(&directive.positional);

        let stdin = match self.spec.input {
            CommandInput::Current => input.content,
            CommandInput::Target => ctx.target_content().to_vec(),
        };
        let captured = run_tool(&self.name, ctx, command, Some(stdin))?;
        Ok(FileEntry::with_mode(captured.stdout, input.mode))
    }
}
