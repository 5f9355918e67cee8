//! `id`: reproduce the target file unchanged.
//!
//! The patchset content is ignored; only its mode survives. Use it to change
//! a file's mode, or to touch a file without editing it.

use crate::context::Context;
use crate::directive::ProcessorDirective;
use crate::error::Result;
use crate::filesystem::FileEntry;

use super::Processor;

/// The identity processor
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Processor for Identity {
    fn transform(
        &self,
        input: FileEntry,
        _directive: &ProcessorDirective,
        ctx: &Context<'_>,
    ) -> Result<FileEntry> {
        Ok(FileEntry::with_mode(ctx.target_content().to_vec(), input.mode))
    }
}
