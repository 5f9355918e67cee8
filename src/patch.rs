//! Patch Assembler
//!
//! Collects the per-file sections and writes them, sorted by clean path,
//! after an optional header:
//!
//! ```text
//! #!/usr/bin/env -S git apply --allow-empty
//! patchtree output (version 0.3.0)
//! SPDX-License-Identifier: MIT
//! diff --git a/...
//! ```
//!
//! `git apply` ignores everything before the first `diff --git` line, and
//! the shebang makes the patch file directly executable against a checkout.

use std::io::{self, Write};

use crate::config::Config;
use crate::diff::DiffResult;

/// Base shebang line for executable patch files
pub const SHEBANG: &str = "#!/usr/bin/env -S git apply --allow-empty";

/// Header options for the assembled patch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchHeader {
    pub shebang: bool,
    /// Added to the shebang so `git apply` accepts context-free hunks
    pub unidiff_zero: bool,
    pub version_line: bool,
    pub license: Option<String>,
}

impl PatchHeader {
    pub fn from_config(config: &Config) -> Self {
        Self {
            shebang: config.output_shebang,
            unidiff_zero: config.diff_context == 0,
            version_line: config.output_header,
            license: config.license.clone(),
        }
    }

    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.shebang {
            out.write_all(SHEBANG.as_bytes())?;
            if self.unidiff_zero {
                out.write_all(b" --unidiff-zero")?;
            }
            out.write_all(b"\n")?;
        }
        if self.version_line {
            writeln!(out, "patchtree output (version {})", env!("CARGO_PKG_VERSION"))?;
        }
        if let Some(license) = &self.license {
            writeln!(out, "{}", license)?;
        }
        Ok(())
    }
}

/// The final patch: header plus non-empty sections in clean-path order
#[derive(Debug, Clone, Default)]
pub struct Patch {
    header: PatchHeader,
    sections: Vec<DiffResult>,
}

impl Patch {
    pub fn new(header: PatchHeader) -> Self {
        Self {
            header,
            sections: Vec::new(),
        }
    }

    /// Add a section. Empty sections are dropped.
    pub fn push(&mut self, section: DiffResult) {
        if !section.is_empty() {
            self.sections.push(section);
        }
    }

    /// Number of file sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Clean paths of the sections, in output order
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.sections.iter().map(|s| s.path.as_str()).collect();
        paths.sort_unstable();
        paths
    }

    /// Write the header and every section in clean-path order.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.sections.sort_by(|a, b| a.path.cmp(&b.path));
        self.header.write_to(out)?;
        for section in &self.sections {
            out.write_all(section.text.as_bytes())?;
        }
        out.flush()
    }

    /// Render into a string
    pub fn render(&mut self) -> String {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl FromIterator<DiffResult> for Patch {
    fn from_iter<I: IntoIterator<Item = DiffResult>>(iter: I) -> Self {
        let mut patch = Patch::default();
        for section in iter {
            patch.push(section);
        }
        patch
    }
}
