//! # patchtree
//!
//! This library turns a *patchset*, a directory tree of files that mirror
//! an external source tree, into one clean patch against that unmodified
//! *target* tree. It is used by the `patchtree` command-line tool but can
//! be embedded to register custom processors, diff strategies or template
//! variable providers.
//!
//! ## Quick Example
//!
//! ```
//! use patchtree::config::Config;
//! use patchtree::diff::{BinaryPolicy, DiffEngine, Unified};
//! use patchtree::filesystem::FileEntry;
//! use patchtree::path::clean_path;
//!
//! // Decorations are stripped from the file name only
//! let clean = clean_path("src/version.h#jinja".as_ref()).unwrap();
//! assert_eq!(clean.path, "src/version.h");
//! assert_eq!(clean.decoration.as_deref(), Some("jinja"));
//!
//! // Diff the processed content against the target file
//! let old = FileEntry::from_string("A\nB\n");
//! let new = FileEntry::from_string("A\nC\n");
//! let section = Unified::new(BinaryPolicy::Reject)
//!     .diff("foo.c", Some(&old), &new, 0)
//!     .unwrap();
//! assert!(section.text.contains("@@ -2 +2 @@\n-B\n+C\n"));
//!
//! // Every configuration field has a default
//! assert_eq!(Config::default().diff_context, 3);
//! ```
//!
//! ## Core Concepts
//!
//! - **Target (`target`)**: read-only view of the unmodified tree, either a
//!   directory or a zip/tar archive.
//! - **Patchset Resolver (`resolve`)**: expands INPUT globs and maps each file
//!   to its clean target path.
//! - **Directive Parser (`directive`)**: reads the `#proc,arg,key=value`
//!   decorations of a file name into a processor chain.
//! - **Processors (`processors`)**: content transformations applied
//!   right-to-left, looked up in a registry.
//! - **Diff engines (`diff`)**: selected by file extension, produce git-style
//!   file sections.
//! - **Patch Assembler (`patch`)**: orders the sections by clean path and
//!   writes the patch.
//!
//! ## Execution Flow
//!
//! [`pipeline::Pipeline::run`] resolves the inputs, parses every entry
//! before anything executes, runs the entries in parallel with a fresh
//! [`context::Context`] each, and assembles the results. See the
//! [`pipeline`] module for the error policies.

pub mod config;
pub mod context;
pub mod defaults;
pub mod diff;
pub mod directive;
pub mod error;
pub mod exit_codes;
pub mod filesystem;
pub mod output;
pub mod patch;
pub mod path;
pub mod pipeline;
pub mod process;
pub mod processors;
pub mod resolve;
pub mod suggestions;
pub mod target;

#[cfg(test)]
mod directive_proptest;
