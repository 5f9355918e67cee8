//! # Error Handling
//!
//! This module defines the centralized error type for `patchtree`. It uses
//! the `thiserror` library to build a single `Error` enum covering every
//! failure the pipeline can report, each carrying the clean target path or
//! input that caused it.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum for all failures. Variants are grouped into
//!   categories (see [`ErrorCategory`]) that decide whether a failure is fatal
//!   for the run or scoped to a single patchset entry, and which process exit
//!   code it maps to.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Fatal categories (resolution, configuration, general) abort the run before
//! any patch text is written. Per-entry categories (directive parse,
//! processor, diff) are governed by the run's error policy.

use thiserror::Error;

use crate::exit_codes;

/// Main error type for patchtree operations
#[derive(Error, Debug)]
pub enum Error {
    /// Two distinct patchset files map to the same clean target path.
    #[error("Resolution conflict for {path}: both `{first}` and `{second}` target it")]
    ResolutionConflict {
        path: String,
        first: String,
        second: String,
    },

    /// A patchset input cannot be mapped to a target-relative path.
    #[error("Invalid patchset input `{input}`: {message}")]
    InvalidInput { input: String, message: String },

    /// A filename decoration is malformed or names an unknown processor.
    #[error("Directive parse error for {path}: {message}")]
    DirectiveParse { path: String, message: String },

    /// A processor failed while transforming an entry.
    #[error("Processor `{processor}` failed for {path}: {message}")]
    Processor {
        processor: String,
        path: String,
        message: String,
    },

    /// The selected diff strategy cannot represent the entry.
    #[error("Diff error for {path}: {message}")]
    Diff { path: String, message: String },

    /// The structured configuration is malformed.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Configuration {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The target directory or archive cannot be read.
    #[error("Cannot read target `{path}`: {message}")]
    Target { path: String, message: String },

    /// The entry was abandoned because the run is being cancelled.
    #[error("Cancelled: {path}")]
    Cancelled { path: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A glob traversal error, wrapped from `glob::GlobError`.
    #[error("Glob traversal error: {0}")]
    GlobWalk(#[from] glob::GlobError),
}

/// Coarse classification of an [`Error`], used for exit codes and policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Resolution,
    DirectiveParse,
    Processor,
    Diff,
    Configuration,
    General,
}

impl Error {
    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ResolutionConflict { .. } | Error::InvalidInput { .. } => {
                ErrorCategory::Resolution
            }
            Error::Glob(_) | Error::GlobWalk(_) => ErrorCategory::Resolution,
            Error::DirectiveParse { .. } => ErrorCategory::DirectiveParse,
            Error::Processor { .. } | Error::Cancelled { .. } => ErrorCategory::Processor,
            Error::Diff { .. } => ErrorCategory::Diff,
            Error::Configuration { .. } => ErrorCategory::Configuration,
            Error::Target { .. } | Error::Io(_) => ErrorCategory::General,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Resolution => exit_codes::RESOLUTION_ERROR,
            ErrorCategory::DirectiveParse => exit_codes::DIRECTIVE_ERROR,
            ErrorCategory::Processor => exit_codes::PROCESSOR_ERROR,
            ErrorCategory::Diff => exit_codes::DIFF_ERROR,
            ErrorCategory::Configuration => exit_codes::CONFIG_ERROR,
            ErrorCategory::General => exit_codes::ERROR,
        }
    }

    /// Shorthand for building a [`Error::Processor`].
    pub fn processor(
        processor: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Processor {
            processor: processor.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Shorthand for building a [`Error::Configuration`] without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            hint: None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_resolution_conflict() {
        let error = Error::ResolutionConflict {
            path: "x.c".to_string(),
            first: "x.c#id".to_string(),
            second: "x.c#id,foo".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Resolution conflict"));
        assert!(display.contains("x.c#id,foo"));
        assert_eq!(error.category(), ErrorCategory::Resolution);
        assert_eq!(error.exit_code(), exit_codes::RESOLUTION_ERROR);
    }

    #[test]
    fn test_error_display_configuration_with_hint() {
        let error = Error::Configuration {
            message: "unknown diff strategy `foo`".to_string(),
            hint: Some("use `unified` or `binary`".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("hint:"));
        assert_eq!(error.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_error_processor_shorthand() {
        let error = Error::processor("exec", "tools/gen.sh", "exit status 1");
        let display = format!("{}", error);
        assert!(display.contains("Processor `exec` failed for tools/gen.sh"));
        assert_eq!(error.category(), ErrorCategory::Processor);
        assert_eq!(error.exit_code(), exit_codes::PROCESSOR_ERROR);
    }

    #[test]
    fn test_per_entry_categories_have_distinct_exit_codes() {
        let parse = Error::DirectiveParse {
            path: "a".to_string(),
            message: "m".to_string(),
        };
        let diff = Error::Diff {
            path: "a".to_string(),
            message: "m".to_string(),
        };
        let process = Error::processor("p", "a", "m");
        let codes = [parse.exit_code(), diff.exit_code(), process.exit_code()];
        assert_eq!(codes, [5, 7, 6]);
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert_eq!(error.category(), ErrorCategory::General);
    }

    #[test]
    fn test_cancelled_counts_as_processor_failure() {
        let error = Error::Cancelled {
            path: "a.c".to_string(),
        };
        assert_eq!(error.exit_code(), exit_codes::PROCESSOR_ERROR);
    }
}
