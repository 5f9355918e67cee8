//! Process exit codes.
//!
//! - `0`: success
//! - `1`: general failure (I/O, unreadable target, output destination)
//! - `2`: invalid command-line usage (emitted by clap)
//! - `3`..`7`: one code per error category, see [`crate::error::ErrorCategory`]

/// The patch was generated without errors.
pub const SUCCESS: i32 = 0;

/// General failure.
pub const ERROR: i32 = 1;

/// The configuration file is malformed.
pub const CONFIG_ERROR: i32 = 3;

/// Patchset inputs could not be resolved to target paths.
pub const RESOLUTION_ERROR: i32 = 4;

/// A filename decoration could not be parsed.
pub const DIRECTIVE_ERROR: i32 = 5;

/// A processor failed.
pub const PROCESSOR_ERROR: i32 = 6;

/// The diff engine could not represent an entry.
pub const DIFF_ERROR: i32 = 7;
