//! Default values for patchtree configuration.
//!
//! This module provides centralized default values used by the configuration
//! loader, the CLI and the pipeline, ensuring consistency and avoiding
//! duplication.

use std::path::PathBuf;

/// Number of context lines in unified diffs.
pub const DIFF_CONTEXT: usize = 3;

/// Timeout for a single external tool invocation, in seconds.
pub const TIMEOUT_SECS: u64 = 60;

/// Semantic patch engine executable used by the `cocci` processor.
pub const COCCI_BINARY: &str = "spatch";

/// Name of the project-local configuration file.
pub const CONFIG_FILE_NAME: &str = ".patchtree.yaml";

/// Diff strategy used when no extension-specific strategy matches.
pub const DIFF_STRATEGY: &str = "unified";

/// Merge strategy used by the `merge` processor when none is named.
pub const MERGE_STRATEGY: &str = "ignore";

/// Returns the user-level configuration file path, if it can be determined.
///
/// Uses the platform-appropriate configuration directory:
/// - Linux: `~/.config/patchtree/config.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/patchtree/config.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\patchtree\config.yaml`
///
/// This is consulted only when neither `--config`, `PATCHTREE_CONFIG` nor a
/// project-local `.patchtree.yaml` is present.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("patchtree").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_path_ends_with_file_name() {
        if let Some(path) = user_config_path() {
            assert!(path.ends_with("patchtree/config.yaml"));
        }
    }

    #[test]
    fn test_default_context_matches_unified_diff_convention() {
        assert_eq!(DIFF_CONTEXT, 3);
    }
}
