//! Shared test utilities for the end-to-end tests.
//!
//! Every fixture is a temporary directory with two subdirectories:
//! `target/` (the unmodified tree) and `patchset/` (the working directory the
//! binary runs in). A configuration file, if any, lives next to them and is
//! passed with `--config`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_target_file("foo.c", "A\nB\n")
//!         .with_patch_file("foo.c", "A\nC\n");
//!     fixture.command().arg("**/*").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Configuration snippets shared by several tests.
#[allow(dead_code)]
pub mod configs {
    /// Zero context, no version line: the smallest deterministic output.
    pub const BARE: &str = "diff_context: 0\noutput_header: false\n";

    /// Same as [`BARE`] but skipping failed entries.
    pub const BARE_CONTINUE: &str = "diff_context: 0\noutput_header: false\non_error: continue\n";

    /// Not valid YAML.
    pub const INVALID_YAML: &str = "diff_context: [unclosed";
}

/// A temporary target tree plus patchset tree.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
    config: Option<PathBuf>,
}

impl TestFixture {
    /// Create a fixture with empty `target/` and `patchset/` directories.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("target")
            .create_dir_all()
            .expect("Failed to create target directory");
        temp_dir
            .child("patchset")
            .create_dir_all()
            .expect("Failed to create patchset directory");
        Self {
            temp_dir,
            config: None,
        }
    }

    /// Write `patchtree.yaml` next to the trees and pass it with `--config`.
    pub fn with_config(mut self, content: &str) -> Self {
        let child = self.temp_dir.child("patchtree.yaml");
        child.write_str(content).expect("Failed to write config file");
        self.config = Some(child.path().to_path_buf());
        self
    }

    /// Add a file to the target tree.
    pub fn with_target_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child("target")
            .child(path)
            .write_str(content)
            .expect("Failed to write target file");
        self
    }

    /// Add a file to the patchset tree. `path` may carry a decoration.
    pub fn with_patch_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child("patchset")
            .child(path)
            .write_str(content)
            .expect("Failed to write patchset file");
        self
    }

    /// Add a binary file to the patchset tree.
    #[allow(dead_code)]
    pub fn with_binary_patch_file(self, path: &str, content: &[u8]) -> Self {
        self.temp_dir
            .child("patchset")
            .child(path)
            .write_binary(content)
            .expect("Failed to write binary file");
        self
    }

    /// Set the permission bits of a patchset file.
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn with_patch_mode(self, path: &str, mode: u32) -> Self {
        use std::os::unix::fs::PermissionsExt;
        let file = self.patchset_dir().join(path);
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(mode))
            .expect("Failed to set permissions");
        self
    }

    /// Root of the fixture.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The target tree.
    pub fn target_dir(&self) -> PathBuf {
        self.path().join("target")
    }

    /// The patchset tree, used as working directory.
    pub fn patchset_dir(&self) -> PathBuf {
        self.path().join("patchset")
    }

    /// Create a child path in the fixture.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// `patchtree [--config FILE] <target-dir>` running in the patchset
    /// tree, isolated from the user's environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = self.bare_command();
        cmd.arg(self.target_dir());
        cmd
    }

    /// Like [`TestFixture::command`] but without the TARGET argument.
    pub fn bare_command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("patchtree");
        cmd.current_dir(self.patchset_dir())
            .env("XDG_CONFIG_HOME", self.path())
            .env("NO_COLOR", "1")
            .env_remove("PATCHTREE_CONFIG")
            .env_remove("RUST_LOG");
        if let Some(config) = &self.config {
            cmd.arg("--config").arg(config);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_trees() {
        let fixture = TestFixture::new();
        assert!(fixture.target_dir().is_dir());
        assert!(fixture.patchset_dir().is_dir());
    }

    #[test]
    fn test_fixture_with_files() {
        let fixture = TestFixture::new()
            .with_target_file("src/a.c", "a")
            .with_patch_file("src/a.c#jinja", "b");
        assert!(fixture.target_dir().join("src/a.c").exists());
        assert!(fixture.patchset_dir().join("src/a.c#jinja").exists());
    }

    #[test]
    fn test_configs_are_valid_yaml() {
        for config in [configs::BARE, configs::BARE_CONTINUE] {
            serde_yaml::from_str::<serde_yaml::Value>(config).expect("Config should be valid YAML");
        }
        assert!(serde_yaml::from_str::<serde_yaml::Value>(configs::INVALID_YAML).is_err());
    }
}
