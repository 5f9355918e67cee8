//! End-to-end tests for exit codes and the error policies.
//!
//! The codes are documented in [`patchtree::exit_codes`]:
//!
//! - 0: success, including "no files to patch"
//! - 2: invalid command-line usage (handled by clap)
//! - 3: configuration error
//! - 4: resolution error
//! - 5: directive parse error
//! - 6: processor error
//! - 7: diff error

mod common;
use common::prelude::*;

#[test]
fn test_exit_code_help() {
    cargo_bin_cmd!("patchtree").arg("--help").assert().code(0);
}

#[test]
fn test_exit_code_version() {
    cargo_bin_cmd!("patchtree")
        .arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Exit code 2 when neither INPUT nor --root is given.
#[test]
fn test_exit_code_usage_missing_inputs() {
    let fixture = TestFixture::new();
    fixture.command().assert().code(2);
}

/// No matching inputs is a warning, not an error.
#[test]
fn test_no_inputs_is_success() {
    let fixture = TestFixture::new().with_patch_file("a.txt", "a\n");

    fixture
        .command()
        .arg("nothing/*")
        .assert()
        .code(0)
        .stdout("")
        .stderr(predicate::str::contains("no files to patch"));
}

#[test]
fn test_exit_code_invalid_yaml() {
    let fixture = TestFixture::new()
        .with_config(configs::INVALID_YAML)
        .with_patch_file("a.txt", "a\n");

    fixture
        .command()
        .arg("a.txt")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_exit_code_missing_config_file() {
    let fixture = TestFixture::new().with_patch_file("a.txt", "a\n");

    fixture
        .command()
        .args(["--config", "nope.yaml", "a.txt"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_exit_code_unknown_config_field() {
    let fixture = TestFixture::new()
        .with_config("diff_contxt: 1\n")
        .with_patch_file("a.txt", "a\n");

    fixture
        .command()
        .arg("a.txt")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("diff_contxt"));
}

#[test]
fn test_exit_code_unknown_diff_strategy() {
    let fixture = TestFixture::new()
        .with_config("diff_strategies:\n  .bin: hexdump\n")
        .with_patch_file("a.txt", "a\n");

    fixture
        .command()
        .arg("a.txt")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("hexdump"))
        .stderr(predicate::str::contains("available strategies"));
}

/// The config file is read from PATCHTREE_CONFIG when --config is absent.
#[test]
fn test_config_from_environment() {
    let fixture = TestFixture::new()
        .with_target_file("foo.c", "A\nB\n")
        .with_patch_file("foo.c", "A\nC\n");
    let config = fixture.child("env.yaml");
    config.write_str(configs::BARE).unwrap();

    fixture
        .command()
        .env("PATCHTREE_CONFIG", config.path())
        .arg("foo.c")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("diff --git a/foo.c b/foo.c\n"));
}

/// Two patchset files with the same clean path abort before any output.
#[test]
fn test_exit_code_resolution_conflict() {
    let fixture = TestFixture::new()
        .with_target_file("x.c", "x\n")
        .with_patch_file("x.c#id", "")
        .with_patch_file("x.c#id,foo", "");

    fixture
        .command()
        .arg("**/*")
        .assert()
        .code(4)
        .stdout("")
        .stderr(predicate::str::contains("Resolution conflict for x.c"))
        .stderr(predicate::str::contains("hint: Each target file"));
}

#[test]
fn test_exit_code_missing_target() {
    let fixture = TestFixture::new().with_patch_file("a.txt", "a\n");

    fixture
        .bare_command()
        .arg(fixture.path().join("does-not-exist"))
        .arg("a.txt")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot read target"));
}

/// An unknown processor fails parsing; under halt nothing is emitted.
#[test]
fn test_exit_code_unknown_processor() {
    let fixture = TestFixture::new()
        .with_config(configs::BARE)
        .with_target_file("good.txt", "1\n")
        .with_patch_file("good.txt", "2\n")
        .with_patch_file("bad.txt#jinj", "x\n");

    fixture
        .command()
        .arg("**/*")
        .assert()
        .code(5)
        .stdout("")
        .stderr(predicate::str::contains("unknown processor `jinj`, did you mean `jinja`?"));
}

#[test]
fn test_exit_code_malformed_decoration() {
    let fixture = TestFixture::new()
        .with_config(configs::BARE)
        .with_patch_file("a.txt##id", "x\n");

    fixture
        .command()
        .arg("a.txt*")
        .assert()
        .code(5)
        .stdout("")
        .stderr(predicate::str::contains("Directive parse error for a.txt"));
}

/// Under --keep-going the good entries are emitted and the exit code is
/// that of the failure.
#[test]
fn test_keep_going_emits_successful_entries() {
    let fixture = TestFixture::new()
        .with_config(configs::BARE)
        .with_target_file("good.txt", "1\n")
        .with_patch_file("good.txt", "2\n")
        .with_patch_file("bad.txt#nosuch", "x\n");

    fixture
        .command()
        .args(["--keep-going", "**/*"])
        .assert()
        .code(5)
        .stdout(
            "diff --git a/good.txt b/good.txt\n\
             --- a/good.txt\n\
             +++ b/good.txt\n\
             @@ -1 +1 @@\n\
             -1\n\
             +2\n",
        )
        .stderr(predicate::str::contains("warning: skipped:"))
        .stderr(predicate::str::contains("bad.txt"));
}

/// `on_error: continue` in the configuration behaves like --keep-going.
#[cfg(unix)]
#[test]
fn test_continue_policy_from_config() {
    let fixture = TestFixture::new()
        .with_config(configs::BARE_CONTINUE)
        .with_patch_file("ok.txt", "ok\n")
        .with_patch_file("fail.txt#exec", "#!/bin/sh\nexit 1\n");

    fixture
        .command()
        .arg("**/*")
        .assert()
        .code(6)
        .stdout(predicate::str::contains("diff --git a/ok.txt b/ok.txt\n"))
        .stdout(predicate::str::contains("fail.txt").not());
}

/// Under halt a processor failure suppresses the whole patch.
#[cfg(unix)]
#[test]
fn test_halt_policy_emits_nothing() {
    let fixture = TestFixture::new()
        .with_config(configs::BARE)
        .with_patch_file("ok.txt", "ok\n")
        .with_patch_file("fail.txt#exec", "#!/bin/sh\nexit 1\n");

    fixture
        .command()
        .arg("**/*")
        .assert()
        .code(6)
        .stdout("")
        .stderr(predicate::str::contains("error: Processor `exec` failed for fail.txt"));
}
