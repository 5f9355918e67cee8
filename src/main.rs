//! # patchtree CLI
//!
//! This is the binary entry point for the `patchtree` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Running the patch pipeline with the effective configuration.
//! - Reporting errors on stderr and mapping them to exit codes.
//!
//! The core logic lives in the `patchtree` library crate; the binary is a thin
//! wrapper around it.

mod cli;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    let out = cli.output_config();

    let code = match cli.execute() {
        Ok(code) => code,
        Err(error) => {
            cli::report_error(&error, &out);
            cli::exit_code(&error)
        }
    };
    std::process::exit(code);
}
