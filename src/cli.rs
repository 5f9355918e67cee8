//! CLI argument parsing and run dispatch

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Parser;
use log::{debug, warn};

use patchtree::config::{self, Config, ErrorPolicy};
use patchtree::error::Error;
use patchtree::exit_codes;
use patchtree::output::{error_line, warning_line, OutputConfig};
use patchtree::pipeline::{Pipeline, RunReport};
use patchtree::resolve::{root_pattern, ResolveOptions};
use patchtree::suggestions;
use patchtree::target::Target;

/// patchtree - Generate clean patches against an unmodified source tree
#[derive(Parser, Debug)]
#[command(name = "patchtree")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Unmodified source tree: a directory, .zip, .tar or .tar.gz archive
    #[arg(value_name = "TARGET")]
    target: PathBuf,

    /// Patchset files or glob patterns, relative to the working directory
    #[arg(value_name = "INPUT", required_unless_present = "root")]
    inputs: Vec<String>,

    /// Write the patch to FILE instead of stdout ("-" for stdout)
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, value_name = "FILE", env = "PATCHTREE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of context lines in unified diffs
    #[arg(short = 'C', long, value_name = "N")]
    context: Option<usize>,

    /// Compute target paths relative to DIR (all of DIR if no INPUT is given)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Start the patch with a `git apply` shebang line
    #[arg(long)]
    shebang: bool,

    /// Skip failed entries instead of aborting the run
    #[arg(short, long)]
    keep_going: bool,

    /// Timeout for external tools in seconds (0 disables it)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Number of worker threads
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    /// Stderr styling chosen by `--color` and the environment
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::from_env_and_flag(&self.color)
    }

    /// Run and return the process exit code.
    pub fn execute(self) -> Result<i32> {
        let out = self.output_config();
        init_logging(&self.log_level, &out);

        let working_dir =
            std::env::current_dir().context("Failed to determine the working directory")?;
        let (mut config, source) = config::load(self.config.as_deref(), &working_dir)?;
        if let Some(source) = &source {
            debug!("Using configuration {}", source.display());
        }
        self.apply_overrides(&mut config);

        let pipeline = Pipeline::new(config)?;
        let target = Target::open(&self.target)?;

        let patterns = match (&self.root, self.inputs.is_empty()) {
            (Some(root), true) => vec![root_pattern(root)],
            _ => self.inputs.clone(),
        };
        let exclude: Vec<PathBuf> = source.into_iter().collect();
        let options = ResolveOptions {
            working_dir: &working_dir,
            root: self.root.as_deref(),
            exclude: &exclude,
        };
        let mut report = pipeline.run(&target, &patterns, &options)?;

        if report.entries == 0 {
            warn!("{}", suggestions::no_inputs_matched(&patterns));
            return Ok(exit_codes::SUCCESS);
        }

        print_failures(&report, &out);
        if report.should_emit() {
            write_patch(&mut report, self.out.as_deref())?;
        }
        Ok(report.exit_code())
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(context) = self.context {
            config.diff_context = context;
        }
        if self.shebang {
            config.output_shebang = true;
        }
        if self.keep_going {
            config.on_error = ErrorPolicy::Continue;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = Some(jobs);
        }
    }
}

/// Initialize env_logger on stderr. `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str, out: &OutputConfig) {
    let style = if out.use_color {
        env_logger::WriteStyle::Always
    } else {
        env_logger::WriteStyle::Never
    };
    // A logger may already be installed when embedded; keep it
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .write_style(style)
        .format_timestamp(None)
        .try_init();
}

/// Report an error and its hints on stderr.
pub fn report_error(error: &anyhow::Error, out: &OutputConfig) {
    eprintln!("{}", error_line(out, &format!("{:#}", error)));
    if let Some(error) = error.chain().find_map(|cause| cause.downcast_ref::<Error>()) {
        for hint in suggestions::hints_for(error) {
            eprintln!("{}", hint);
        }
    }
}

/// Exit code for an error that ended the run.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::exit_code)
        .unwrap_or(exit_codes::ERROR)
}

fn print_failures(report: &RunReport, out: &OutputConfig) {
    for failure in &report.failures {
        let message = failure.error.to_string();
        match report.policy {
            ErrorPolicy::Continue => eprintln!("{}", warning_line(out, &format!("skipped: {}", message))),
            ErrorPolicy::Halt => eprintln!("{}", error_line(out, &message)),
        }
        for hint in suggestions::hints_for(&failure.error) {
            eprintln!("{}", hint);
        }
    }
}

fn write_patch(report: &mut RunReport, destination: Option<&Path>) -> Result<()> {
    match destination {
        Some(path) if path != Path::new("-") => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            report
                .patch
                .write_to(&mut writer)
                .with_context(|| format!("Failed to write patch to {}", path.display()))?;
        }
        _ => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            report
                .patch
                .write_to(&mut writer)
                .context("Failed to write patch to stdout")?;
            writer.flush().context("Failed to write patch to stdout")?;
        }
    }
    Ok(())
}
