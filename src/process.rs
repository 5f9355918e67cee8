//! External tool invocation with timeout and cancellation
//!
//! The `cocci`, `exec` and command processors all run a subprocess, feed it
//! some bytes on stdin and capture its output. [`run`] does that while
//! polling the child so it can be killed when the configured timeout expires
//! or the run is cancelled. Stdin is written and stdout/stderr are drained on
//! helper threads so a chatty child cannot deadlock on a full pipe.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use crate::context::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Output of a finished subprocess
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Captured {
    /// Trimmed, lossily decoded stderr
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Why a subprocess did not produce output
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot start `{program}`: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error while waiting for subprocess: {0}")]
    Io(#[from] io::Error),
}

/// Run `command` to completion.
///
/// `stdin` is written to the child and then closed; with `None` the child
/// gets an empty stdin. The child runs in its own process group. When
/// `timeout` elapses or `cancel` trips, the whole group is killed, including
/// anything the child started in the background. Once the child exits, any
/// process it left behind is killed too.
pub fn run(
    mut command: Command,
    stdin: Option<Vec<u8>>,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<Captured, RunError> {
    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }

    let program = command.get_program().to_string_lossy().into_owned();
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    debug!("Spawning {:?}", command);
    let mut child = command
        .spawn()
        .map_err(|source| RunError::Spawn { program, source })?;
    let deadline = Deadline::new(timeout);

    let writer = match (stdin, child.stdin.take()) {
        (Some(data), Some(mut pipe)) => Some(thread::spawn(move || {
            // The child may exit without reading everything
            match pipe.write_all(&data) {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        })),
        _ => None,
    };
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait(&mut child, &deadline, cancel)?;
    kill_group(child.id());

    // A process that left the group may still hold the pipes open
    let done = || {
        writer.as_ref().is_none_or(JoinHandle::is_finished)
            && stdout.as_ref().is_none_or(JoinHandle::is_finished)
            && stderr.as_ref().is_none_or(JoinHandle::is_finished)
    };
    poll_until(done, child.id(), &deadline, cancel)?;

    if let Some(writer) = writer {
        writer
            .join()
            .map_err(|_| io::Error::other("stdin writer panicked"))??;
    }

    Ok(Captured {
        status,
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    })
}

/// Optional point in time after which the invocation is abandoned
struct Deadline(Option<(Instant, Duration)>);

impl Deadline {
    fn new(timeout: Option<Duration>) -> Self {
        Self(timeout.map(|t| (Instant::now() + t, t)))
    }

    /// The configured timeout, if it has elapsed
    fn expired(&self) -> Option<Duration> {
        self.0
            .and_then(|(at, timeout)| (Instant::now() >= at).then_some(timeout))
    }
}

fn wait(child: &mut Child, deadline: &Deadline, cancel: &CancelToken) -> Result<ExitStatus, RunError> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if cancel.is_cancelled() {
            terminate(child);
            return Err(RunError::Cancelled);
        }
        if let Some(timeout) = deadline.expired() {
            terminate(child);
            return Err(RunError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Poll `done` under the same deadline and cancel token as the child.
///
/// The child has already been reaped. Helper threads still blocked on a pipe
/// are detached when this gives up.
fn poll_until(
    done: impl Fn() -> bool,
    pid: u32,
    deadline: &Deadline,
    cancel: &CancelToken,
) -> Result<(), RunError> {
    while !done() {
        if cancel.is_cancelled() {
            kill_group(pid);
            return Err(RunError::Cancelled);
        }
        if let Some(timeout) = deadline.expired() {
            kill_group(pid);
            return Err(RunError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}

fn terminate(child: &mut Child) {
    debug!("Killing subprocess {}", child.id());
    kill_group(child.id());
    // Already exited is fine; the reap below still runs
    let _ = child.kill();
    let _ = child.wait();
}

/// Kill the process group led by `pid`. A group that is already gone is fine.
#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(pid) else {
        return;
    };
    if killpg(Pid::from_raw(pid), Signal::SIGKILL).is_ok() {
        debug!("Killed process group {}", pid);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("output reader panicked"))?,
        None => Ok(Vec::new()),
    }
}
