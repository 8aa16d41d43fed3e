//! Process runner: executes the interpreter against one fixture and captures its streams.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::diagnostics::{HarnessError, Result};

/// Argument-template token replaced by the fixture path.
pub const FIXTURE_PLACEHOLDER: &str = "{fixture}";

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to keep reading pipes once the interpreter is gone. Descendants that inherited
/// the pipes can hold them open indefinitely.
const PIPE_GRACE: Duration = Duration::from_millis(250);

/// How to invoke the interpreter under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub executable: String,
    /// Argument template. Occurrences of `{fixture}` are replaced by the fixture path;
    /// without a placeholder the path is appended as the last argument.
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

/// What one interpreter run produced. Never mutated after capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Exited { code: i32 },
    Signaled { signal: i32 },
    Unknown,
}

impl From<ExitStatus> for ProcessStatus {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ProcessStatus::Exited { code };
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ProcessStatus::Signaled { signal };
            }
        }
        ProcessStatus::Unknown
    }
}

/// Result of a run that did not hit a harness-fatal condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(CapturedOutput),
    TimedOut {
        after: Duration,
        stdout: String,
        stderr: String,
    },
}

impl Interpreter {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Expands the argument template for `fixture`.
    pub fn arguments_for(&self, fixture: &Path) -> Vec<String> {
        let path = fixture.display().to_string();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(FIXTURE_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(FIXTURE_PLACEHOLDER, &path)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(path);
        }
        args
    }

    /// Runs the interpreter on `fixture`, waiting at most the configured timeout.
    ///
    /// On unix the interpreter leads its own process group, so a timeout also kills any
    /// processes a launcher script started without `exec`.
    pub fn run(&self, fixture: &Path) -> Result<RunOutcome> {
        let args = self.arguments_for(fixture);
        debug!(executable = %self.executable, ?args, "spawning interpreter");

        let mut command = Command::new(&self.executable);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
            executable: self.executable.clone(),
            source,
        })?;

        let stdout = drain(child.stdout.take(), "stdout");
        let stderr = drain(child.stderr.take(), "stderr");

        let start = Instant::now();
        let waited = self.wait(&mut child, fixture, start);
        let pipe_deadline = match (&waited, self.timeout) {
            (Ok(None), _) => Some(Instant::now() + PIPE_GRACE),
            (_, Some(timeout)) => Some((start + timeout).max(Instant::now() + PIPE_GRACE)),
            (_, None) => None,
        };
        let stdout = collect(stdout, pipe_deadline);
        let stderr = collect(stderr, pipe_deadline);

        match waited? {
            None => {
                let after = self.timeout.unwrap_or_default();
                warn!(fixture = %fixture.display(), ?after, "interpreter timed out");
                Ok(RunOutcome::TimedOut {
                    after,
                    stdout,
                    stderr,
                })
            }
            Some(ProcessStatus::Exited { code }) => Ok(RunOutcome::Completed(CapturedOutput {
                stdout,
                stderr,
                exit_code: code,
            })),
            Some(ProcessStatus::Signaled { signal }) => Err(HarnessError::Signaled {
                path: fixture.to_path_buf(),
                signal,
            }),
            Some(ProcessStatus::Unknown) => Err(HarnessError::UnknownStatus {
                path: fixture.to_path_buf(),
            }),
        }
    }

    /// Waits for the child; `None` means it was killed after the timeout.
    fn wait(
        &self,
        child: &mut Child,
        fixture: &Path,
        start: Instant,
    ) -> Result<Option<ProcessStatus>> {
        let wait_error = |source| HarnessError::Wait {
            path: fixture.to_path_buf(),
            source,
        };

        let Some(timeout) = self.timeout else {
            let status = child.wait().map_err(wait_error)?;
            return Ok(Some(status.into()));
        };

        loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                return Ok(Some(status.into()));
            }
            if start.elapsed() >= timeout {
                kill_process_group(child);
                // The child may exit between try_wait and kill.
                let _ = child.kill();
                child.wait().map_err(wait_error)?;
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Kills every process in the child's group, not just the child.
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    // The shell builtin accepts a negative pid as a process group everywhere `sh` exists.
    let killed = Command::new("sh")
        .arg("-c")
        .arg(format!("kill -KILL -{}", child.id()))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match killed {
        Ok(status) if status.success() => {}
        Ok(status) => debug!(pid = child.id(), %status, "process group kill reported failure"),
        Err(e) => warn!(pid = child.id(), error = %e, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

/// Streams a pipe into a channel chunk by chunk, so a reader can give up on it without
/// losing what already arrived.
fn drain<R: Read + Send + 'static>(
    pipe: Option<R>,
    stream: &'static str,
) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(stream, error = %e, "interpreter output read failed; capture is partial");
                        break;
                    }
                }
            }
        });
        rx
    })
}

/// Gathers drained bytes until the pipe closes or `deadline` passes.
fn collect(rx: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> String {
    let Some(rx) = rx else {
        return String::new();
    };
    let mut bytes = Vec::new();
    loop {
        let chunk = match deadline {
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        };
        match chunk {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                debug!("pipe still open after the interpreter ended; abandoning it");
                break;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
