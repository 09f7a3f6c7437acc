//! External proof-checker invocations behind an injectable seam.
//!
//! The driver in [`crate::verify`] only ever talks to a [`Toolchain`].
//! Production binds it to the `lake` build environment (`lake env lean` for
//! compilation, `lake env safe_verify` for artifact comparison); tests bind
//! it to deterministic fakes, which gives the per-file state machine full
//! coverage without any external tools installed.
//!
//! Invocations are synchronous. With no deadline configured each call
//! blocks until the child exits; with a deadline the child is polled and
//! killed once the deadline passes, and the outcome is marked timed out.

use crate::stub::LEAN_SUFFIX;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Extension of compiled proof artifacts, with the leading dot.
pub const OLEAN_SUFFIX: &str = ".olean";

/// Interval at which a deadline-bounded child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of one external invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Whether the tool reported success (zero exit status).
    pub ok: bool,
    /// Whether the invocation was killed for exceeding the deadline.
    pub timed_out: bool,
    /// Captured stderr followed by stdout, verbatim.
    pub diagnostic: String,
}

/// Capability interface over the two external tools.
pub trait Toolchain {
    /// Compiles `input`, asking the compiler to place the artifact at
    /// `output`. `Err` means the tool could not be invoked at all;
    /// tool-reported failure comes back as `Ok` with `ok: false`.
    fn compile(&self, input: &Path, output: &Path) -> io::Result<ToolOutput>;

    /// Compares two compiled artifacts, target stub first.
    fn compare(&self, targ: &Path, original: &Path) -> io::Result<ToolOutput>;
}

/// Compiled-artifact path for an input path: same stem, `.olean` extension.
#[must_use]
pub fn compiled_artifact_path(input: &Path) -> PathBuf {
    match input.to_str().and_then(|s| s.strip_suffix(LEAN_SUFFIX)) {
        Some(stem) => PathBuf::from(format!("{stem}{OLEAN_SUFFIX}")),
        None => input.with_extension("olean"),
    }
}

/// Production toolchain invoking tools through the `lake` environment.
#[derive(Debug, Clone, Default)]
pub struct LakeToolchain {
    timeout: Option<Duration>,
}

impl LakeToolchain {
    /// A toolchain whose invocations block until the child exits.
    #[must_use]
    pub fn new() -> Self {
        LakeToolchain { timeout: None }
    }

    /// A toolchain that bounds every invocation by `timeout`. A child still
    /// running at the deadline is killed and reported as timed out.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        LakeToolchain {
            timeout: Some(timeout),
        }
    }

    fn base() -> Command {
        let mut command = Command::new("lake");
        command.arg("env");
        command
    }

    fn run(&self, mut command: Command) -> io::Result<ToolOutput> {
        match self.timeout {
            None => {
                let out = command.output()?;
                Ok(ToolOutput {
                    ok: out.status.success(),
                    timed_out: false,
                    diagnostic: capture(&out.stderr, &out.stdout),
                })
            }
            Some(timeout) => run_with_deadline(command, timeout),
        }
    }
}

impl Toolchain for LakeToolchain {
    fn compile(&self, input: &Path, output: &Path) -> io::Result<ToolOutput> {
        let mut command = Self::base();
        command.arg("lean").arg("-o").arg(output).arg(input);
        self.run(command)
    }

    fn compare(&self, targ: &Path, original: &Path) -> io::Result<ToolOutput> {
        let mut command = Self::base();
        command.arg("safe_verify").arg(targ).arg(original);
        self.run(command)
    }
}

fn capture(stderr: &[u8], stdout: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(stdout));
    text
}

/// Runs `command` with piped output streams, killing the child if it is
/// still alive when the deadline passes. Both streams are drained by
/// reader threads so a chatty child cannot deadlock on a full pipe.
pub(crate) fn run_with_deadline(mut command: Command, timeout: Duration) -> io::Result<ToolOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr not captured"))?;
    let stdout_reader = thread::spawn(move || drain(stdout));
    let stderr_reader = thread::spawn(move || drain(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break Some(status),
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let err_bytes = stderr_reader.join().unwrap_or_default();
    let out_bytes = stdout_reader.join().unwrap_or_default();
    let mut diagnostic = capture(&err_bytes, &out_bytes);

    match status {
        Some(status) => Ok(ToolOutput {
            ok: status.success(),
            timed_out: false,
            diagnostic,
        }),
        None => {
            diagnostic.push_str(&format!(
                "\nError: invocation did not finish within {timeout:?} and was killed."
            ));
            Ok(ToolOutput {
                ok: false,
                timed_out: true,
                diagnostic,
            })
        }
    }
}

fn drain(mut pipe: impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    buf
}
