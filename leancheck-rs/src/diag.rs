//! Failure classification and the durable error log.
//!
//! Every terminal per-file failure in the verification driver is reduced to
//! a [`VerificationRecord`] and appended as one line of newline-delimited
//! JSON to a log in the batch directory. The log is strictly additive: this
//! crate never reads, rewrites, or truncates it, so records from earlier
//! runs survive.

use serde::Serialize;
use std::error;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the durable failure log within the batch directory.
pub const ERROR_LOG_NAME: &str = "verification_errors.jsonl";

/// The stage at which a file's processing terminally failed.
///
/// The serialized tags are the ones written to the log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The original proof file did not compile.
    CompileOriginal,
    /// The derived target stub did not compile.
    CompileTarget,
    /// A compiled artifact was missing when verification was about to start.
    VerificationPrep,
    /// The comparator rejected the artifact pair.
    Verification,
    /// An I/O fault escaped the per-file state machine.
    Exception,
    /// An external invocation exceeded the configured deadline.
    Timeout,
}

impl Stage {
    /// The tag this stage serializes to.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Stage::CompileOriginal => "compile_original",
            Stage::CompileTarget => "compile_target",
            Stage::VerificationPrep => "verification_prep",
            Stage::Verification => "verification",
            Stage::Exception => "exception",
            Stage::Timeout => "timeout",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One appended line of the failure log.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationRecord {
    /// Source file name (not the full path).
    pub file: String,
    /// Stage at which processing failed.
    pub stage: Stage,
    /// Verbatim diagnostic text; may be empty or span multiple lines.
    pub error: String,
}

/// Append-only writer for the JSONL failure log.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    /// A log writing to [`ERROR_LOG_NAME`] under `dir`. The file itself is
    /// only created on the first append, so a clean run leaves no log.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        ErrorLog {
            path: dir.join(ERROR_LOG_NAME),
        }
    }

    /// The on-disk location of the log.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a single JSON line.
    pub fn append(&self, record: &VerificationRecord) -> Result<(), DriverError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// The error type for directory-level failures in both batch components.
///
/// Per-file failures never surface here; they are contained by the driver
/// and recorded in the log. Only precondition violations and faults that
/// break the run as a whole (such as an unwritable log) use this type.
#[derive(Debug)]
pub enum DriverError {
    /// The given batch path does not exist or is not a directory.
    NotADirectory(PathBuf),
    /// The batch directory has no `targs` subdirectory to verify against.
    MissingTargs(PathBuf),
    /// IO error outside the per-file containment boundary.
    Io(io::Error),
    /// A failure record could not be serialized for the log.
    Log(serde_json::Error),
}

impl From<io::Error> for DriverError {
    fn from(err: io::Error) -> DriverError {
        DriverError::Io(err)
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> DriverError {
        DriverError::Log(err)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::NotADirectory(path) => {
                write!(f, "directory '{}' not found", path.display())
            }
            DriverError::MissingTargs(path) => write!(
                f,
                "'targs' directory not found at {}; run the stub generator first",
                path.display()
            ),
            DriverError::Io(err) => write!(f, "IO error: {err}"),
            DriverError::Log(err) => write!(f, "error log serialization failed: {err}"),
        }
    }
}

impl error::Error for DriverError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DriverError::Io(err) => Some(err),
            DriverError::Log(err) => Some(err),
            _ => None,
        }
    }
}
