//! The verification driver itself.
//!
//! For every proof source paired with a generated target stub, both files
//! are compiled through the external toolchain and the two compiled
//! artifacts are cross-verified. Failures are classified per stage and
//! appended to the durable log in [`crate::diag`]; no single file's failure
//! stops the batch.
//!
//! Compilation is memoized per input path for the duration of one run. The
//! memo caches the full outcome, not just the fact of an attempt, so a path
//! referenced by several pairings is compiled exactly once and a cached
//! failure is re-reported against every pairing that needs it.
//!
//! Execution is fully sequential; each external invocation blocks until
//! the subprocess exits (or, with a configured deadline, until it is
//! killed). Because nothing runs concurrently, the append-only log needs
//! no locking.

use crate::diag::{DriverError, ErrorLog, Stage, VerificationRecord};
use crate::stub::{lean_files, targ_file_name, TARGS_DIR};
use crate::toolchain::{compiled_artifact_path, ToolOutput, Toolchain};
use crate::util::{preview, HashMap};
use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};

/// Counts reported by [`verify_directory`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifySummary {
    /// Files that reached the verification stage (even if it failed).
    pub processed: usize,
    /// Total `.lean` candidates found in the directory.
    pub candidates: usize,
    /// Files skipped because no target stub was present.
    pub skipped: usize,
    /// Failure records appended to the log during this run.
    pub errors: usize,
    /// Location of the failure log.
    pub log_path: PathBuf,
}

/// Memoized outcome of compiling one input path.
#[derive(Debug, Clone)]
pub(crate) struct CompileOutcome {
    pub(crate) ok: bool,
    pub(crate) timed_out: bool,
    pub(crate) diagnostic: String,
}

impl CompileOutcome {
    fn stage(&self, stage: Stage) -> Stage {
        if self.timed_out {
            Stage::Timeout
        } else {
            stage
        }
    }
}

/// Per-run driver state: the toolchain, the compilation memo, and the log.
pub(crate) struct Driver<'a, T: Toolchain> {
    toolchain: &'a T,
    memo: HashMap<PathBuf, CompileOutcome>,
    log: ErrorLog,
    errors: usize,
}

impl<'a, T: Toolchain> Driver<'a, T> {
    pub(crate) fn new(toolchain: &'a T, log: ErrorLog) -> Self {
        Driver {
            toolchain,
            memo: HashMap::default(),
            log,
            errors: 0,
        }
    }

    /// Appends one failure record, narrating a truncated preview.
    fn record(&mut self, file: &str, stage: Stage, error: String) -> Result<(), DriverError> {
        warn!("{file}: {stage} failed: {}", preview(&error));
        self.log.append(&VerificationRecord {
            file: file.to_owned(),
            stage,
            error,
        })?;
        self.errors += 1;
        Ok(())
    }

    /// Compiles `input` unless an outcome for it is already memoized.
    ///
    /// Success requires both a zero exit status and the output artifact
    /// existing on disk afterwards; a zero exit with a missing artifact is
    /// downgraded to failure with a note appended to the diagnostic. The
    /// outcome is memoized either way, so one run invokes the compiler at
    /// most once per path.
    pub(crate) fn compile_step(&mut self, input: &Path) -> io::Result<CompileOutcome> {
        if let Some(cached) = self.memo.get(input) {
            info!(
                "skipping compilation for {} (already compiled)",
                input.display()
            );
            return Ok(cached.clone());
        }

        info!("compiling {}", input.display());
        let artifact = compiled_artifact_path(input);
        let out = self.toolchain.compile(input, &artifact)?;
        let outcome = check_artifact(out, &artifact);
        self.memo.insert(input.to_owned(), outcome.clone());
        Ok(outcome)
    }

    /// Runs the per-file state machine; terminal on the first failing
    /// stage. Returns whether the file counted as processed, which it does
    /// exactly when the verification stage was reached.
    fn process_file(
        &mut self,
        name: &str,
        original_path: &Path,
        targ_path: &Path,
    ) -> Result<bool, DriverError> {
        let outcome = match self.compile_step(original_path) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.record(name, Stage::Exception, err.to_string())?;
                return Ok(false);
            }
        };
        if !outcome.ok {
            let stage = outcome.stage(Stage::CompileOriginal);
            self.record(name, stage, outcome.diagnostic)?;
            return Ok(false);
        }

        let outcome = match self.compile_step(targ_path) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.record(name, Stage::Exception, err.to_string())?;
                return Ok(false);
            }
        };
        if !outcome.ok {
            let stage = outcome.stage(Stage::CompileTarget);
            self.record(name, stage, outcome.diagnostic)?;
            return Ok(false);
        }

        // both compiles succeeded; double-check the artifacts are in place
        let original_olean = compiled_artifact_path(original_path);
        let targ_olean = compiled_artifact_path(targ_path);
        for artifact in [&original_olean, &targ_olean] {
            if !artifact.exists() {
                let error = format!(
                    "Error: compiled artifact '{}' does not exist after compilation.",
                    artifact.display()
                );
                self.record(name, Stage::VerificationPrep, error)?;
                return Ok(false);
            }
        }

        info!("verifying {name} against {}", targ_olean.display());
        let out = match self.toolchain.compare(&targ_olean, &original_olean) {
            Ok(out) => out,
            Err(err) => {
                self.record(name, Stage::Exception, err.to_string())?;
                return Ok(false);
            }
        };
        self.finish_verification(name, out)?;
        Ok(true)
    }

    fn finish_verification(&mut self, name: &str, out: ToolOutput) -> Result<(), DriverError> {
        if out.timed_out {
            self.record(name, Stage::Timeout, out.diagnostic)
        } else if !out.ok {
            self.record(name, Stage::Verification, out.diagnostic)
        } else {
            info!("successfully verified {name}");
            Ok(())
        }
    }
}

/// Compiles and cross-verifies every source/target pair under `dir`.
///
/// Preconditions, checked before any per-file work: `dir` is a directory
/// and contains a `targs` subdirectory populated by
/// [`crate::stub::generate_targs`]. Sources without a stub are skipped
/// with a console message and no record. Every terminal per-file failure
/// appends exactly one record to `dir/verification_errors.jsonl` and the
/// batch continues with the next file.
pub fn verify_directory(
    dir: &Path,
    toolchain: &impl Toolchain,
) -> Result<VerifySummary, DriverError> {
    if !dir.is_dir() {
        return Err(DriverError::NotADirectory(dir.to_owned()));
    }
    let targs_dir = dir.join(TARGS_DIR);
    if !targs_dir.is_dir() {
        return Err(DriverError::MissingTargs(targs_dir));
    }

    let candidates = lean_files(dir)?;
    info!("found {} .lean files to process", candidates.len());

    let log = ErrorLog::new(dir);
    let mut summary = VerifySummary {
        candidates: candidates.len(),
        log_path: log.path().to_owned(),
        ..VerifySummary::default()
    };
    let mut driver = Driver::new(toolchain, log);

    for name in &candidates {
        info!("processing {name}");
        // lean_files only yields `.lean` names, so this cannot fail
        let Some(targ_name) = targ_file_name(name) else {
            continue;
        };
        let targ_path = targs_dir.join(&targ_name);
        if !targ_path.exists() {
            info!("skipping {name}: target file {targ_name} not found in {TARGS_DIR}/");
            summary.skipped += 1;
            continue;
        }

        if driver.process_file(name, &dir.join(name), &targ_path)? {
            summary.processed += 1;
        }
    }

    summary.errors = driver.errors;
    Ok(summary)
}

/// Downgrades a zero-exit compile with a missing artifact to failure,
/// noting the missing path in the diagnostic.
fn check_artifact(out: ToolOutput, artifact: &Path) -> CompileOutcome {
    let mut outcome = CompileOutcome {
        ok: out.ok,
        timed_out: out.timed_out,
        diagnostic: out.diagnostic,
    };
    if outcome.ok && !artifact.exists() {
        outcome.ok = false;
        outcome.diagnostic.push_str(&format!(
            "\nError: output file '{}' was not created.",
            artifact.display()
        ));
    }
    outcome
}
