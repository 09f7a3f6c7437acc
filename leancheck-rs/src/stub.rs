//! The stub generator: derives "target" files from Lean proof sources.
//!
//! A target (`targ`) file is a proof source truncated at its first `:=`
//! marker with the proof body replaced by `by sorry`, leaving only the
//! obligation's signature. Targets land in a `targs` subdirectory next to
//! the sources and are consumed by the driver in [`crate::verify`].
//!
//! Only the first marker occurrence is used even when a file contains
//! several definitions; each source is assumed to carry exactly one
//! top-level obligation of interest.

use crate::diag::DriverError;
use itertools::Itertools;
use log::{error, info};
use std::fs;
use std::io;
use std::path::Path;

/// Extension of proof-source files, with the leading dot.
pub const LEAN_SUFFIX: &str = ".lean";
/// Subdirectory receiving generated target files.
pub const TARGS_DIR: &str = "targs";
/// Placeholder proof directive appended to each truncated signature.
pub const STUB_SUFFIX: &str = " := by sorry";

/// Marker separating a declaration's signature from its body.
const MARKER: &str = ":=";

/// Counts reported by [`generate_targs`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StubSummary {
    /// Files for which a target was written.
    pub processed: usize,
    /// Total `.lean` candidates found in the directory.
    pub candidates: usize,
}

/// Stub content for one source, or `None` when the source has no marker.
///
/// The result is the source's prefix up to (excluding) the first `:=`,
/// byte for byte, followed by [`STUB_SUFFIX`].
#[must_use]
pub fn stub_content(source: &str) -> Option<String> {
    let ix = source.find(MARKER)?;
    let mut stub = String::with_capacity(ix + STUB_SUFFIX.len());
    stub.push_str(&source[..ix]);
    stub.push_str(STUB_SUFFIX);
    Some(stub)
}

/// Target file name for a source file name: `foo.lean` becomes
/// `foo_targ.lean`. Returns `None` for names without the `.lean` extension.
#[must_use]
pub fn targ_file_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(LEAN_SUFFIX)?;
    Some(format!("{stem}_targ{LEAN_SUFFIX}"))
}

/// Lists the names of `.lean` files directly under `dir`, sorted so batch
/// order and summaries are deterministic.
pub(crate) fn lean_files(dir: &Path) -> io::Result<Vec<String>> {
    Ok(fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(LEAN_SUFFIX))
        .sorted()
        .collect())
}

/// Derives a target file for every `.lean` source in `dir`, overwriting any
/// previously generated target.
///
/// Creates `dir/targs` when absent. Sources without a `:=` marker are
/// skipped silently; a per-file I/O failure is reported on the console and
/// skips that file without aborting the batch. Neither kind of skip counts
/// toward `processed`.
pub fn generate_targs(dir: &Path) -> Result<StubSummary, DriverError> {
    if !dir.is_dir() {
        return Err(DriverError::NotADirectory(dir.to_owned()));
    }

    let targs_dir = dir.join(TARGS_DIR);
    if !targs_dir.exists() {
        fs::create_dir_all(&targs_dir)?;
        info!("created directory {}", targs_dir.display());
    }

    let candidates = lean_files(dir)?;
    let mut summary = StubSummary {
        processed: 0,
        candidates: candidates.len(),
    };

    for name in &candidates {
        // lean_files only yields `.lean` names, so this cannot fail
        let Some(targ_name) = targ_file_name(name) else {
            continue;
        };
        match write_targ(&dir.join(name), &targs_dir.join(&targ_name)) {
            Ok(true) => {
                summary.processed += 1;
                info!("processed {name} -> {targ_name}");
            }
            Ok(false) => info!("skipped {name} (no '{MARKER}' found)"),
            Err(err) => error!("error processing {name}: {err}"),
        }
    }

    Ok(summary)
}

fn write_targ(input: &Path, output: &Path) -> io::Result<bool> {
    let content = fs::read_to_string(input)?;
    match stub_content(&content) {
        Some(stub) => {
            fs::write(output, stub)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
