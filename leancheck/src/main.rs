//! Command-line front end for the Lean batch verification workflow.
//! `targs` derives target stubs from proof sources; `verify` compiles both
//! sides of each pairing and cross-checks the compiled artifacts.

use clap::Parser;
use leancheck_rs::{generate_targs, verify_directory, DriverError, LakeToolchain};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::time::Duration;

/// A batch compiler and cross-verifier for Lean proof obligations
#[derive(Debug, clap::Parser)]
#[command(version, about, verbatim_doc_comment)]
struct Cli {
    /// Activates debug logs
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Derives a target stub for every `.lean` source in the directory
    Targs {
        /// Directory containing the proof sources
        dir: PathBuf,
    },
    /// Compiles every source and its stub, then cross-verifies the artifacts
    Verify {
        /// Directory containing the proof sources and their `targs` subdirectory
        dir: PathBuf,
        /// Kills any external invocation still running after this many seconds
        #[arg(long, value_name("SECS"))]
        timeout: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init().unwrap();

    let code = match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    };
    std::process::exit(code);
}

fn run(command: Command) -> Result<i32, DriverError> {
    match command {
        Command::Targs { dir } => {
            let summary = generate_targs(&dir)?;
            println!(
                "Summary: processed {} out of {} .lean files.",
                summary.processed, summary.candidates
            );
            Ok(0)
        }
        Command::Verify { dir, timeout } => {
            let toolchain = match timeout {
                Some(secs) => LakeToolchain::with_timeout(Duration::from_secs(secs)),
                None => LakeToolchain::new(),
            };
            let summary = verify_directory(&dir, &toolchain)?;
            println!(
                "Summary: processed {} out of {} .lean files.",
                summary.processed, summary.candidates
            );
            if summary.errors > 0 {
                println!(
                    "Encountered {} errors. Check {} for details.",
                    summary.errors,
                    summary.log_path.display()
                );
            }
            Ok(i32::from(summary.errors > 0))
        }
    }
}
