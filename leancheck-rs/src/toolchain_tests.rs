use crate::toolchain::compiled_artifact_path;
use std::path::Path;

#[test]
fn artifact_path_swaps_extension() {
    assert_eq!(
        compiled_artifact_path(Path::new("proofs/a.lean")),
        Path::new("proofs/a.olean")
    );
    assert_eq!(
        compiled_artifact_path(Path::new("targs/a_targ.lean")),
        Path::new("targs/a_targ.olean")
    );
}

#[test]
fn artifact_path_keeps_dotted_stems_intact() {
    assert_eq!(
        compiled_artifact_path(Path::new("a.b.lean")),
        Path::new("a.b.olean")
    );
}

#[cfg(unix)]
mod deadline {
    use crate::toolchain::run_with_deadline;
    use std::process::Command;
    use std::time::Duration;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    #[test]
    fn fast_child_finishes_normally() {
        let out = run_with_deadline(sh("exit 0"), Duration::from_secs(5)).unwrap();
        assert!(out.ok);
        assert!(!out.timed_out);
    }

    #[test]
    fn failing_child_is_reported_not_timed_out() {
        let out = run_with_deadline(sh("echo oops >&2; exit 3"), Duration::from_secs(5)).unwrap();
        assert!(!out.ok);
        assert!(!out.timed_out);
        assert!(out.diagnostic.contains("oops"));
    }

    #[test]
    fn diagnostic_puts_stderr_before_stdout() {
        let out =
            run_with_deadline(sh("echo on-stdout; echo on-stderr >&2"), Duration::from_secs(5))
                .unwrap();
        assert!(out.ok);
        let err_at = out.diagnostic.find("on-stderr").unwrap();
        let out_at = out.diagnostic.find("on-stdout").unwrap();
        assert!(err_at < out_at);
    }

    #[test]
    fn slow_child_is_killed_and_marked() {
        let out = run_with_deadline(sh("sleep 30"), Duration::from_millis(100)).unwrap();
        assert!(!out.ok);
        assert!(out.timed_out);
        assert!(out.diagnostic.contains("was killed"));
    }

    #[test]
    fn output_before_the_deadline_is_kept() {
        let out =
            run_with_deadline(sh("echo partial; sleep 30"), Duration::from_millis(200)).unwrap();
        assert!(out.timed_out);
        assert!(out.diagnostic.contains("partial"));
    }
}
