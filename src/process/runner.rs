//! The process-spawning chokepoint. Every script execution (Auto, External,
//! SelfExec, and External tests) flows through a [`ProcessRunner`].
//!
//! Grounded on the teacher crate's `execution::OsRun` / `Executor`: a
//! trait abstracting "perform this subprocess operation", with a default
//! OS-backed implementation, so that classification/materialization logic
//! can be unit-tested without actually spawning real programs when that
//! matters (tests here instead favor real small binaries like `/bin/echo`
//! since that is closer to the spec's own worked examples, but the trait
//! seam is kept for completeness).

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::os::fd::FromRawFd;
use std::os::unix::io::AsRawFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::ScriptFsError;

/// Outcome of running a child to completion. Abnormal termination
/// (signal, non-zero exit) is not an error from the runner's point of
/// view — spec.md §4.1/§7 treat it as "a nonzero status", not a fatal
/// condition; only a failure to fork/exec at all is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub code: i32,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Abstraction over "spawn a program with optional piped stdin and
/// captured stdout". `argv` is the full argument list, including
/// `argv[0]`.
pub trait ProcessRunner {
    /// Runs `program` with `argv` (argv[0] included) in `dir` (defaulting
    /// to the process's own cwd if `None`). If `stdout` is `Some`, the
    /// child's stdout is redirected to it; otherwise it is redirected to
    /// this process's own stderr so a misbehaving script cannot corrupt
    /// the filesystem's own stdout. If `stdin_source` is `Some`, that
    /// file's bytes are streamed into the child's stdin; opening it is
    /// best-effort — failure degrades to closed stdin rather than
    /// aborting the run, per spec.md §4.1.
    fn run(
        &self,
        program: &Path,
        argv: &[OsString],
        dir: Option<&Path>,
        stdout: Option<&File>,
        stdin_source: Option<&Path>,
    ) -> Result<ExitOutcome, ScriptFsError>;
}

/// Duplicates a raw fd into an owned [`File`], for handing to
/// [`Stdio::from`] without taking ownership of the original (e.g.
/// `stderr()`'s fd, which must stay open for the rest of the process).
fn dup_fd(fd: std::os::unix::io::RawFd) -> std::io::Result<File> {
    let dup = unsafe { libc::dup(fd) };
    if dup < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(unsafe { File::from_raw_fd(dup) })
}

/// The default, OS-backed [`ProcessRunner`].
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        program: &Path,
        argv: &[OsString],
        dir: Option<&Path>,
        stdout: Option<&File>,
        stdin_source: Option<&Path>,
    ) -> Result<ExitOutcome, ScriptFsError> {
        let mut cmd = Command::new(program);
        // argv includes argv[0]; Command::arg0 overrides the displayed
        // name while `args` supplies the tail the child actually sees.
        if let Some(arg0) = argv.first() {
            cmd.arg0(arg0);
        }
        cmd.args(argv.iter().skip(1));
        if let Some(d) = dir {
            cmd.current_dir(d);
        }

        match stdout {
            Some(fd) => {
                let dup = fd.try_clone().map_err(|e| ScriptFsError::Spawn {
                    program: program.to_path_buf(),
                    source: e,
                })?;
                cmd.stdout(Stdio::from(dup));
            }
            None => {
                // spec.md §4.1: absent a caller-supplied fd, the child's
                // stdout is redirected to *our* stderr, not inherited as
                // stdout — a misbehaving script must not be able to
                // write bytes onto the filesystem process's own stdout.
                let stderr_dup = dup_fd(std::io::stderr().as_raw_fd()).map_err(|e| ScriptFsError::Spawn {
                    program: program.to_path_buf(),
                    source: e,
                })?;
                cmd.stdout(Stdio::from(stderr_dup));
            }
        }
        cmd.stderr(Stdio::inherit());

        let stdin_bytes = stdin_source.and_then(|p| match std::fs::read(p) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(path = ?p, error = %e, "stdin source unreadable, running with closed stdin");
                None
            }
        });

        cmd.stdin(if stdin_bytes.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(|e| ScriptFsError::Spawn {
            program: program.to_path_buf(),
            source: e,
        })?;

        if let Some(bytes) = stdin_bytes {
            if let Some(mut child_stdin) = child.stdin.take() {
                // Best-effort: a child that exits early (closing its end
                // of the pipe) should not turn the whole run into an
                // error; only the fork/exec step above is fatal.
                let _ = child_stdin.write_all(&bytes);
                drop(child_stdin);
            }
        }

        let status = child.wait().map_err(|e| ScriptFsError::Spawn {
            program: program.to_path_buf(),
            source: e,
        })?;

        let code = status.code().unwrap_or(-1);
        debug!(?program, ?argv, code, "child exited");
        Ok(ExitOutcome { code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn runs_and_captures_exit_code() {
        let runner = SystemRunner;
        let outcome = runner
            .run(&PathBuf::from("/bin/true"), &[OsString::from("true")], None, None, None)
            .unwrap();
        assert!(outcome.success());
    }

    #[test]
    fn nonzero_exit_is_not_an_error() {
        let runner = SystemRunner;
        let outcome = runner
            .run(&PathBuf::from("/bin/false"), &[OsString::from("false")], None, None, None)
            .unwrap();
        assert!(!outcome.success());
    }
}
