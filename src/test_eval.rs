//! Evaluates a [`Test`] against a mirror-relative path (spec.md §4.4).

use std::path::Path;

use nix::fcntl::AtFlags;
use nix::unistd::{faccessat, AccessFlags};
use regex::Regex;

use crate::config::{relative_path_string, Persistent};
use crate::procedure::Test;
use crate::process::ProcessRunner;

/// First two bytes that mark a script's shebang line.
const SHEBANG: &[u8; 2] = b"#!";

pub fn matches(
    persistent: &Persistent,
    runner: &dyn ProcessRunner,
    test: &Test,
    relative: &Path,
) -> anyhow::Result<bool> {
    match test {
        Test::Always => Ok(true),
        Test::Executable => is_executable(persistent, relative),
        Test::ShebangOrExecutable => {
            Ok(starts_with_shebang(persistent, relative)? || is_executable(persistent, relative)?)
        }
        Test::Pattern { regex } => {
            let re = Regex::new(regex)?;
            Ok(re.is_match(&relative_path_string(relative)))
        }
        Test::External { command, filter } => {
            run_external_test(persistent, runner, command, *filter, relative)
        }
    }
}

fn is_executable(persistent: &Persistent, relative: &Path) -> anyhow::Result<bool> {
    match faccessat(
        Some(persistent.root_fd_raw()),
        relative,
        AccessFlags::X_OK,
        AtFlags::empty(),
    ) {
        Ok(()) => Ok(true),
        Err(nix::Error::EACCES) | Err(nix::Error::ENOENT) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn starts_with_shebang(persistent: &Persistent, relative: &Path) -> anyhow::Result<bool> {
    use std::io::Read;
    let abs = persistent.absolute(relative);
    let mut file = match std::fs::File::open(&abs) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    // Only a regular file can start with a shebang line. `classify` runs
    // unconditionally from `getattr`/`access` under the default `-p auto`
    // procedure, including on directories (e.g. the mount root itself);
    // opening a directory succeeds but reading it would fail with
    // EISDIR, which must not turn a plain `stat`/`ls` into an error.
    if !file.metadata()?.is_file() {
        return Ok(false);
    }
    let mut buf = [0u8; 2];
    let n = file.read(&mut buf)?;
    Ok(n == 2 && &buf == SHEBANG)
}

/// Spawns an External test's command, substituting `!` with the
/// *virtual* path (not a temp copy — spec.md §4.4's deliberate asymmetry
/// with program invocation), or piping the mirror file's bytes on stdin
/// when there is no placeholder. Exit code 0 means match.
fn run_external_test(
    persistent: &Persistent,
    runner: &dyn ProcessRunner,
    command: &crate::procedure::CommandSpec,
    filter: bool,
    relative: &Path,
) -> anyhow::Result<bool> {
    let virtual_path = Path::new(&relative_path_string(relative)).to_path_buf();
    let argv0 = command.program.as_os_str().to_owned();
    let mut argv = vec![argv0];
    if filter {
        argv.extend(command.args.iter().map(|t| match t {
            crate::procedure::ArgToken::Literal(s) => std::ffi::OsString::from(s),
            crate::procedure::ArgToken::Placeholder => virtual_path.as_os_str().to_owned(),
        }));
    } else {
        argv.extend(command.expand_argv(&virtual_path));
    }

    let stdin_source = if filter {
        Some(persistent.absolute(relative))
    } else {
        None
    };

    let outcome = runner.run(
        &command.program,
        &argv,
        None,
        None,
        stdin_source.as_deref(),
    )?;
    Ok(outcome.success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::{ArgToken, CommandSpec};
    use crate::process::SystemRunner;
    use std::path::PathBuf;

    fn mirror() -> (tempfile::TempDir, Persistent) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("script.sh"), "#!/bin/sh\necho hi\n").unwrap();
        std::fs::write(dir.path().join("plain.txt"), "hello\n").unwrap();
        let persistent = Persistent::new(dir.path().to_path_buf(), vec![], false).unwrap();
        (dir, persistent)
    }

    #[test]
    fn shebang_detection() {
        let (_dir, persistent) = mirror();
        assert!(starts_with_shebang(&persistent, Path::new("script.sh")).unwrap());
        assert!(!starts_with_shebang(&persistent, Path::new("plain.txt")).unwrap());
    }

    #[test]
    fn shebang_check_on_directory_is_false_not_error() {
        // The mount root (and every subdirectory) is classified under
        // the default `-p auto` procedure just like a regular file;
        // `read`ing a directory must not surface as an error here.
        let (_dir, persistent) = mirror();
        assert!(!starts_with_shebang(&persistent, Path::new(".")).unwrap());
    }

    #[test]
    fn shebang_or_executable_on_directory_does_not_error() {
        // `classify` runs this test unconditionally from `getattr` on
        // every path, including directories (spec.md §4.6); it must
        // never fail with EISDIR, regardless of which branch (shebang
        // read vs executable check) ends up true.
        let (_dir, persistent) = mirror();
        let runner = SystemRunner;
        assert!(matches(&persistent, &runner, &Test::ShebangOrExecutable, Path::new(".")).is_ok());
    }

    #[test]
    fn pattern_matches_virtual_path() {
        let test = Test::Pattern {
            regex: "file_[0-4]".to_string(),
        };
        let (_dir, persistent) = mirror();
        let runner = SystemRunner;
        assert!(matches(&persistent, &runner, &test, Path::new("file_1")).unwrap());
        assert!(!matches(&persistent, &runner, &test, Path::new("file_5")).unwrap());
    }

    #[test]
    fn external_test_virtual_path_asymmetry() {
        // `args` echoes its argument; the test must see the virtual
        // name, not a temp-copy path (spec.md E4).
        let command = CommandSpec {
            program: PathBuf::from("/usr/bin/test"),
            args: vec![ArgToken::Literal("-n".into()), ArgToken::Placeholder],
        };
        let test = Test::External { command, filter: false };
        let (_dir, persistent) = mirror();
        let runner = SystemRunner;
        assert!(matches(&persistent, &runner, &test, Path::new("anything")).unwrap());
    }
}
