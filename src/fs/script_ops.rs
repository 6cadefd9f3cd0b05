//! Script materialization (spec.md §4.3, §4.7): running a classified
//! file's `Program` and capturing its stdout into a [`TempArtifact`].

use std::path::Path;

use crate::config::{relative_path_string, Persistent};
use crate::error::ScriptFsError;
use crate::procedure::{ArgToken, Program};
use crate::process::{shebang, ProcessRunner};
use crate::temp_artifact::{self, TempArtifact};

/// Runs `program` against `relative` (a mirror-relative path already
/// established to have matched some Procedure's `Test`), capturing its
/// stdout into a freshly created temp artifact. Spec.md §4.7 step 4.
pub fn materialize(
    persistent: &Persistent,
    runner: &dyn ProcessRunner,
    program: &Program,
    relative: &Path,
) -> Result<TempArtifact, ScriptFsError> {
    let artifact = TempArtifact::create(&persistent.temp_template)?;
    let mirror_path = persistent.absolute(relative);
    let virtual_path = Path::new(&relative_path_string(relative)).to_path_buf();

    match program {
        Program::Auto => {
            let launch = shebang::resolve(&persistent.mirror_root_path, &mirror_path, &virtual_path)
                .map_err(|e| ScriptFsError::Spawn {
                    program: mirror_path.clone(),
                    source: e,
                })?;
            runner.run(&launch.program, &launch.argv, None, Some(artifact.file()), None)?;
        }
        Program::SelfExec => {
            let argv = vec![virtual_path.as_os_str().to_owned()];
            runner.run(&mirror_path, &argv, None, Some(artifact.file()), None)?;
        }
        Program::External { command, .. } => {
            let argv0 = command.program.as_os_str().to_owned();
            let mut argv = vec![argv0];
            if command.has_placeholder() {
                let copy_path = temp_artifact::create_temp_copy(&persistent.temp_template, &mirror_path)?;
                let result = (|| -> Result<(), ScriptFsError> {
                    argv.extend(command.expand_argv(&copy_path));
                    runner.run(&command.program, &argv, None, Some(artifact.file()), None)?;
                    Ok(())
                })();
                let _ = std::fs::remove_file(&copy_path);
                result?;
            } else {
                argv.extend(command.args.iter().map(|tok| match tok {
                    ArgToken::Literal(s) => std::ffi::OsString::from(s),
                    ArgToken::Placeholder => unreachable!("has_placeholder() is false"),
                }));
                runner.run(
                    &command.program,
                    &argv,
                    None,
                    Some(artifact.file()),
                    Some(&mirror_path),
                )?;
            }
        }
    }

    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::{CommandSpec, Program};
    use crate::process::SystemRunner;
    use std::path::PathBuf;

    fn mirror_with(name: &str, contents: &str, mode: Option<u32>) -> (tempfile::TempDir, Persistent) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        if let Some(m) = mode {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(m)).unwrap();
        }
        let persistent = Persistent::new(dir.path().to_path_buf(), vec![], false).unwrap();
        (dir, persistent)
    }

    #[test]
    fn auto_runs_shebang_interpreter_and_captures_stdout() {
        let (_dir, persistent) = mirror_with("script.sh", "#!/bin/sh\necho hi\n", Some(0o755));
        let runner = SystemRunner;
        let artifact = materialize(&persistent, &runner, &Program::Auto, Path::new("script.sh")).unwrap();
        assert_eq!(artifact.size().unwrap(), 3);
    }

    #[test]
    fn external_with_placeholder_uses_temp_copy() {
        let (_dir, persistent) = mirror_with("data.txt", "ignored\n", None);
        let command = CommandSpec {
            program: PathBuf::from("/bin/cat"),
            args: vec![crate::procedure::ArgToken::Placeholder],
        };
        let program = Program::External { command, filter: false };
        let runner = SystemRunner;
        let artifact = materialize(&persistent, &runner, &program, Path::new("data.txt")).unwrap();
        assert_eq!(artifact.size().unwrap(), 8);
    }

    #[test]
    fn external_without_placeholder_pipes_stdin() {
        let (_dir, persistent) = mirror_with("data.txt", "piped in\n", None);
        let command = CommandSpec {
            program: PathBuf::from("/bin/cat"),
            args: vec![],
        };
        let program = Program::External { command, filter: true };
        let runner = SystemRunner;
        let artifact = materialize(&persistent, &runner, &program, Path::new("data.txt")).unwrap();
        assert_eq!(artifact.size().unwrap(), 9);
    }
}
