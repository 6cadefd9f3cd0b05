//! First-match classification (spec.md §4.6): `classify(relative)` walks
//! the immutable procedure list in order and returns the first whose
//! `Test` matches, or `None` for a plain pass-through file.

use std::path::Path;

use crate::config::Persistent;
use crate::procedure::Procedure;
use crate::process::ProcessRunner;
use crate::test_eval;

pub fn classify<'p>(
    persistent: &'p Persistent,
    runner: &dyn ProcessRunner,
    relative: &Path,
) -> anyhow::Result<Option<&'p Procedure>> {
    for procedure in &persistent.procedures {
        if test_eval::matches(persistent, runner, &procedure.test, relative)? {
            return Ok(Some(procedure));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::{Program, Test};
    use crate::process::SystemRunner;
    use std::path::Path;

    fn procs(tests: Vec<Test>) -> Vec<Procedure> {
        tests
            .into_iter()
            .map(|test| Procedure {
                program: Program::Auto,
                test,
            })
            .collect()
    }

    #[test]
    fn first_match_wins() {
        // Both procedures would match `anything`; the classifier must
        // fix the first one in list order (spec.md §8 property 3).
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("anything"), "x").unwrap();
        let procedures = procs(vec![
            Test::Pattern { regex: "any".to_string() },
            Test::Always,
        ]);
        let first_test = procedures[0].test.clone();
        let persistent = Persistent::new(dir.path().to_path_buf(), procedures, false).unwrap();
        let runner = SystemRunner;

        let matched = classify(&persistent, &runner, Path::new("anything")).unwrap().unwrap();
        assert_eq!(matched.test, first_test);
    }

    #[test]
    fn no_match_is_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain.txt"), "x").unwrap();
        let procedures = procs(vec![Test::Pattern { regex: "nope".to_string() }]);
        let persistent = Persistent::new(dir.path().to_path_buf(), procedures, false).unwrap();
        let runner = SystemRunner;

        assert!(classify(&persistent, &runner, Path::new("plain.txt")).unwrap().is_none());
    }
}
