//! The Procedure model: what to run to materialize a script (`Program`)
//! and how to decide a file counts as one (`Test`).
//!
//! This mirrors the teacher crate's split between [`crate::process`]'s
//! actual execution and a generic template here: a `Program`/`Test` is a
//! reusable description, analogous to `chainsop::Executable`, while
//! running it against one concrete file is analogous to
//! `chainsop::SubProcOperation`.

pub mod parser;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One token of an argv template: either a literal string or the `!`
/// file-placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgToken {
    Literal(String),
    Placeholder,
}

/// A parsed command line: the executable path plus its templated argv
/// tail (argv[0] is not included here; callers set it explicitly).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<ArgToken>,
}

impl CommandSpec {
    pub fn has_placeholder(&self) -> bool {
        self.args.iter().any(|a| *a == ArgToken::Placeholder)
    }

    /// Expands this command's argv tail, substituting `!` with
    /// `substitution`. `argv[0]` is not produced here.
    pub fn expand_argv(&self, substitution: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|tok| match tok {
                ArgToken::Literal(s) => OsString::from(s),
                ArgToken::Placeholder => substitution.as_os_str().to_owned(),
            })
            .collect()
    }
}

/// What is run to generate a script's content at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// Launch the file itself via the shebang resolver.
    Auto,
    /// Run an external command, substituting the file in via `!` or,
    /// absent a placeholder, piping the file's content on stdin.
    External { command: CommandSpec, filter: bool },
    /// Invoke the classified file directly as the program, with no
    /// shebang rewriting.
    SelfExec,
}

/// The predicate deciding whether a file counts as a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Test {
    Always,
    Executable,
    ShebangOrExecutable,
    Pattern { regex: String },
    External { command: CommandSpec, filter: bool },
}

/// A (Program, Test) pair; the classifier fixes the first whose `test`
/// matches a given file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    pub program: Program,
    pub test: Test,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn token_strategy() -> impl Strategy<Value = ArgToken> {
        prop_oneof![
            "[a-z]{1,8}".prop_map(ArgToken::Literal),
            Just(ArgToken::Placeholder),
        ]
    }

    proptest! {
        // expand_argv never changes arity and always substitutes every
        // Placeholder token with exactly the given path, regardless of
        // how many literal tokens surround it or in what order.
        #[test]
        fn expand_argv_preserves_arity_and_substitution(
            tokens in prop::collection::vec(token_strategy(), 0..8),
            substitution in "[a-zA-Z0-9/_.-]{1,16}",
        ) {
            let sub_path = Path::new(&substitution);
            let command = CommandSpec {
                program: PathBuf::from("prog"),
                args: tokens.clone(),
            };
            let expanded = command.expand_argv(sub_path);
            prop_assert_eq!(expanded.len(), tokens.len());
            for (tok, arg) in tokens.iter().zip(expanded.iter()) {
                match tok {
                    ArgToken::Literal(s) => prop_assert_eq!(arg, &OsString::from(s)),
                    ArgToken::Placeholder => prop_assert_eq!(arg, &sub_path.as_os_str().to_owned()),
                }
            }
            prop_assert_eq!(command.has_placeholder(), tokens.iter().any(|t| *t == ArgToken::Placeholder));
        }
    }
}
