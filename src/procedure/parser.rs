//! Parses the `-p PROGRAM[;TEST]` spec grammar described in spec.md §4.5.

use std::path::PathBuf;

use super::{ArgToken, CommandSpec, Procedure, Program, Test};

/// Upper bound on tokens in a single command spec. The spec calls for "a
/// large bounded number"; this is generous for any real invocation while
/// still rejecting pathological input.
const MAX_TOKENS: usize = 4096;

#[derive(Debug, thiserror::Error)]
#[error("invalid procedure spec {spec:?}: {reason}")]
pub struct ProcedureParseError {
    pub spec: String,
    pub reason: String,
}

fn tokenize(s: &str) -> Result<Vec<&str>, String> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    if tokens.len() > MAX_TOKENS {
        return Err(format!("too many tokens (> {MAX_TOKENS})"));
    }
    Ok(tokens)
}

fn parse_command(s: &str) -> Result<CommandSpec, String> {
    let tokens = tokenize(s)?;
    let (exe, rest) = tokens
        .split_first()
        .ok_or_else(|| "empty command".to_string())?;
    let args = rest
        .iter()
        .map(|t| {
            if *t == "!" {
                ArgToken::Placeholder
            } else {
                ArgToken::Literal((*t).to_string())
            }
        })
        .collect();
    Ok(CommandSpec {
        program: PathBuf::from(exe),
        args,
    })
}

fn parse_program(s: &str) -> Result<Program, String> {
    let trimmed = s.trim();
    match trimmed {
        "auto" => Ok(Program::Auto),
        "self" => Ok(Program::SelfExec),
        _ => {
            let command = parse_command(trimmed)?;
            let filter = !command.has_placeholder();
            Ok(Program::External { command, filter })
        }
    }
}

fn parse_test(s: &str, program_command: Option<&CommandSpec>) -> Result<Test, String> {
    let trimmed = s.trim();
    if trimmed == "always" {
        return Ok(Test::Always);
    }
    if trimmed == "executable" {
        return Ok(Test::Executable);
    }
    if let Some(body) = trimmed.strip_prefix('&') {
        return Ok(Test::Pattern {
            regex: body.to_string(),
        });
    }
    let command = parse_command(trimmed)?;
    let _ = program_command;
    let filter = !command.has_placeholder();
    Ok(Test::External { command, filter })
}

impl Procedure {
    /// Parses a single `-p` spec string into a [`Procedure`], applying
    /// the defaulting rules of spec.md §4.5.
    pub fn parse(spec: &str) -> Result<Procedure, ProcedureParseError> {
        let mk_err = |reason: String| ProcedureParseError {
            spec: spec.to_string(),
            reason,
        };

        let (program_part, test_part) = match spec.split_once(';') {
            Some((p, t)) => (p, Some(t)),
            None => (spec, None),
        };

        let program = parse_program(program_part).map_err(mk_err)?;

        let test = match test_part {
            Some(t) => parse_test(t, None).map_err(mk_err)?,
            None => match &program {
                Program::Auto => Test::ShebangOrExecutable,
                Program::SelfExec => Test::Executable,
                Program::External { command, filter } => Test::External {
                    command: command.clone(),
                    filter: *filter,
                },
            },
        };

        Ok(Procedure { program, test })
    }

    /// Parses the default procedure used when no `-p` flag is given at
    /// all: equivalent to `-p auto`.
    pub fn default_auto() -> Procedure {
        Procedure {
            program: Program::Auto,
            test: Test::ShebangOrExecutable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_defaults_to_shebang_or_executable() {
        let p = Procedure::parse("auto").unwrap();
        assert_eq!(p.program, Program::Auto);
        assert_eq!(p.test, Test::ShebangOrExecutable);
    }

    #[test]
    fn self_defaults_to_executable_test() {
        let p = Procedure::parse("self").unwrap();
        assert_eq!(p.program, Program::SelfExec);
        assert_eq!(p.test, Test::Executable);
    }

    #[test]
    fn command_reuses_program_as_test_when_no_semicolon() {
        let p = Procedure::parse("args !").unwrap();
        match (&p.program, &p.test) {
            (Program::External { command: pc, filter: pf }, Test::External { command: tc, filter: tf }) => {
                assert_eq!(pc, tc);
                assert_eq!(pf, tf);
                assert!(!pf);
            }
            _ => panic!("expected External program and test"),
        }
    }

    #[test]
    fn filter_mode_when_no_placeholder() {
        let p = Procedure::parse("awk {print} NR,$0").unwrap();
        match &p.program {
            Program::External { filter, .. } => assert!(*filter),
            _ => panic!("expected External program"),
        }
    }

    #[test]
    fn explicit_pattern_test() {
        let p = Procedure::parse("/bin/echo !;&file_[0-4]").unwrap();
        assert_eq!(p.program, Program::External {
            command: CommandSpec {
                program: PathBuf::from("/bin/echo"),
                args: vec![ArgToken::Placeholder],
            },
            filter: false,
        });
        assert_eq!(p.test, Test::Pattern { regex: "file_[0-4]".to_string() });
    }

    #[test]
    fn always_and_executable_literals() {
        assert_eq!(Procedure::parse("auto;always").unwrap().test, Test::Always);
        assert_eq!(
            Procedure::parse("auto;executable").unwrap().test,
            Test::Executable
        );
    }
}
