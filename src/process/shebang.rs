//! Parses a file's `#!` line to find its interpreter, per spec.md §4.2.
//!
//! Grounded on proot-rs's `kernel::execve::shebang` (other_examples):
//! read the first line, detect `#!`, scan for the interpreter path up to
//! the first unescaped whitespace. Unlike proot-rs (which resolves a
//! guest path through a translation layer and fetches/rewrites a traced
//! process's argv), scriptfs only needs the resolved interpreter path
//! plus the two-element argv the spec prescribes.

use std::io::Read;
use std::path::{Path, PathBuf};

/// Bound on how much of the file is scanned looking for a shebang line;
/// matches common kernel `BINPRM_BUF_SIZE`-style limits.
const MAX_SHEBANG_SCAN: usize = 4096;

/// What to execute for a file classified under `Program::Auto`.
pub struct Launch {
    /// The program to exec (the interpreter, or the file itself).
    pub program: PathBuf,
    /// The full argv, including argv[0].
    pub argv: Vec<std::ffi::OsString>,
}

/// Resolves the Auto launch for `mirror_path` (the file's absolute path
/// on the mirror), given `original_path` (how the file should appear as
/// argv[1] to a shebang interpreter — the mirror-relative virtual path)
/// and `mirror_root` (against which a relative interpreter path, and
/// argv[0] itself, are resolved — never the caller's cwd, per spec.md
/// §4.2).
pub fn resolve(mirror_root: &Path, mirror_path: &Path, original_path: &Path) -> std::io::Result<Launch> {
    let mut file = std::fs::File::open(mirror_path)?;
    let mut buf = vec![0u8; MAX_SHEBANG_SCAN];
    let n = file.read(&mut buf)?;
    buf.truncate(n);

    if let Some(interpreter) = parse_shebang_line(&buf) {
        let program = if interpreter.is_absolute() {
            interpreter.clone()
        } else {
            mirror_root.join(&interpreter)
        };
        let argv = vec![
            interpreter.into_os_string(),
            original_path.as_os_str().to_owned(),
        ];
        Ok(Launch { program, argv })
    } else {
        Ok(Launch {
            program: mirror_path.to_path_buf(),
            argv: vec![original_path.as_os_str().to_owned()],
        })
    }
}

/// Extracts the interpreter path from a `#!` first line, honoring
/// `\<space>` as a literal space embedded in the path, per spec.md §4.2.
/// Returns `None` if the buffer does not begin with `#!`.
fn parse_shebang_line(buf: &[u8]) -> Option<PathBuf> {
    if buf.len() < 2 || &buf[0..2] != b"#!" {
        return None;
    }
    let rest = &buf[2..];
    let line_end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
    let line = &rest[..line_end];

    let mut i = 0;
    while i < line.len() && (line[i] == b' ' || line[i] == b'\t') {
        i += 1;
    }

    let mut path_bytes = Vec::new();
    while i < line.len() {
        let b = line[i];
        if b == b'\\' && i + 1 < line.len() && line[i + 1] == b' ' {
            path_bytes.push(b' ');
            i += 2;
            continue;
        }
        if b == b' ' || b == b'\t' {
            break;
        }
        path_bytes.push(b);
        i += 1;
    }

    if path_bytes.is_empty() {
        return None;
    }

    use std::os::unix::ffi::OsStringExt;
    Some(PathBuf::from(std::ffi::OsString::from_vec(path_bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_simple_shebang() {
        let parsed = parse_shebang_line(b"#!/bin/bash\n\necho Hi\n");
        assert_eq!(parsed, Some(PathBuf::from("/bin/bash")));
    }

    #[test]
    fn no_shebang_returns_none() {
        assert_eq!(parse_shebang_line(b"just some text"), None);
    }

    #[test]
    fn escaped_space_in_interpreter_path() {
        let parsed = parse_shebang_line(b"#!/opt/my\\ tools/run\n");
        assert_eq!(parsed, Some(PathBuf::from("/opt/my tools/run")));
    }

    #[test]
    fn skips_leading_whitespace_after_bang() {
        let parsed = parse_shebang_line(b"#!   /bin/sh\n");
        assert_eq!(parsed, Some(PathBuf::from("/bin/sh")));
    }
}
