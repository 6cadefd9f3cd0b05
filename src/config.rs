//! The mount-lifetime, immutable configuration: spec.md §3 `Persistent`.
//!
//! Built once in `main` from parsed CLI flags and handed down by
//! reference to every operation, the way the teacher crate's
//! `Executor`/`procedures` are constructed once and reused, never
//! mutated, across a run.

use std::ffi::OsString;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use nix::dir::Dir;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use crate::procedure::Procedure;

/// Directory used for RAM-backed temp artifacts: `/dev/shm` if present,
/// else `/tmp`, probed once at startup (spec.md §3, §9).
pub fn temp_template_dir() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        shm.to_path_buf()
    } else {
        PathBuf::from("/tmp")
    }
}

/// The full temp file template, e.g. `/dev/shm/sfs.XXXXXX`, per spec.md
/// §6's "Temp file convention".
pub fn temp_template() -> PathBuf {
    temp_template_dir().join("sfs.XXXXXX")
}

pub struct Persistent {
    /// Canonicalized absolute path of the mirror directory.
    pub mirror_root_path: PathBuf,
    /// Long-lived directory descriptor rooted at the mirror, used for
    /// all `*at`-style relative resolution (spec.md §3, §4.8).
    pub mirror_root_dir: Dir,
    pub procedures: Vec<Procedure>,
    pub eager_size: bool,
    pub temp_template: PathBuf,
    pub env: Vec<(OsString, OsString)>,
}

impl Persistent {
    pub fn new(
        mirror_root_path: PathBuf,
        procedures: Vec<Procedure>,
        eager_size: bool,
    ) -> anyhow::Result<Persistent> {
        let canonical = mirror_root_path.canonicalize()?;
        let mirror_root_dir = Dir::open(&canonical, OFlag::O_DIRECTORY | OFlag::O_RDONLY, Mode::empty())?;
        let env = std::env::vars_os().collect();
        Ok(Persistent {
            mirror_root_path: canonical,
            mirror_root_dir,
            procedures,
            eager_size,
            temp_template: temp_template(),
            env,
        })
    }

    /// Raw fd for the mirror root, for `nix` functions in the
    /// `*at(Option<RawFd>, ...)` shape.
    pub fn root_fd_raw(&self) -> RawFd {
        self.mirror_root_dir.as_raw_fd()
    }

    /// Resolves a mirror-relative path to its absolute form on the real
    /// filesystem, for callers (ProcessRunner, shebang resolver) that
    /// need a plain filesystem path rather than an `*at` call.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.mirror_root_path.join(relative)
    }
}

/// `relative_path("/")` = `"."`; `relative_path("/x/y")` = `"x/y"`
/// (spec.md §3, invariant 3). FUSE hands scriptfs bare relative
/// components already (via the inode table), so this helper exists for
/// the few call sites (Pattern/External test virtual-path argument) that
/// need the "virtual path as passed" string spec.md §4.4 describes.
pub fn relative_path_string(relative: &Path) -> String {
    if relative.as_os_str().is_empty() || relative == Path::new(".") {
        ".".to_string()
    } else {
        relative.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_of_root_is_dot() {
        assert_eq!(relative_path_string(Path::new(".")), ".");
    }

    #[test]
    fn relative_path_of_nested() {
        assert_eq!(relative_path_string(Path::new("x/y")), "x/y");
    }
}
