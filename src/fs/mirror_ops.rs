//! Pass-through filesystem operations (spec.md §4.8): every non-script
//! op against the mirror, implemented via the `*at` family resolved
//! against `mirror_root`, never chasing the caller's own cwd.

use std::ffi::OsStr;
use std::path::Path;

use nix::dir::Dir;
use nix::fcntl::{self, AtFlags, OFlag};
use nix::sys::stat::{self, FchmodatFlags, Mode, UtimensatFlags};
use nix::sys::time::TimeSpec;
use nix::unistd::{self, UnlinkatFlags};

use crate::config::Persistent;
use crate::error::ScriptFsError;

fn root(persistent: &Persistent) -> i32 {
    persistent.root_fd_raw()
}

pub fn getattr(persistent: &Persistent, relative: &Path) -> Result<stat::FileStat, ScriptFsError> {
    stat::fstatat(root(persistent), relative, AtFlags::AT_SYMLINK_NOFOLLOW)
        .map_err(ScriptFsError::from)
}

pub fn access(persistent: &Persistent, relative: &Path, mode: nix::unistd::AccessFlags) -> Result<(), ScriptFsError> {
    unistd::faccessat(Some(root(persistent)), relative, mode, AtFlags::empty()).map_err(ScriptFsError::from)
}

pub fn open_relative(
    persistent: &Persistent,
    relative: &Path,
    oflag: OFlag,
    mode: Mode,
) -> Result<std::fs::File, ScriptFsError> {
    let fd = fcntl::openat(root(persistent), relative, oflag, mode).map_err(ScriptFsError::from)?;
    Ok(unsafe { <std::fs::File as std::os::fd::FromRawFd>::from_raw_fd(fd) })
}

pub fn opendir_relative(persistent: &Persistent, relative: &Path) -> Result<Dir, ScriptFsError> {
    Dir::openat(
        root(persistent),
        relative,
        OFlag::O_DIRECTORY | OFlag::O_RDONLY,
        Mode::empty(),
    )
    .map_err(ScriptFsError::from)
}

pub fn mkdir(persistent: &Persistent, relative: &Path, mode: Mode) -> Result<(), ScriptFsError> {
    stat::mkdirat(Some(root(persistent)), relative, mode).map_err(ScriptFsError::from)
}

pub fn rmdir(persistent: &Persistent, relative: &Path) -> Result<(), ScriptFsError> {
    unistd::unlinkat(Some(root(persistent)), relative, UnlinkatFlags::RemoveDir).map_err(ScriptFsError::from)
}

pub fn unlink(persistent: &Persistent, relative: &Path) -> Result<(), ScriptFsError> {
    unistd::unlinkat(Some(root(persistent)), relative, UnlinkatFlags::NoRemoveDir).map_err(ScriptFsError::from)
}

pub fn symlink(persistent: &Persistent, target: &Path, link_relative: &Path) -> Result<(), ScriptFsError> {
    unistd::symlinkat(target, Some(root(persistent)), link_relative).map_err(ScriptFsError::from)
}

pub fn readlink(persistent: &Persistent, relative: &Path) -> Result<std::path::PathBuf, ScriptFsError> {
    fcntl::readlinkat(root(persistent), relative).map_err(ScriptFsError::from)
}

pub fn link(persistent: &Persistent, existing_relative: &Path, new_relative: &Path) -> Result<(), ScriptFsError> {
    unistd::linkat(
        Some(root(persistent)),
        existing_relative,
        Some(root(persistent)),
        new_relative,
        AtFlags::empty(),
    )
    .map_err(ScriptFsError::from)
}

pub fn rename(
    persistent: &Persistent,
    old_relative: &Path,
    new_relative: &Path,
) -> Result<(), ScriptFsError> {
    unistd::renameat(
        Some(root(persistent)),
        old_relative,
        Some(root(persistent)),
        new_relative,
    )
    .map_err(ScriptFsError::from)
}

pub fn chmod(persistent: &Persistent, relative: &Path, mode: Mode) -> Result<(), ScriptFsError> {
    stat::fchmodat(Some(root(persistent)), relative, mode, FchmodatFlags::FollowSymlink)
        .map_err(ScriptFsError::from)
}

pub fn utimens(
    persistent: &Persistent,
    relative: &Path,
    atime: TimeSpec,
    mtime: TimeSpec,
) -> Result<(), ScriptFsError> {
    stat::utimensat(
        Some(root(persistent)),
        relative,
        &atime,
        &mtime,
        UtimensatFlags::FollowSymlink,
    )
    .map_err(ScriptFsError::from)
}

pub fn truncate(persistent: &Persistent, relative: &Path, size: u64) -> Result<(), ScriptFsError> {
    let file = open_relative(persistent, relative, OFlag::O_WRONLY, Mode::empty())?;
    nix::unistd::ftruncate(&file, size as i64).map_err(ScriptFsError::from)
}

pub fn statvfs(persistent: &Persistent) -> Result<nix::sys::statvfs::Statvfs, ScriptFsError> {
    // Per spec.md §4.8: "statvfs reports on `/` of the host", not the
    // mirror — a deliberate carry-over from the original tool, not an
    // oversight.
    let _ = persistent;
    nix::sys::statvfs::statvfs("/").map_err(ScriptFsError::from)
}

pub fn read_dir_entries(dir: &mut Dir) -> Result<Vec<(std::ffi::OsString, nix::dir::Type)>, ScriptFsError> {
    let mut out = Vec::new();
    for entry in dir.iter() {
        let entry = entry.map_err(ScriptFsError::from)?;
        let name = entry.file_name();
        let name_bytes = name.to_bytes();
        if name_bytes == b"." || name_bytes == b".." {
            continue;
        }
        let os_name: &OsStr = std::os::unix::ffi::OsStrExt::from_bytes(name_bytes);
        if let Some(kind) = entry.file_type() {
            out.push((os_name.to_owned(), kind));
        }
    }
    Ok(out)
}
