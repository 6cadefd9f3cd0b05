//! The `fuser::Filesystem` adapter (spec.md §4.6 dispatch, §4.9 binding).
//!
//! `ScriptFs` is the single point where a FUSE request's inode number is
//! turned into a mirror-relative path, classified, and routed to either
//! [`mirror_ops`] (pass-through) or [`script_ops`] (materialization).
//! Every fallible path call is translated to an errno via
//! [`ScriptFsError::to_errno`] before crossing back into `fuser`'s reply
//! types — nothing here panics on a bad request from the kernel.

pub mod mirror_ops;
pub mod script_ops;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use nix::fcntl::OFlag;
use nix::sys::stat::{FileStat, Mode, SFlag};
use nix::sys::time::TimeSpec;
use tracing::{error, warn};

use crate::classifier;
use crate::config::Persistent;
use crate::error::ScriptFsError;
use crate::handle::{DirEntry, HandleKind, HandleRegistry, OpenHandle};
use crate::inode::InodeTable;
use crate::procedure::Procedure;
use crate::process::{ProcessRunner, SystemRunner};

/// Attribute cache/entry TTL handed back to the kernel. Kept short since
/// a script's content can change every time its Program re-runs (spec.md
/// §7 "Script re-execution on stat").
const TTL: Duration = Duration::from_secs(1);

pub struct ScriptFs {
    persistent: Persistent,
    runner: Box<dyn ProcessRunner + Send + Sync>,
    inodes: InodeTable,
    handles: HandleRegistry,
}

impl ScriptFs {
    pub fn new(persistent: Persistent) -> ScriptFs {
        ScriptFs {
            persistent,
            runner: Box::new(SystemRunner),
            inodes: InodeTable::new(),
            handles: HandleRegistry::new(),
        }
    }

    fn path_of(&self, ino: u64) -> Result<PathBuf, ScriptFsError> {
        self.inodes
            .path_of(ino)
            .map(Path::to_path_buf)
            .ok_or_else(|| ScriptFsError::NotFound(PathBuf::from(format!("<ino {ino}>"))))
    }

    fn classify(&self, relative: &Path) -> Result<Option<&Procedure>, ScriptFsError> {
        classifier::classify(&self.persistent, self.runner.as_ref(), relative).map_err(|source| {
            ScriptFsError::Classify {
                path: relative.to_path_buf(),
                source,
            }
        })
    }

    /// Builds a kernel [`FileAttr`] for `relative`, given its raw mirror
    /// `stat` and whether it was classified as a script (spec.md §4.7
    /// `getattr`): a matched file has every write bit cleared from its
    /// reported mode, and, under `-l`, its reported size is the captured
    /// stdout's byte length rather than the mirror file's own size.
    fn build_attr(&self, ino: u64, stat: &FileStat, is_script: bool, size_override: Option<u64>) -> FileAttr {
        let kind = match stat.st_mode & SFlag::S_IFMT.bits() as u32 {
            m if m == SFlag::S_IFDIR.bits() as u32 => FileType::Directory,
            m if m == SFlag::S_IFLNK.bits() as u32 => FileType::Symlink,
            _ => FileType::RegularFile,
        };
        let mut perm = (stat.st_mode & 0o7777) as u16;
        if is_script {
            perm &= !0o222;
        }
        let size = size_override.unwrap_or(stat.st_size as u64);
        FileAttr {
            ino,
            size,
            blocks: stat.st_blocks as u64,
            atime: system_time(stat.st_atime, stat.st_atime_nsec),
            mtime: system_time(stat.st_mtime, stat.st_mtime_nsec),
            ctime: system_time(stat.st_ctime, stat.st_ctime_nsec),
            crtime: system_time(stat.st_ctime, stat.st_ctime_nsec),
            kind,
            perm,
            nlink: stat.st_nlink as u32,
            uid: stat.st_uid,
            gid: stat.st_gid,
            rdev: stat.st_rdev as u32,
            blksize: stat.st_blksize as u32,
            flags: 0,
        }
    }

    /// Resolves `relative`'s attr plus its script classification, as
    /// needed at several call sites (getattr, access, setattr, open).
    fn stat_and_classify(
        &self,
        ino: u64,
        relative: &Path,
    ) -> Result<(FileAttr, bool), ScriptFsError> {
        let stat = mirror_ops::getattr(&self.persistent, relative)?;
        let procedure = self.classify(relative)?;
        let is_regular_file = (stat.st_mode & SFlag::S_IFMT.bits() as u32) == SFlag::S_IFREG.bits() as u32;
        let script_procedure = procedure.filter(|_| is_regular_file);
        let is_script = script_procedure.is_some();
        let size_override = match script_procedure {
            Some(procedure) if self.persistent.eager_size => {
                match script_ops::materialize(&self.persistent, self.runner.as_ref(), &procedure.program, relative) {
                    Ok(artifact) => artifact.size().ok(),
                    Err(e) => {
                        // spec.md §7: a failing eager-size run falls back to
                        // the mirror file's own size rather than failing the
                        // stat.
                        warn!(?relative, error = %e, "eager-size materialization failed, falling back to mirror size");
                        None
                    }
                }
            }
            _ => None,
        };
        Ok((self.build_attr(ino, &stat, is_script, size_override), is_script))
    }
}

fn system_time(secs: i64, nsecs: i64) -> SystemTime {
    if secs >= 0 {
        SystemTime::UNIX_EPOCH + Duration::new(secs as u64, nsecs as u32)
    } else {
        SystemTime::UNIX_EPOCH
    }
}

impl Filesystem for ScriptFs {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let relative = parent_path.join(name);
        match mirror_ops::getattr(&self.persistent, &relative) {
            Ok(stat) => {
                let procedure = self.classify(&relative).ok().flatten();
                let is_script = procedure.is_some()
                    && (stat.st_mode & SFlag::S_IFMT.bits() as u32) == SFlag::S_IFREG.bits() as u32;
                let ino = self.inodes.lookup(&relative);
                let attr = self.build_attr(ino, &stat, is_script, None);
                reply.entry(&TTL, &attr, 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let relative = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        match self.stat_and_classify(ino, &relative) {
            Ok((attr, _)) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let relative = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let is_script = match self.classify(&relative) {
            Ok(p) => p.is_some(),
            Err(e) => return reply.error(e.to_errno()),
        };

        // spec.md §4.5 / property 4: chmod adding write, truncate, and
        // utimens on a classified file are all refused outright.
        if is_script {
            let adds_write = mode.map(|m| m & 0o222 != 0).unwrap_or(false);
            if adds_write || size.is_some() || atime.is_some() || mtime.is_some() {
                return reply.error(libc::EACCES);
            }
        }

        if let Some(m) = mode {
            if let Err(e) = mirror_ops::chmod(&self.persistent, &relative, Mode::from_bits_truncate(m)) {
                return reply.error(e.to_errno());
            }
        }
        if let Some(sz) = size {
            if let Err(e) = mirror_ops::truncate(&self.persistent, &relative, sz) {
                return reply.error(e.to_errno());
            }
        }
        if atime.is_some() || mtime.is_some() {
            let now = TimeSpec::new(0, libc::UTIME_NOW as i64);
            let a = to_timespec(atime).unwrap_or(now);
            let m = to_timespec(mtime).unwrap_or(now);
            if let Err(e) = mirror_ops::utimens(&self.persistent, &relative, a, m) {
                return reply.error(e.to_errno());
            }
        }

        match self.stat_and_classify(ino, &relative) {
            Ok((attr, _)) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let relative = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        match mirror_ops::readlink(&self.persistent, &relative) {
            Ok(target) => reply.data(target.as_os_str().as_encoded_bytes()),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn mkdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, mode: u32, _umask: u32, reply: ReplyEntry) {
        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let relative = parent_path.join(name);
        if let Err(e) = mirror_ops::mkdir(&self.persistent, &relative, Mode::from_bits_truncate(mode)) {
            return reply.error(e.to_errno());
        }
        match mirror_ops::getattr(&self.persistent, &relative) {
            Ok(stat) => {
                let ino = self.inodes.lookup(&relative);
                reply.entry(&TTL, &self.build_attr(ino, &stat, false, None), 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let relative = parent_path.join(name);
        match mirror_ops::unlink(&self.persistent, &relative) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let relative = parent_path.join(name);
        match mirror_ops::rmdir(&self.persistent, &relative) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let relative = parent_path.join(link_name);
        if let Err(e) = mirror_ops::symlink(&self.persistent, target, &relative) {
            return reply.error(e.to_errno());
        }
        match mirror_ops::getattr(&self.persistent, &relative) {
            Ok(stat) => {
                let ino = self.inodes.lookup(&relative);
                reply.entry(&TTL, &self.build_attr(ino, &stat, false, None), 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn link(&mut self, _req: &Request<'_>, ino: u64, newparent: u64, newname: &OsStr, reply: ReplyEntry) {
        let existing = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let newparent_path = match self.path_of(newparent) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let new_relative = newparent_path.join(newname);
        if let Err(e) = mirror_ops::link(&self.persistent, &existing, &new_relative) {
            return reply.error(e.to_errno());
        }
        match mirror_ops::getattr(&self.persistent, &new_relative) {
            Ok(stat) => {
                let new_ino = self.inodes.lookup(&new_relative);
                reply.entry(&TTL, &self.build_attr(new_ino, &stat, false, None), 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let old_parent = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let new_parent = match self.path_of(newparent) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let old_relative = old_parent.join(name);
        let new_relative = new_parent.join(newname);
        match mirror_ops::rename(&self.persistent, &old_relative, &new_relative) {
            Ok(()) => {
                self.inodes.rename(&old_relative, &new_relative);
                reply.ok();
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let relative = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let procedure = match self.classify(&relative) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };

        let wants_write = flags & (libc::O_WRONLY | libc::O_RDWR) != 0;

        let handle = if let Some(procedure) = procedure {
            // spec.md §4.7 `open`: a write-mode open on a classified file
            // is refused outright, before any materialization runs.
            if wants_write {
                return reply.error(libc::EACCES);
            }
            match script_ops::materialize(&self.persistent, self.runner.as_ref(), &procedure.program, &relative) {
                Ok(artifact) => OpenHandle {
                    relative_path: relative.clone(),
                    kind: HandleKind::Script(artifact.into_file()),
                },
                Err(e) => {
                    error!(?relative, error = %e, "script materialization failed");
                    return reply.error(e.to_errno());
                }
            }
        } else {
            let oflag = OFlag::from_bits_truncate(flags) & !OFlag::O_CREAT & !OFlag::O_EXCL;
            match mirror_ops::open_relative(&self.persistent, &relative, oflag, Mode::empty()) {
                Ok(file) => OpenHandle {
                    relative_path: relative.clone(),
                    kind: HandleKind::Regular(file),
                },
                Err(e) => return reply.error(e.to_errno()),
            }
        };

        let fh = self.handles.insert(handle);
        reply.opened(fh, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let handle = match self.handles.get(fh) {
            Ok(h) => h,
            Err(e) => return reply.error(e.to_errno()),
        };
        let file = match handle.as_file("read", fh) {
            Ok(f) => f,
            Err(e) => return reply.error(e.to_errno()),
        };
        let mut buf = vec![0u8; size as usize];
        match nix::sys::uio::pread(file, &mut buf, offset) {
            Ok(n) => {
                buf.truncate(n);
                reply.data(&buf);
            }
            Err(e) => reply.error(ScriptFsError::from(e).to_errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let handle = match self.handles.get(fh) {
            Ok(h) => h,
            Err(e) => return reply.error(e.to_errno()),
        };
        // spec.md §4.7 `write(Script handle)`: never permitted — the
        // handle was opened read-only in the first place.
        if handle.is_script() {
            return reply.error(libc::EACCES);
        }
        let file = match handle.as_file("write", fh) {
            Ok(f) => f,
            Err(e) => return reply.error(e.to_errno()),
        };
        match nix::sys::uio::pwrite(file, data, offset) {
            Ok(n) => reply.written(n as u32),
            Err(e) => reply.error(ScriptFsError::from(e).to_errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        // spec.md §4.7 `release(Script handle)`: closing the descriptor
        // is the only thing needed — the artifact was already unlinked.
        self.handles.remove(fh);
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let relative = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let mut dir = match mirror_ops::opendir_relative(&self.persistent, &relative) {
            Ok(d) => d,
            Err(e) => return reply.error(e.to_errno()),
        };
        let entries = match mirror_ops::read_dir_entries(&mut dir) {
            Ok(raw) => raw
                .into_iter()
                .map(|(name, kind)| {
                    let child_relative = relative.join(&name);
                    let ino = self.inodes.lookup(&child_relative);
                    let kind = match kind {
                        nix::dir::Type::Directory => FileType::Directory,
                        nix::dir::Type::Symlink => FileType::Symlink,
                        _ => FileType::RegularFile,
                    };
                    DirEntry { name, ino, kind }
                })
                .collect(),
            Err(e) => return reply.error(e.to_errno()),
        };
        let fh = self.handles.insert(OpenHandle {
            relative_path: relative,
            kind: HandleKind::Dir(entries),
        });
        reply.opened(fh, 0);
    }

    fn readdir(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, offset: i64, mut reply: ReplyDirectory) {
        let handle = match self.handles.get(fh) {
            Ok(h) => h,
            Err(e) => return reply.error(e.to_errno()),
        };
        let entries = match &handle.kind {
            HandleKind::Dir(entries) => entries,
            _ => return reply.error(ScriptFsError::WrongHandleKind { op: "readdir", fh }.to_errno()),
        };
        for (i, entry) in entries.iter().enumerate().skip(offset as usize) {
            let next_offset = (i + 1) as i64;
            if reply.add(entry.ino, next_offset, entry.kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _flags: i32, reply: ReplyEmpty) {
        self.handles.remove(fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        match mirror_ops::statvfs(&self.persistent) {
            Ok(stat) => reply.statfs(
                stat.blocks(),
                stat.blocks_free(),
                stat.blocks_available(),
                stat.files(),
                stat.files_free(),
                stat.block_size() as u32,
                stat.name_max() as u32,
                stat.fragment_size() as u32,
            ),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        let relative = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let is_script = match self.classify(&relative) {
            Ok(p) => p.is_some(),
            Err(e) => return reply.error(e.to_errno()),
        };
        if is_script && mask & libc::W_OK != 0 {
            return reply.error(libc::EACCES);
        }
        let mode = nix::unistd::AccessFlags::from_bits_truncate(mask);
        match mirror_ops::access(&self.persistent, &relative, mode) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    /// Creates and opens a new file. Always a pass-through to the mirror
    /// (spec.md §1: "create ... reflect to the mirror") — a brand-new
    /// path cannot yet be classified against anything meaningful, and
    /// the procedure list is evaluated against existing file content/
    /// permissions, not creation requests.
    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => return reply.error(e.to_errno()),
        };
        let relative = parent_path.join(name);
        let oflag = OFlag::from_bits_truncate(flags) | OFlag::O_CREAT;
        let file = match mirror_ops::open_relative(
            &self.persistent,
            &relative,
            oflag,
            Mode::from_bits_truncate(mode),
        ) {
            Ok(f) => f,
            Err(e) => return reply.error(e.to_errno()),
        };
        let stat = match mirror_ops::getattr(&self.persistent, &relative) {
            Ok(s) => s,
            Err(e) => return reply.error(e.to_errno()),
        };
        let ino = self.inodes.lookup(&relative);
        let attr = self.build_attr(ino, &stat, false, None);
        let fh = self.handles.insert(OpenHandle {
            relative_path: relative,
            kind: HandleKind::Regular(file),
        });
        reply.created(&TTL, &attr, 0, fh, 0);
    }

    /// No write-back buffering happens between `write` and `release`
    /// (every `write`/`read` is an immediate `pwrite`/`pread` against
    /// the mirror fd or the script artifact), so `flush` and `fsync`
    /// have nothing of our own to do beyond delegating to the kernel's
    /// own fd: pass-through files fsync cleanly; script handles hold an
    /// already-unlinked, read-only artifact with no dirty state.
    fn flush(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        match self.handles.get(fh) {
            Ok(_) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _datasync: bool, reply: ReplyEmpty) {
        let handle = match self.handles.get(fh) {
            Ok(h) => h,
            Err(e) => return reply.error(e.to_errno()),
        };
        match &handle.kind {
            HandleKind::Regular(f) => match f.sync_all() {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(e.raw_os_error().unwrap_or(libc::EIO)),
            },
            // A script artifact is an unlinked, read-only temp file;
            // nothing to sync.
            HandleKind::Script(_) | HandleKind::Dir(_) => reply.ok(),
        }
    }
}

fn to_timespec(t: Option<TimeOrNow>) -> Option<TimeSpec> {
    match t {
        Some(TimeOrNow::SpecificTime(time)) => {
            let dur = time.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
            Some(TimeSpec::new(dur.as_secs() as i64, dur.subsec_nanos() as i64))
        }
        Some(TimeOrNow::Now) => Some(TimeSpec::new(0, libc::UTIME_NOW as i64)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount_of(dir: &std::path::Path) -> ScriptFs {
        let persistent = Persistent::new(dir.to_path_buf(), vec![], false).unwrap();
        ScriptFs::new(persistent)
    }

    #[test]
    fn build_attr_clears_write_bits_for_scripts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), "x").unwrap();
        let fs = mount_of(dir.path());
        let stat = mirror_ops::getattr(&fs.persistent, Path::new("f")).unwrap();
        let attr = fs.build_attr(2, &stat, true, None);
        assert_eq!(attr.perm & 0o222, 0);
    }

    #[test]
    fn build_attr_keeps_write_bits_for_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "x").unwrap();
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let fs = mount_of(dir.path());
        let stat = mirror_ops::getattr(&fs.persistent, Path::new("f")).unwrap();
        let attr = fs.build_attr(2, &stat, false, None);
        assert_ne!(attr.perm & 0o222, 0);
    }
}
