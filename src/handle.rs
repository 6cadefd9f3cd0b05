//! Per-open handle state (spec.md §3 "Open handle").
//!
//! Threads the open-time classification decision (is this a directory, a
//! pass-through regular file, or a materialized script?) through the
//! subsequent read/write/seek/release calls, keyed by the `fh` FUSE
//! hands back to the kernel. Each entry is owned exclusively by the
//! single in-flight op carrying its `fh`, plus the eventual release —
//! mirroring the teacher crate's tagged-enum style for resource-carrying
//! values (`ActualFile`/`FileRef`).

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

use crate::error::ScriptFsError;

pub struct DirEntry {
    pub name: std::ffi::OsString,
    pub ino: u64,
    pub kind: fuser::FileType,
}

pub enum HandleKind {
    Dir(Vec<DirEntry>),
    Regular(File),
    /// The materialized script content: the captured stdout, already
    /// unlinked (spec.md §3 "Temp artifact").
    Script(File),
}

pub struct OpenHandle {
    pub relative_path: PathBuf,
    pub kind: HandleKind,
}

impl OpenHandle {
    /// Returns the underlying regular-file-like descriptor for read/
    /// write, for either a pass-through Regular handle or a Script
    /// handle (both are read via `pread`-style access on a plain file).
    pub fn as_file(&self, op: &'static str, fh: u64) -> Result<&File, ScriptFsError> {
        match &self.kind {
            HandleKind::Regular(f) | HandleKind::Script(f) => Ok(f),
            HandleKind::Dir(_) => Err(ScriptFsError::WrongHandleKind { op, fh }),
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self.kind, HandleKind::Script(_))
    }
}

/// Registry of currently open handles, keyed by an opaque `fh` allocated
/// here (distinct from inode numbers).
pub struct HandleRegistry {
    handles: HashMap<u64, OpenHandle>,
    next_fh: u64,
}

impl HandleRegistry {
    pub fn new() -> HandleRegistry {
        HandleRegistry {
            handles: HashMap::new(),
            next_fh: 1,
        }
    }

    pub fn insert(&mut self, handle: OpenHandle) -> u64 {
        let fh = self.next_fh;
        self.next_fh += 1;
        self.handles.insert(fh, handle);
        fh
    }

    pub fn get(&self, fh: u64) -> Result<&OpenHandle, ScriptFsError> {
        self.handles.get(&fh).ok_or(ScriptFsError::BadHandle(fh))
    }

    pub fn get_mut(&mut self, fh: u64) -> Result<&mut OpenHandle, ScriptFsError> {
        self.handles.get_mut(&fh).ok_or(ScriptFsError::BadHandle(fh))
    }

    /// Releases `fh`. For a Script handle this is the point at which the
    /// artifact's descriptor closes — already unlinked, so this is the
    /// last reference (spec.md §3 invariant 2, §4.7 `release`).
    pub fn remove(&mut self, fh: u64) -> Option<OpenHandle> {
        self.handles.remove(&fh)
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
