//! Domain-specific error type for scriptfs.
//!
//! Mirrors the shape of the teacher crate's error enum: one variant per
//! failure mode, each carrying enough context to log usefully. At the
//! FUSE trait boundary these are translated to a raw errno via
//! [`ScriptFsError::to_errno`]; nothing panics across that boundary.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScriptFsError {
    #[error("no such file or directory: {0:?}")]
    NotFound(PathBuf),

    #[error("bad handle (fh {0})")]
    BadHandle(u64),

    #[error("handle kind mismatch for {op} on fh {fh}")]
    WrongHandleKind { op: &'static str, fh: u64 },

    #[error("failed to classify {path:?}: {source}")]
    Classify {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create temp artifact in {template:?}: {source}")]
    TempArtifact {
        template: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("mirror operation failed: {0}")]
    Mirror(#[source] nix::Error),
}

impl ScriptFsError {
    /// Translates this error into the `libc::c_int` errno FUSE expects as
    /// the negative reply code. Never panics.
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            ScriptFsError::NotFound(_) => libc::ENOENT,
            ScriptFsError::BadHandle(_) => libc::EBADF,
            ScriptFsError::WrongHandleKind { .. } => libc::EBADF,
            ScriptFsError::Classify { .. } => libc::EIO,
            ScriptFsError::Spawn { .. } => libc::EIO,
            ScriptFsError::TempArtifact { .. } => libc::EIO,
            ScriptFsError::Mirror(errno) => *errno as libc::c_int,
        }
    }
}

impl From<nix::Error> for ScriptFsError {
    fn from(e: nix::Error) -> Self {
        ScriptFsError::Mirror(e)
    }
}

pub type Result<T> = std::result::Result<T, ScriptFsError>;
