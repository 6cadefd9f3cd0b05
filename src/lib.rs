//! A FUSE filesystem that overlays a directory (the mirror) and, for any
//! file classified as a script by a configured list of Procedures,
//! replaces its read-time content with the standard output of running
//! that file's configured program. Non-script files pass through to the
//! mirror unchanged.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod handle;
pub mod inode;
pub mod procedure;
pub mod process;
pub mod temp_artifact;
pub mod test_eval;

pub use error::{Result, ScriptFsError};
pub use fs::ScriptFs;
