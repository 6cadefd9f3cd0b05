//! Inode <-> mirror-relative-path table.
//!
//! FUSE3 (via `fuser`) addresses everything by inode number, unlike the
//! original ScriptFS's path-based libfuse2 callbacks. This table is pure
//! naming plumbing required by the chosen binding (spec.md §1 calls the
//! binding itself out-of-scope/plumbing); it caches no file content or
//! metadata and is consulted, never mutated as a side effect, by
//! classification or materialization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const ROOT_INO: u64 = 1;

struct Entry {
    relative_path: PathBuf,
    lookup_count: u64,
}

pub struct InodeTable {
    entries: HashMap<u64, Entry>,
    by_path: HashMap<PathBuf, u64>,
    next_ino: u64,
}

impl InodeTable {
    pub fn new() -> InodeTable {
        let mut entries = HashMap::new();
        let mut by_path = HashMap::new();
        let root = PathBuf::from(".");
        entries.insert(
            ROOT_INO,
            Entry {
                relative_path: root.clone(),
                lookup_count: 1,
            },
        );
        by_path.insert(root, ROOT_INO);
        InodeTable {
            entries,
            by_path,
            next_ino: ROOT_INO + 1,
        }
    }

    pub fn path_of(&self, ino: u64) -> Option<&Path> {
        self.entries.get(&ino).map(|e| e.relative_path.as_path())
    }

    /// Returns the inode for `relative`, allocating one and bumping its
    /// lookup count (FUSE `lookup` semantics) if it does not already
    /// exist.
    pub fn lookup(&mut self, relative: &Path) -> u64 {
        if let Some(&ino) = self.by_path.get(relative) {
            self.entries.get_mut(&ino).unwrap().lookup_count += 1;
            return ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.entries.insert(
            ino,
            Entry {
                relative_path: relative.to_path_buf(),
                lookup_count: 1,
            },
        );
        self.by_path.insert(relative.to_path_buf(), ino);
        ino
    }

    /// Decrements `ino`'s lookup count by `nlookup`, evicting it once it
    /// reaches zero (FUSE `forget`). The root inode is never evicted.
    pub fn forget(&mut self, ino: u64, nlookup: u64) {
        if ino == ROOT_INO {
            return;
        }
        if let Some(entry) = self.entries.get_mut(&ino) {
            entry.lookup_count = entry.lookup_count.saturating_sub(nlookup);
            if entry.lookup_count == 0 {
                let path = entry.relative_path.clone();
                self.entries.remove(&ino);
                self.by_path.remove(&path);
            }
        }
    }

    /// Renames the table entry for `from` to `to`, if one exists,
    /// keeping inode numbers stable across a mirror rename.
    pub fn rename(&mut self, from: &Path, to: &Path) {
        if let Some(ino) = self.by_path.remove(from) {
            if let Some(entry) = self.entries.get_mut(&ino) {
                entry.relative_path = to.to_path_buf();
            }
            self.by_path.insert(to.to_path_buf(), ino);
        }
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_preallocated() {
        let table = InodeTable::new();
        assert_eq!(table.path_of(ROOT_INO), Some(Path::new(".")));
    }

    #[test]
    fn lookup_allocates_and_reuses() {
        let mut table = InodeTable::new();
        let a = table.lookup(Path::new("foo"));
        let b = table.lookup(Path::new("foo"));
        assert_eq!(a, b);
        assert_ne!(a, ROOT_INO);
    }

    #[test]
    fn forget_evicts_at_zero() {
        let mut table = InodeTable::new();
        let ino = table.lookup(Path::new("foo"));
        table.forget(ino, 1);
        // Next lookup allocates a fresh inode number since the old
        // entry was evicted.
        let ino2 = table.lookup(Path::new("foo"));
        assert_ne!(ino, ino2);
    }
}
