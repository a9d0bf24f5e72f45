//! File-state mirror and snapshot diffing
//!
//! The mirror is the server's in-memory view of the agent filesystem:
//! a path-keyed map seeded from storage at startup and mutated only by
//! the file pipeline. Each incoming snapshot is authoritative over the
//! union of its own paths and everything currently mirrored, so a path
//! missing from a snapshot is a deletion.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use diag_protocol::FileNode;

/// Minimal mutations needed to bring storage and mirror up to a snapshot
///
/// The three lists are disjoint on `path`; an empty set is a valid
/// result (idempotent snapshot replay).
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    /// Paths absent from the mirror before the snapshot
    pub added: Vec<FileNode>,
    /// Paths present before with a material difference
    pub updated: Vec<FileNode>,
    /// Paths present before and absent from the snapshot
    pub deleted: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Total number of classified paths
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.deleted.len()
    }

    /// Verify the three lists are pairwise disjoint on `path`
    ///
    /// The diff upholds this by construction; a violation means the
    /// snapshot must be skipped rather than applied.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.len());
        self.added
            .iter()
            .map(|f| f.path.as_str())
            .chain(self.updated.iter().map(|f| f.path.as_str()))
            .chain(self.deleted.iter().map(String::as_str))
            .all(|path| seen.insert(path))
    }
}

/// In-memory map of path → file record
///
/// Single-writer/many-reader: the file pipeline is the only caller of
/// [`seed`](Self::seed) and [`apply`](Self::apply); everything else may
/// read concurrently. The read lock is held for the diff scan, the
/// write lock only for the brief apply.
#[derive(Debug, Default)]
pub struct FileMirror {
    inner: RwLock<HashMap<String, FileNode>>,
}

impl FileMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mirror contents wholesale; startup only
    pub fn seed(&self, files: Vec<FileNode>) {
        let mut inner = self.inner.write();
        inner.clear();
        inner.extend(files.into_iter().map(|f| (f.path.clone(), f)));
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Look up a single record by path
    pub fn get(&self, path: &str) -> Option<FileNode> {
        self.inner.read().get(path).cloned()
    }

    /// Classify a snapshot against the current mirror
    ///
    /// Walks the mirror under the read lock: a mirrored path present in
    /// the snapshot is `updated` when materially different and dropped
    /// when identical; a mirrored path absent from the snapshot is
    /// `deleted`. Whatever remains of the snapshot afterwards is `added`.
    pub fn diff(&self, snapshot: Vec<FileNode>) -> ChangeSet {
        let mut incoming: HashMap<String, FileNode> = snapshot
            .into_iter()
            .map(|f| (f.path.clone(), f))
            .collect();

        let mut updated = Vec::new();
        let mut deleted = Vec::new();

        {
            let inner = self.inner.read();
            for (path, existing) in inner.iter() {
                match incoming.remove(path) {
                    Some(fresh) => {
                        if existing.differs_materially(&fresh) {
                            updated.push(fresh);
                        }
                    }
                    None => deleted.push(path.clone()),
                }
            }
        }

        ChangeSet {
            added: incoming.into_values().collect(),
            updated,
            deleted,
        }
    }

    /// Apply a change set; call only after storage accepted the same set
    pub fn apply(&self, changes: &ChangeSet) {
        let mut inner = self.inner.write();
        for path in &changes.deleted {
            inner.remove(path);
        }
        for record in changes.added.iter().chain(changes.updated.iter()) {
            inner.insert(record.path.clone(), record.clone());
        }
    }
}

#[cfg(test)]
#[path = "mirror_test.rs"]
mod tests;
