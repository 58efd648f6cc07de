//! lazy commit ancestry traversal

use std::collections::HashSet;
use std::fmt;

use tracing::trace;

use crate::error::Result;
use crate::hash::ObjectId;
use crate::object::read_commit;
use crate::store::{ObjectStore, Storage};
use crate::types::Commit;

/// commit with its id for log output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: ObjectId,
    pub commit: Commit,
}

/// walk the ancestry of `start`
///
/// commits come out depth-first with the first parent explored before the
/// others, so a linear history is produced newest first. every commit is
/// yielded at most once even when lineages reconverge. the iterator stops
/// after yielding an error.
pub fn walk<S: Storage>(store: &ObjectStore<S>, start: ObjectId) -> Walk<'_, S> {
    Walk {
        store,
        pending: vec![start],
        visited: HashSet::new(),
        first_parent: false,
        failed: false,
    }
}

/// iterator returned by [`walk`]
pub struct Walk<'a, S: Storage> {
    store: &'a ObjectStore<S>,
    pending: Vec<ObjectId>,
    visited: HashSet<ObjectId>,
    first_parent: bool,
    failed: bool,
}

impl<'a, S: Storage> Walk<'a, S> {
    /// follow only the first parent of each commit
    pub fn first_parent_only(mut self) -> Self {
        self.first_parent = true;
        self
    }
}

impl<'a, S: Storage> Iterator for Walk<'a, S> {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        while let Some(id) = self.pending.pop() {
            if !self.visited.insert(id) {
                trace!(%id, "already visited");
                continue;
            }

            let commit = match read_commit(self.store, &id) {
                Ok(commit) => commit,
                Err(e) => {
                    self.failed = true;
                    self.pending.clear();
                    return Some(Err(e));
                }
            };

            // pushed in reverse so the first parent is popped next
            if self.first_parent {
                self.pending.extend(commit.first_parent().copied());
            } else {
                self.pending.extend(commit.parents.iter().rev().copied());
            }

            trace!(%id, parents = commit.parents.len(), "walked commit");
            return Some(Ok(LogEntry { id, commit }));
        }

        None
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "commit {}", self.id)?;
        if self.commit.is_merge() {
            let parents: Vec<String> = self.commit.parents.iter().map(|p| p.short()).collect();
            writeln!(f, "Merge: {}", parents.join(" "))?;
        }
        writeln!(f, "Author: {}", self.commit.author)?;

        writeln!(f)?;
        for line in self.commit.message.lines() {
            writeln!(f, "    {}", line)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::object::{write_commit, write_tree};
    use crate::store::MemoryStorage;
    use crate::types::Tree;

    fn store() -> ObjectStore<MemoryStorage> {
        ObjectStore::new(MemoryStorage::new())
    }

    fn commit(store: &ObjectStore<MemoryStorage>, parents: Vec<ObjectId>, message: &str) -> ObjectId {
        let tree = write_tree(store, &Tree::empty()).unwrap();
        let commit = Commit::new(tree, parents, "Test <test@example.com> 0 +0000", message);
        write_commit(store, &commit).unwrap()
    }

    fn messages(entries: Vec<Result<LogEntry>>) -> Vec<String> {
        entries
            .into_iter()
            .map(|e| e.unwrap().commit.message)
            .collect()
    }

    #[test]
    fn test_root_commit_yields_one() {
        let store = store();
        let root = commit(&store, vec![], "root");

        let entries: Vec<_> = walk(&store, root).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].as_ref().unwrap().id, root);
    }

    #[test]
    fn test_linear_history_newest_first() {
        let store = store();
        let c1 = commit(&store, vec![], "one");
        let c2 = commit(&store, vec![c1], "two");
        let c3 = commit(&store, vec![c2], "three");

        assert_eq!(messages(walk(&store, c3).collect()), ["three", "two", "one"]);
    }

    #[test]
    fn test_diamond_visits_shared_ancestor_once() {
        let store = store();
        let base = commit(&store, vec![], "base");
        let left = commit(&store, vec![base], "left");
        let right = commit(&store, vec![base], "right");
        let merge = commit(&store, vec![left, right], "merge");

        let walked = messages(walk(&store, merge).collect());
        assert_eq!(walked, ["merge", "left", "base", "right"]);
    }

    #[test]
    fn test_first_parent_only() {
        let store = store();
        let base = commit(&store, vec![], "base");
        let side = commit(&store, vec![base], "side");
        let main = commit(&store, vec![base], "main");
        let merge = commit(&store, vec![main, side], "merge");

        let walked = messages(walk(&store, merge).first_parent_only().collect());
        assert_eq!(walked, ["merge", "main", "base"]);
    }

    #[test]
    fn test_walk_is_restartable() {
        let store = store();
        let base = commit(&store, vec![], "base");
        let a = commit(&store, vec![base], "a");
        let b = commit(&store, vec![base], "b");
        let merge = commit(&store, vec![a, b], "merge");

        let first: Vec<ObjectId> = walk(&store, merge).map(|e| e.unwrap().id).collect();
        let second: Vec<ObjectId> = walk(&store, merge).map(|e| e.unwrap().id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_walk_is_lazy() {
        let store = store();
        let mut tip = commit(&store, vec![], "c0");
        for i in 1..10 {
            tip = commit(&store, vec![tip], &format!("c{}", i));
        }

        let taken = messages(walk(&store, tip).take(2).collect());
        assert_eq!(taken, ["c9", "c8"]);
    }

    #[test]
    fn test_missing_parent_stops_walk() {
        let store = store();
        let missing = ObjectId::from_hex("1111111111111111111111111111111111111111").unwrap();
        let tip = commit(&store, vec![missing], "orphan");

        let mut iter = walk(&store, tip);
        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(iter.next(), Some(Err(Error::ObjectNotFound(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_walk_from_non_commit() {
        let store = store();
        let tree = write_tree(&store, &Tree::empty()).unwrap();

        let mut iter = walk(&store, tree);
        assert!(matches!(iter.next(), Some(Err(Error::UnexpectedKind { .. }))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_log_entry_display() {
        let store = store();
        let id = commit(&store, vec![], "subject\n\nbody line");

        let entry = walk(&store, id).next().unwrap().unwrap();
        let display = entry.to_string();

        assert!(display.starts_with(&format!("commit {}\n", id)));
        assert!(display.contains("Author: Test <test@example.com> 0 +0000"));
        assert!(display.contains("    subject\n"));
        assert!(display.contains("    body line\n"));
        assert!(!display.contains("Merge:"));
    }
}
