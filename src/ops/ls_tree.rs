use std::fmt;

use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::object::{read_object, read_tree, Object};
use crate::refs::resolve_revision;
use crate::repo::Repo;
use crate::store::{ObjectStore, Storage};
use crate::types::TreeEntry;

/// tree entry with its path from the listed root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsTreeEntry {
    pub path: String,
    pub entry: TreeEntry,
}

impl fmt::Display for LsTreeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}\t{}",
            self.entry.mode.as_str(),
            self.entry.mode.object_type(),
            self.entry.id,
            self.path
        )
    }
}

/// list the tree named by `rev` (a commit or a tree)
///
/// with `recursive`, subtrees are expanded in place and only non-directory
/// entries are listed.
pub fn ls_tree(repo: &Repo, rev: &str, recursive: bool) -> Result<Vec<LsTreeEntry>> {
    let id = resolve_revision(repo, rev)?;
    let root = match read_object(repo.store(), &id)? {
        Object::Commit(commit) => commit.tree,
        Object::Tree(_) => id,
        Object::Blob(_) => {
            return Err(Error::UnexpectedKind {
                id,
                expected: "tree",
                found: "blob",
            })
        }
    };

    let mut out = Vec::new();
    list(repo.store(), &root, "", recursive, &mut out)?;
    Ok(out)
}

fn list<S: Storage>(
    store: &ObjectStore<S>,
    tree_id: &ObjectId,
    prefix: &str,
    recursive: bool,
    out: &mut Vec<LsTreeEntry>,
) -> Result<()> {
    let tree = read_tree(store, tree_id)?;

    for entry in tree.into_entries() {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{}/{}", prefix, entry.name)
        };

        if recursive && entry.mode.is_directory() {
            list(store, &entry.id, &path, recursive, out)?;
        } else {
            out.push(LsTreeEntry { path, entry });
        }
    }

    Ok(())
}
