//! staging index: a flat map of paths to blob ids
//!
//! persisted as a CBOR document in `<meta>/index`. the layout is private to
//! this crate and only has to round-trip `(path, mode, id)` entries.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::ObjectId;
use crate::object::{write_blob, write_tree};
use crate::repo::{Repo, META_DIR};
use crate::store::{ObjectStore, Storage};
use crate::types::{FileMode, Tree, TreeEntry};

/// version tag written into every index file
const INDEX_VERSION: u32 = 1;

/// one staged file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
    pub mode: FileMode,
    pub id: ObjectId,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    entries: Vec<IndexEntry>,
}

/// the staging area
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Index {
    entries: BTreeMap<String, IndexEntry>,
}

/// a directory's content as seen from inside it: (relative path, mode, id)
type Fingerprint = Vec<(String, FileMode, ObjectId)>;

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// load the repository's index; a missing index file is an empty index
    pub fn load(repo: &Repo) -> Result<Self> {
        let path = repo.index_path();
        match std::fs::read(&path) {
            Ok(bytes) => Self::from_bytes(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e).with_path(&path),
        }
    }

    /// persist the index atomically
    pub fn save(&self, repo: &Repo) -> Result<()> {
        repo.write_file_atomic(&repo.index_path(), &self.to_bytes()?)?;
        debug!(entries = self.len(), "saved index");
        Ok(())
    }

    /// serialize to the on-disk representation
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let file = IndexFile {
            version: INDEX_VERSION,
            entries: self.entries.values().cloned().collect(),
        };
        let mut bytes = Vec::new();
        ciborium::into_writer(&file, &mut bytes)?;
        Ok(bytes)
    }

    /// parse the on-disk representation
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let file: IndexFile = ciborium::from_reader(bytes)?;
        if file.version != INDEX_VERSION {
            return Err(Error::CorruptIndex(format!(
                "unsupported index version {}",
                file.version
            )));
        }

        let mut entries = BTreeMap::new();
        for entry in file.entries {
            if entries.insert(entry.path.clone(), entry).is_some() {
                return Err(Error::CorruptIndex("duplicate path".to_string()));
            }
        }
        Ok(Self { entries })
    }

    /// write `content` as a blob and stage it at `path`
    pub fn add_entry<S: Storage>(
        &mut self,
        store: &ObjectStore<S>,
        path: &str,
        mode: FileMode,
        content: &[u8],
    ) -> Result<ObjectId> {
        if mode.is_directory() {
            return Err(Error::InvalidMode(format!(
                "cannot stage a directory entry at {}",
                path
            )));
        }
        let path = normalize_path(path)?;
        let id = write_blob(store, content)?;
        self.insert(IndexEntry { path, mode, id });
        Ok(id)
    }

    /// stage an entry whose blob is already stored
    ///
    /// evicts entries that would turn `path` into both a file and a directory.
    pub fn insert(&mut self, entry: IndexEntry) {
        // "a" staged as file, now adding "a/b"
        let mut ancestor = entry.path.as_str();
        while let Some((parent, _)) = ancestor.rsplit_once('/') {
            if self.entries.remove(parent).is_some() {
                trace!(path = parent, "unstaged file replaced by directory");
            }
            ancestor = parent;
        }

        // "a/..." staged, now adding file "a"
        let dir_prefix = format!("{}/", entry.path);
        self.entries.retain(|k, _| !k.starts_with(&dir_prefix));

        trace!(path = %entry.path, id = %entry.id, "staged");
        self.entries.insert(entry.path.clone(), entry);
    }

    /// unstage a path, returning whether it was staged
    pub fn remove(&mut self, path: &str) -> Result<bool> {
        let path = normalize_path(path)?;
        Ok(self.entries.remove(&path).is_some())
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    /// entries in path order
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// build nested tree objects from the flat entries, returning the root id
    ///
    /// paths are grouped by their first component and each directory is
    /// built bottom-up. directories with identical content are built once
    /// per call.
    pub fn build_tree<S: Storage>(&self, store: &ObjectStore<S>) -> Result<ObjectId> {
        let flat: Vec<(&str, FileMode, ObjectId)> = self
            .entries
            .values()
            .map(|e| (e.path.as_str(), e.mode, e.id))
            .collect();

        let mut memo = HashMap::new();
        let root = build_dir(store, &flat, &mut memo)?;
        debug!(%root, directories = memo.len(), "built tree from index");
        Ok(root)
    }
}

/// build one directory from the entries below it (paths relative to it)
fn build_dir<S: Storage>(
    store: &ObjectStore<S>,
    entries: &[(&str, FileMode, ObjectId)],
    memo: &mut HashMap<Fingerprint, ObjectId>,
) -> Result<ObjectId> {
    let fingerprint: Fingerprint = entries
        .iter()
        .map(|(path, mode, id)| (path.to_string(), *mode, *id))
        .collect();
    if let Some(id) = memo.get(&fingerprint) {
        trace!(%id, "reusing identical subtree");
        return Ok(*id);
    }

    let mut tree_entries = Vec::new();
    let mut subdirs: BTreeMap<&str, Vec<(&str, FileMode, ObjectId)>> = BTreeMap::new();

    for &(path, mode, id) in entries {
        match path.split_once('/') {
            Some((head, rest)) => subdirs.entry(head).or_default().push((rest, mode, id)),
            None => tree_entries.push(TreeEntry::new(mode, path, id)),
        }
    }

    for (name, children) in subdirs {
        let sub = build_dir(store, &children, memo)?;
        tree_entries.push(TreeEntry::new(FileMode::Directory, name, sub));
    }

    let id = write_tree(store, &Tree::new(tree_entries)?)?;
    memo.insert(fingerprint, id);
    Ok(id)
}

/// normalize a staged path to `a/b/c` form
fn normalize_path(path: &str) -> Result<String> {
    let mut parts = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => return Err(Error::InvalidPath(format!("'..' in {}", path))),
            c if c.contains('\0') => {
                return Err(Error::InvalidPath(format!("null byte in {:?}", path)))
            }
            META_DIR => return Err(Error::InvalidPath(format!("{} is reserved", path))),
            c => parts.push(c),
        }
    }
    if parts.is_empty() {
        return Err(Error::InvalidPath(format!("empty path {:?}", path)));
    }
    Ok(parts.join("/"))
}
