//! object codec: blob, tree and commit payloads
//!
//! - blob: the payload is the file content, unchanged
//! - tree: `"<mode> <name>\0" + 20 raw id bytes` per entry, canonical order
//! - commit: `tree`/`parent`/`author`/`committer` header lines, a blank line,
//!   then the message

mod commit;
mod tree;

pub use commit::{decode_commit, encode_commit};
pub use tree::{decode_tree, encode_tree};

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::store::{ObjectStore, Storage};
use crate::types::{Commit, Tree};

/// the closed set of object kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    /// type tag used in object headers
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            _ => Err(Error::InvalidObjectType(s.to_string())),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a decoded object
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Blob(Vec<u8>),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Blob(_) => ObjectKind::Blob,
            Object::Tree(_) => ObjectKind::Tree,
            Object::Commit(_) => ObjectKind::Commit,
        }
    }

    /// serialize to the payload bytes that get hashed and stored
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Object::Blob(data) => data.clone(),
            Object::Tree(tree) => encode_tree(tree),
            Object::Commit(commit) => encode_commit(commit),
        }
    }

    /// parse payload bytes of the given kind
    pub fn decode(kind: ObjectKind, payload: &[u8]) -> Result<Self> {
        match kind {
            ObjectKind::Blob => Ok(Object::Blob(payload.to_vec())),
            ObjectKind::Tree => decode_tree(payload).map(Object::Tree),
            ObjectKind::Commit => decode_commit(payload).map(Object::Commit),
        }
    }

    /// id this object has (or would have) in the store
    pub fn id(&self) -> ObjectId {
        ObjectId::compute(self.kind(), &self.encode())
    }
}

/// write any object
pub fn write_object<S: Storage>(store: &ObjectStore<S>, object: &Object) -> Result<ObjectId> {
    store.write(object.kind(), &object.encode())
}

/// read and decode any object
pub fn read_object<S: Storage>(store: &ObjectStore<S>, id: &ObjectId) -> Result<Object> {
    let (kind, payload) = store.read(id)?;
    Object::decode(kind, &payload)
}

pub fn write_blob<S: Storage>(store: &ObjectStore<S>, content: &[u8]) -> Result<ObjectId> {
    store.write(ObjectKind::Blob, content)
}

pub fn read_blob<S: Storage>(store: &ObjectStore<S>, id: &ObjectId) -> Result<Vec<u8>> {
    read_expected(store, id, ObjectKind::Blob)
}

pub fn write_tree<S: Storage>(store: &ObjectStore<S>, tree: &Tree) -> Result<ObjectId> {
    store.write(ObjectKind::Tree, &encode_tree(tree))
}

pub fn read_tree<S: Storage>(store: &ObjectStore<S>, id: &ObjectId) -> Result<Tree> {
    decode_tree(&read_expected(store, id, ObjectKind::Tree)?)
}

pub fn write_commit<S: Storage>(store: &ObjectStore<S>, commit: &Commit) -> Result<ObjectId> {
    store.write(ObjectKind::Commit, &encode_commit(commit))
}

pub fn read_commit<S: Storage>(store: &ObjectStore<S>, id: &ObjectId) -> Result<Commit> {
    decode_commit(&read_expected(store, id, ObjectKind::Commit)?)
}

/// read a payload, failing if the stored kind isn't `expected`
fn read_expected<S: Storage>(
    store: &ObjectStore<S>,
    id: &ObjectId,
    expected: ObjectKind,
) -> Result<Vec<u8>> {
    let (kind, payload) = store.read(id)?;
    if kind != expected {
        return Err(Error::UnexpectedKind {
            id: *id,
            expected: expected.as_str(),
            found: kind.as_str(),
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use crate::types::{FileMode, TreeEntry};

    fn store() -> ObjectStore<MemoryStorage> {
        ObjectStore::new(MemoryStorage::new())
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("blob".parse::<ObjectKind>().unwrap(), ObjectKind::Blob);
        assert_eq!("tree".parse::<ObjectKind>().unwrap(), ObjectKind::Tree);
        assert_eq!("commit".parse::<ObjectKind>().unwrap(), ObjectKind::Commit);
        assert!(matches!(
            "tag".parse::<ObjectKind>(),
            Err(Error::InvalidObjectType(_))
        ));
    }

    #[test]
    fn test_blob_is_identity() {
        let obj = Object::Blob(b"raw \0 bytes".to_vec());
        assert_eq!(obj.encode(), b"raw \0 bytes");
        assert_eq!(Object::decode(ObjectKind::Blob, b"raw \0 bytes").unwrap(), obj);
    }

    #[test]
    fn test_object_roundtrip_through_store() {
        let store = store();

        let blob = Object::Blob(b"content".to_vec());
        let blob_id = write_object(&store, &blob).unwrap();

        let tree = Object::Tree(
            Tree::new(vec![TreeEntry::new(FileMode::Regular, "file.txt", blob_id)]).unwrap(),
        );
        let tree_id = write_object(&store, &tree).unwrap();

        let commit = Object::Commit(Commit::new(tree_id, vec![], "a <a@b> 0 +0000", "msg\n"));
        let commit_id = write_object(&store, &commit).unwrap();

        assert_eq!(read_object(&store, &blob_id).unwrap(), blob);
        assert_eq!(read_object(&store, &tree_id).unwrap(), tree);
        assert_eq!(read_object(&store, &commit_id).unwrap(), commit);
        assert_eq!(commit.id(), commit_id);
    }

    #[test]
    fn test_typed_read_checks_kind() {
        let store = store();
        let id = write_blob(&store, b"not a tree").unwrap();

        let result = read_tree(&store, &id);
        assert!(matches!(
            result,
            Err(Error::UnexpectedKind {
                expected: "tree",
                found: "blob",
                ..
            })
        ));
        assert_eq!(read_blob(&store, &id).unwrap(), b"not a tree");
    }

    #[test]
    fn test_empty_tree_id() {
        let store = store();
        let id = write_tree(&store, &Tree::empty()).unwrap();
        assert_eq!(id.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
        assert!(read_tree(&store, &id).unwrap().is_empty());
    }
}
