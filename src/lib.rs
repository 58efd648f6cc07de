//! wyrm - content-addressed object store with a git-like commit graph
//!
//! a small version-control core: file contents, directory snapshots and
//! commits are stored as immutable objects named by the SHA-1 of their
//! serialized form, and named refs point into the resulting graph.
//!
//! # Core concepts
//!
//! - **Blob**: raw file content
//! - **Tree**: a directory listing of `(mode, name, id)` entries in canonical order
//! - **Commit**: a root tree, zero or more parents, identities and a message
//! - **Ref**: a file holding an object id or `ref: <other ref>`
//! - **Index**: the staging area that turns a flat path map into trees
//!
//! # Object format
//!
//! id = SHA-1("<kind> <payload-len>\0" | payload)
//!
//! on disk each object is zstd-compressed under `objects/<2 hex>/<38 hex>`.
//!
//! # Example usage
//!
//! ```no_run
//! use wyrm::{ops, Repo};
//! use std::path::{Path, PathBuf};
//!
//! // initialize a repository
//! let repo = Repo::init(Path::new("/path/to/worktree")).unwrap();
//!
//! // stage a file and commit it on the current branch
//! ops::add(&repo, &[PathBuf::from("/path/to/worktree/hello.txt")]).unwrap();
//! let id = ops::commit(&repo, "Initial commit", None).unwrap();
//!
//! // walk history
//! for entry in ops::log(&repo, "HEAD", None, false).unwrap() {
//!     println!("{}", entry);
//! }
//! # let _ = id;
//! ```

mod config;
mod error;
mod hash;
mod repo;

pub mod graph;
pub mod index;
pub mod object;
pub mod ops;
pub mod refs;
pub mod store;
pub mod types;

pub use config::{Config, CoreConfig, UserConfig, DEFAULT_BRANCH, FORMAT_VERSION};
pub use error::{Error, Result};
pub use hash::{ObjectId, HEX_LEN, ID_LEN};
pub use graph::{walk, LogEntry, Walk};
pub use index::{Index, IndexEntry};
pub use object::{
    read_blob, read_commit, read_object, read_tree, write_blob, write_commit, write_object,
    write_tree, Object, ObjectKind,
};
pub use refs::{read_ref, resolve_ref, resolve_revision, update_ref, RefValue};
pub use repo::{Repo, META_DIR};
pub use store::{FsStorage, MemoryStorage, ObjectStore, Storage};
pub use types::{Commit, FileMode, Tree, TreeEntry};
