mod commit;
mod tree;

pub use commit::{Commit, RESERVED_HEADERS};
pub use tree::{FileMode, Tree, TreeEntry};
