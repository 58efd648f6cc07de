//! high-level operations on wyrm repositories

mod add;
mod commit;
mod log;
mod ls_tree;
mod objects;

pub use add::add;
pub use commit::{commit, commit_as, DEFAULT_IDENTITY};
pub use log::log;
pub use ls_tree::{ls_tree, LsTreeEntry};
pub use objects::{cat_file, hash_object};
