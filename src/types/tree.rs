use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::ObjectId;

/// mode of a tree entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    /// regular file (100644)
    Regular,
    /// executable file (100755)
    Executable,
    /// symbolic link, blob holds the target (120000)
    Symlink,
    /// subdirectory, id names a tree (40000)
    Directory,
}

impl FileMode {
    /// canonical octal text used in tree payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Symlink => "120000",
            FileMode::Directory => "40000",
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileMode::Directory)
    }

    /// kind of object this mode points at
    pub fn object_type(&self) -> &'static str {
        if self.is_directory() {
            "tree"
        } else {
            "blob"
        }
    }
}

impl FromStr for FileMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "100644" => Ok(FileMode::Regular),
            "100755" => Ok(FileMode::Executable),
            "120000" => Ok(FileMode::Symlink),
            "40000" | "040000" => Ok(FileMode::Directory),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a directory snapshot - entries kept in canonical order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// create a new tree, validating and sorting entries
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            validate_entry_name(&entry.name)?;
            // "a" as a file and "a" as a directory don't sort next to each other
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::DuplicateEntryName(entry.name.clone()));
            }
        }

        entries.sort_by(TreeEntry::canonical_cmp);

        Ok(Self { entries })
    }

    /// create an empty tree
    pub fn empty() -> Self {
        Self { entries: vec![] }
    }

    /// get entries slice
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// consume and return entries
    pub fn into_entries(self) -> Vec<TreeEntry> {
        self.entries
    }

    /// look up entry by name
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// is tree empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// validate an entry name
fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidEntryName("empty name".to_string()));
    }
    if name.contains('/') {
        return Err(Error::InvalidEntryName(format!(
            "name contains '/': {}",
            name
        )));
    }
    if name.contains('\0') {
        return Err(Error::InvalidEntryName(format!(
            "name contains null byte: {}",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidEntryName(format!("reserved name: {}", name)));
    }
    Ok(())
}

/// a single entry in a tree
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: String,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: FileMode, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }

    /// compare by name, with directories sorting as if named `<name>/`
    pub fn canonical_cmp(a: &TreeEntry, b: &TreeEntry) -> Ordering {
        sort_key(a).cmp(&sort_key(b))
    }
}

fn sort_key(entry: &TreeEntry) -> Vec<u8> {
    let mut key = entry.name.as_bytes().to_vec();
    if entry.mode.is_directory() {
        key.push(b'/');
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(name: &str) -> TreeEntry {
        TreeEntry::new(FileMode::Regular, name, ObjectId::ZERO)
    }

    fn dir(name: &str) -> TreeEntry {
        TreeEntry::new(FileMode::Directory, name, ObjectId::ZERO)
    }

    #[test]
    fn test_tree_empty() {
        let t = Tree::empty();
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn test_tree_sorting() {
        let tree = Tree::new(vec![blob("zebra"), blob("alpha"), blob("beta")]).unwrap();
        let names: Vec<_> = tree.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "zebra"]);
    }

    #[test]
    fn test_directory_sorts_with_trailing_separator() {
        // "a/" sorts after "a.txt" ('/' > '.') but before "a0" ('/' < '0')
        let tree = Tree::new(vec![blob("a0"), dir("a"), blob("a.txt")]).unwrap();
        let names: Vec<_> = tree.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "a", "a0"]);

        // a plain file named "a" sorts first
        let tree = Tree::new(vec![blob("a.txt"), blob("a")]).unwrap();
        assert_eq!(tree.entries()[0].name, "a");
    }

    #[test]
    fn test_tree_get() {
        let tree = Tree::new(vec![blob("alpha"), dir("beta")]).unwrap();
        assert!(tree.get("alpha").is_some());
        assert_eq!(tree.get("beta").unwrap().mode, FileMode::Directory);
        assert!(tree.get("gamma").is_none());
    }

    #[test]
    fn test_tree_rejects_bad_names() {
        assert!(Tree::new(vec![blob("")]).is_err());
        assert!(Tree::new(vec![blob("foo/bar")]).is_err());
        assert!(Tree::new(vec![blob("foo\0bar")]).is_err());
        assert!(Tree::new(vec![blob(".")]).is_err());
        assert!(Tree::new(vec![blob("..")]).is_err());
    }

    #[test]
    fn test_tree_rejects_duplicates() {
        let result = Tree::new(vec![blob("same"), blob("same")]);
        assert!(matches!(result, Err(Error::DuplicateEntryName(_))));

        // same name as file and directory is still a duplicate
        let result = Tree::new(vec![blob("a"), blob("a.txt"), dir("a")]);
        assert!(matches!(result, Err(Error::DuplicateEntryName(_))));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("100644".parse::<FileMode>().unwrap(), FileMode::Regular);
        assert_eq!("100755".parse::<FileMode>().unwrap(), FileMode::Executable);
        assert_eq!("120000".parse::<FileMode>().unwrap(), FileMode::Symlink);
        assert_eq!("40000".parse::<FileMode>().unwrap(), FileMode::Directory);
        assert_eq!("040000".parse::<FileMode>().unwrap(), FileMode::Directory);

        let err = "100600".parse::<FileMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidMode(m) if m == "100600"));
    }

    #[test]
    fn test_mode_object_type() {
        assert_eq!(FileMode::Directory.object_type(), "tree");
        assert_eq!(FileMode::Symlink.object_type(), "blob");
    }
}
