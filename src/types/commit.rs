use crate::error::{Error, Result};
use crate::hash::ObjectId;

/// headers the commit codec owns; extra headers can't reuse them
pub const RESERVED_HEADERS: [&str; 4] = ["tree", "parent", "author", "committer"];

/// a commit object pointing to a tree with authorship metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// root tree id
    pub tree: ObjectId,
    /// parent commit ids (empty for initial, 1 for linear, 2+ for merge)
    pub parents: Vec<ObjectId>,
    /// author identity line, e.g. `Name <email> 1700000000 +0000`
    pub author: String,
    /// committer identity line
    pub committer: String,
    /// headers other than tree/parent/author/committer, in encounter order
    pub(crate) extra_headers: Vec<(String, String)>,
    /// commit message
    pub message: String,
}

impl Commit {
    /// create a new commit where author and committer are the same identity
    pub fn new(
        tree: ObjectId,
        parents: Vec<ObjectId>,
        identity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let identity = identity.into();
        Self {
            tree,
            parents,
            author: identity.clone(),
            committer: identity,
            extra_headers: Vec::new(),
            message: message.into(),
        }
    }

    /// override the committer identity
    pub fn with_committer(mut self, committer: impl Into<String>) -> Self {
        self.committer = committer.into();
        self
    }

    /// add an extra header
    ///
    /// the key must be a single non-empty word that isn't one of
    /// [`RESERVED_HEADERS`]; the value may span lines.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_header_key(&key)?;
        self.extra_headers.push((key, value.into()));
        Ok(self)
    }

    /// extra headers in the order they were added or decoded
    pub fn extra_headers(&self) -> &[(String, String)] {
        &self.extra_headers
    }

    /// is this an initial commit (no parents)
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// is this a merge commit (multiple parents)
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn first_parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    /// first line of the message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

fn validate_header_key(key: &str) -> Result<()> {
    if key.is_empty() || key.chars().any(|c| c == ' ' || c == '\n' || c == '\0') {
        return Err(Error::malformed("commit", format!("invalid header key {:?}", key)));
    }
    if RESERVED_HEADERS.contains(&key) {
        return Err(Error::malformed("commit", format!("header key {:?} is reserved", key)));
    }
    Ok(())
}
