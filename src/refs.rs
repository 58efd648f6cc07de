//! references: HEAD, branches and tags
//!
//! a ref file holds either 40 hex chars (direct) or `ref: <name>`
//! (symbolic). ref names are relative to the metadata directory, e.g.
//! `HEAD` or `refs/heads/main`.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::ObjectId;
use crate::repo::Repo;

/// the symbolic ref naming the current branch
pub const HEAD: &str = "HEAD";

/// branch namespace
pub const HEADS_PREFIX: &str = "refs/heads/";

/// tag namespace
pub const TAGS_PREFIX: &str = "refs/tags/";

/// most symbolic hops followed before giving up
pub const MAX_SYMREF_DEPTH: usize = 5;

const SYMREF_MARKER: &str = "ref: ";

/// parsed content of a ref file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefValue {
    Direct(ObjectId),
    Symbolic(String),
}

impl RefValue {
    fn parse(name: &str, content: &str) -> Result<Self> {
        let trimmed = content.trim();
        if let Some(target) = trimmed.strip_prefix(SYMREF_MARKER) {
            let target = target.trim();
            validate_ref_name(target)?;
            return Ok(RefValue::Symbolic(target.to_string()));
        }
        ObjectId::from_hex(trimmed)
            .map(RefValue::Direct)
            .map_err(|_| Error::MalformedRef {
                name: name.to_string(),
                content: content.to_string(),
            })
    }
}

impl fmt::Display for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefValue::Direct(id) => writeln!(f, "{}", id),
            RefValue::Symbolic(target) => writeln!(f, "{}{}", SYMREF_MARKER, target),
        }
    }
}

/// full ref name for a branch
pub fn branch_ref(branch: &str) -> String {
    format!("{}{}", HEADS_PREFIX, branch)
}

/// full ref name for a tag
pub fn tag_ref(tag: &str) -> String {
    format!("{}{}", TAGS_PREFIX, tag)
}

/// read one ref without following it
pub fn read_ref(repo: &Repo, name: &str) -> Result<RefValue> {
    validate_ref_name(name)?;
    let ref_path = ref_path(repo, name);

    let content = fs::read_to_string(&ref_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::RefNotFound(name.to_string())
        } else {
            Error::Io {
                path: ref_path.clone(),
                source: e,
            }
        }
    })?;

    RefValue::parse(name, &content)
}

/// resolve a ref to an object id, following symbolic refs
pub fn resolve_ref(repo: &Repo, name: &str) -> Result<ObjectId> {
    let (last, value) = follow(repo, name)?;
    match value {
        Some(id) => Ok(id),
        None => Err(Error::RefNotFound(last)),
    }
}

/// the ref a new commit should update
///
/// follows symbolic refs from `name` and returns the last ref in the chain.
/// for an attached HEAD this is the branch, even if that branch does not
/// exist yet. for a detached HEAD it is HEAD itself.
pub fn ref_target(repo: &Repo, name: &str) -> Result<(String, Option<ObjectId>)> {
    follow(repo, name)
}

/// walk a symbolic chain; returns the final name and its id, if it exists
fn follow(repo: &Repo, name: &str) -> Result<(String, Option<ObjectId>)> {
    let mut seen = HashSet::new();
    let mut current = name.to_string();

    for _ in 0..=MAX_SYMREF_DEPTH {
        if !seen.insert(current.clone()) {
            return Err(Error::RefCycle(name.to_string()));
        }

        match read_ref(repo, &current) {
            Ok(RefValue::Direct(id)) => return Ok((current, Some(id))),
            Ok(RefValue::Symbolic(target)) => {
                trace!(from = %current, to = %target, "following symbolic ref");
                current = target;
            }
            // the start must exist; a dangling tail is an unborn branch
            Err(Error::RefNotFound(_)) if current != name => return Ok((current, None)),
            Err(e) => return Err(e),
        }
    }

    Err(Error::RefCycle(name.to_string()))
}

/// point a ref directly at an object (create or update)
pub fn update_ref(repo: &Repo, name: &str, id: &ObjectId) -> Result<()> {
    validate_ref_name(name)?;
    let value = RefValue::Direct(*id);
    repo.write_file_atomic(&ref_path(repo, name), value.to_string().as_bytes())?;
    debug!(ref_name = name, %id, "updated ref");
    Ok(())
}

/// make `name` a symbolic ref to `target`
pub fn write_symbolic_ref(repo: &Repo, name: &str, target: &str) -> Result<()> {
    validate_ref_name(name)?;
    validate_ref_name(target)?;
    let value = RefValue::Symbolic(target.to_string());
    repo.write_file_atomic(&ref_path(repo, name), value.to_string().as_bytes())?;
    debug!(ref_name = name, to = target, "updated symbolic ref");
    Ok(())
}

/// check if a ref exists
pub fn ref_exists(repo: &Repo, name: &str) -> bool {
    validate_ref_name(name).is_ok() && ref_path(repo, name).is_file()
}

/// create a new branch pointing at `start`
pub fn create_branch(repo: &Repo, branch: &str, start: &ObjectId) -> Result<()> {
    let name = branch_ref(branch);
    validate_ref_name(&name)?;
    if ref_exists(repo, &name) {
        return Err(Error::RefExists(branch.to_string()));
    }
    update_ref(repo, &name, start)?;
    info!(branch, %start, "created branch");
    Ok(())
}

/// delete a branch; the checked-out branch can't be deleted
pub fn delete_branch(repo: &Repo, branch: &str) -> Result<()> {
    if current_branch(repo)?.as_deref() == Some(branch) {
        return Err(Error::BranchCheckedOut(branch.to_string()));
    }

    let name = branch_ref(branch);
    validate_ref_name(&name)?;
    let path = ref_path(repo, &name);
    fs::remove_file(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::RefNotFound(name.clone())
        } else {
            Error::Io { path, source: e }
        }
    })?;
    info!(branch, "deleted branch");
    Ok(())
}

/// all branch names (without the `refs/heads/` prefix)
pub fn list_branches(repo: &Repo) -> Result<BTreeSet<String>> {
    collect_names(&repo.heads_path())
}

/// branch names matching a glob pattern
pub fn list_branches_matching(repo: &Repo, pattern: &str) -> Result<BTreeSet<String>> {
    let glob = glob::Pattern::new(pattern).map_err(|e| Error::InvalidRef(e.to_string()))?;
    Ok(list_branches(repo)?
        .into_iter()
        .filter(|b| glob.matches(b))
        .collect())
}

/// attach HEAD to an existing branch
///
/// only HEAD changes; the worktree is left alone.
pub fn checkout(repo: &Repo, branch: &str) -> Result<()> {
    let name = branch_ref(branch);
    validate_ref_name(&name)?;
    if !ref_exists(repo, &name) {
        return Err(Error::RefNotFound(name));
    }
    write_symbolic_ref(repo, HEAD, &name)?;
    info!(branch, "switched HEAD");
    Ok(())
}

/// branch HEAD is attached to, `None` when detached
pub fn current_branch(repo: &Repo) -> Result<Option<String>> {
    match read_ref(repo, HEAD)? {
        RefValue::Symbolic(target) => Ok(target.strip_prefix(HEADS_PREFIX).map(str::to_string)),
        RefValue::Direct(_) => Ok(None),
    }
}

/// create a lightweight tag
pub fn create_tag(repo: &Repo, tag: &str, id: &ObjectId) -> Result<()> {
    let name = tag_ref(tag);
    validate_ref_name(&name)?;
    if ref_exists(repo, &name) {
        return Err(Error::RefExists(tag.to_string()));
    }
    update_ref(repo, &name, id)?;
    info!(tag, %id, "created tag");
    Ok(())
}

/// all tag names (without the `refs/tags/` prefix)
pub fn list_tags(repo: &Repo) -> Result<BTreeSet<String>> {
    collect_names(&repo.tags_path())
}

/// resolve a revision string to an object id
///
/// tried in order: HEAD or a full ref name, a branch, a tag, a full hex id,
/// then an abbreviated hex id.
pub fn resolve_revision(repo: &Repo, rev: &str) -> Result<ObjectId> {
    if rev == HEAD || rev.starts_with("refs/") {
        if ref_exists(repo, rev) {
            return resolve_ref(repo, rev);
        }
    } else {
        for name in [branch_ref(rev), tag_ref(rev)] {
            if ref_exists(repo, &name) {
                return resolve_ref(repo, &name);
            }
        }
    }

    let is_hex = rev.len() >= crate::store::MIN_PREFIX_LEN
        && rev.chars().all(|c| c.is_ascii_hexdigit());
    if is_hex {
        return repo.store().resolve_prefix(rev);
    }

    Err(Error::RefNotFound(rev.to_string()))
}

/// get filesystem path for a ref
fn ref_path(repo: &Repo, name: &str) -> PathBuf {
    repo.path().join(name)
}

/// collect ref names below a directory, relative to it
fn collect_names(dir: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    if dir.exists() {
        collect_refs(dir, dir, &mut names)?;
    }
    Ok(names)
}

/// recursively collect refs from directory
fn collect_refs(base: &Path, dir: &Path, refs: &mut BTreeSet<String>) -> Result<()> {
    for entry in fs::read_dir(dir).with_path(dir)? {
        let entry = entry.with_path(dir)?;
        let path = entry.path();

        if path.is_dir() {
            collect_refs(base, &path, refs)?;
        } else if path.is_file() {
            // compute ref name relative to base
            if let Ok(rel) = path.strip_prefix(base) {
                refs.insert(rel.to_string_lossy().to_string());
            }
        }
    }
    Ok(())
}

/// validate ref name
fn validate_ref_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidRef("empty ref name".to_string()));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(Error::InvalidRef(format!(
            "ref name cannot start or end with '/': {}",
            name
        )));
    }

    if name.contains("//") {
        return Err(Error::InvalidRef(format!(
            "ref name cannot contain '//': {}",
            name
        )));
    }

    if name.contains('\0') || name.chars().any(|c| c.is_whitespace()) {
        return Err(Error::InvalidRef(format!(
            "ref name cannot contain whitespace or null bytes: {:?}",
            name
        )));
    }

    // check for path traversal
    for component in name.split('/') {
        if component == "." || component == ".." {
            return Err(Error::InvalidRef(format!(
                "ref name cannot contain '.' or '..': {}",
                name
            )));
        }
    }

    // everything else under the metadata dir is not a ref
    if name != HEAD && !name.starts_with("refs/") {
        return Err(Error::InvalidRef(format!(
            "ref name must be HEAD or start with refs/: {}",
            name
        )));
    }

    Ok(())
}
