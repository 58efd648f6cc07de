use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::index::{Index, IndexEntry};
use crate::repo::{Repo, META_DIR};
use crate::types::FileMode;

/// stage files or directories into the index
///
/// directories are staged recursively, skipping the metadata directory.
/// returns the entries staged by this call in the order they were visited.
pub fn add(repo: &Repo, paths: &[PathBuf]) -> Result<Vec<IndexEntry>> {
    let worktree = repo.worktree().canonicalize().with_path(repo.worktree())?;
    let mut index = Index::load(repo)?;
    let mut staged = Vec::new();

    for path in paths {
        let abs = absolute(&worktree, path)?;
        let meta = fs::symlink_metadata(&abs).with_path(&abs)?;

        if meta.is_dir() {
            let walker = WalkDir::new(&abs)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.file_name() != META_DIR);
            for entry in walker {
                let entry = entry.map_err(|e| Error::Io {
                    path: e.path().map(Path::to_path_buf).unwrap_or_else(|| abs.clone()),
                    source: e.into(),
                })?;
                if entry.file_type().is_dir() {
                    continue;
                }
                staged.push(stage_file(repo, &mut index, &worktree, entry.path())?);
            }
        } else {
            staged.push(stage_file(repo, &mut index, &worktree, &abs)?);
        }
    }

    index.save(repo)?;
    debug!(count = staged.len(), "staged files");
    Ok(staged)
}

/// make `path` absolute and check it lies inside the worktree
///
/// only the parent is canonicalized so a symlink itself can be staged.
fn absolute(worktree: &Path, path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .with_path(path)?
            .join(path)
    };

    let abs = match (joined.parent(), joined.file_name()) {
        (Some(parent), Some(name)) => parent.canonicalize().with_path(parent)?.join(name),
        _ => joined.canonicalize().with_path(&joined)?,
    };

    if !abs.starts_with(worktree) {
        return Err(Error::InvalidPath(format!(
            "{} is outside the worktree",
            path.display()
        )));
    }
    Ok(abs)
}

fn stage_file(repo: &Repo, index: &mut Index, worktree: &Path, path: &Path) -> Result<IndexEntry> {
    let rel = path
        .strip_prefix(worktree)
        .map_err(|_| Error::InvalidPath(path.display().to_string()))?;
    let rel = rel
        .to_str()
        .ok_or_else(|| Error::InvalidPath(format!("{:?} is not utf-8", rel)))?;

    let meta = fs::symlink_metadata(path).with_path(path)?;
    let (mode, content) = if meta.file_type().is_symlink() {
        let target = fs::read_link(path).with_path(path)?;
        (FileMode::Symlink, target.as_os_str().as_bytes().to_vec())
    } else if meta.permissions().mode() & 0o111 != 0 {
        (FileMode::Executable, fs::read(path).with_path(path)?)
    } else {
        (FileMode::Regular, fs::read(path).with_path(path)?)
    };

    let id = index.add_entry(repo.store(), rel, mode, &content)?;
    Ok(IndexEntry {
        path: rel.to_string(),
        mode,
        id,
    })
}
