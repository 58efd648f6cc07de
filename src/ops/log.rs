use crate::error::Result;
use crate::graph::{walk, LogEntry};
use crate::refs::resolve_revision;
use crate::repo::Repo;

/// get commit history starting at a revision
pub fn log(
    repo: &Repo,
    rev: &str,
    max_count: Option<usize>,
    first_parent: bool,
) -> Result<Vec<LogEntry>> {
    let start = resolve_revision(repo, rev)?;

    let mut history = walk(repo.store(), start);
    if first_parent {
        history = history.first_parent_only();
    }

    history.take(max_count.unwrap_or(usize::MAX)).collect()
}
