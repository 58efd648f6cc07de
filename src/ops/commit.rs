use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::error::Result;
use crate::hash::ObjectId;
use crate::index::Index;
use crate::object::write_commit;
use crate::refs::{ref_target, update_ref, HEAD};
use crate::repo::Repo;
use crate::types::Commit;

/// identity used when neither an author nor a configured user is given
pub const DEFAULT_IDENTITY: &str = "wyrm <wyrm@localhost>";

/// commit the staged index onto the current branch
///
/// `author` is `Name <email>`; it falls back to the configured user and then
/// to [`DEFAULT_IDENTITY`]. the current time is appended in UTC.
pub fn commit(repo: &Repo, message: &str, author: Option<&str>) -> Result<ObjectId> {
    let name = match author {
        Some(a) => a.to_string(),
        None => repo
            .config()
            .identity()
            .unwrap_or_else(|| DEFAULT_IDENTITY.to_string()),
    };
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    commit_as(repo, message, &format!("{} {} +0000", name, timestamp))
}

/// commit the staged index with a fully formed identity line
/// (`Name <email> <seconds> <tz>`), used for both author and committer
pub fn commit_as(repo: &Repo, message: &str, identity: &str) -> Result<ObjectId> {
    let index = Index::load(repo)?;
    let tree = index.build_tree(repo.store())?;

    // unborn branch -> root commit
    let (target, parent) = ref_target(repo, HEAD)?;
    let parents: Vec<ObjectId> = parent.into_iter().collect();

    let commit = Commit::new(tree, parents, identity, message);
    let id = write_commit(repo.store(), &commit)?;

    update_ref(repo, &target, &id)?;

    info!(%id, ref_name = %target, summary = commit.summary(), "committed");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserConfig;
    use crate::graph::walk;
    use crate::object::read_commit;
    use crate::ops::add;
    use crate::refs::{
        branch_ref, checkout, create_branch, read_ref, resolve_ref, update_ref, RefValue,
    };
    use std::fs;
    use tempfile::tempdir;

    const IDENT: &str = "Test <test@example.com> 1700000000 +0000";

    fn test_repo() -> (tempfile::TempDir, Repo) {
        let dir = tempdir().unwrap();
        let repo = Repo::init(dir.path()).unwrap();
        (dir, repo)
    }

    fn stage(dir: &tempfile::TempDir, repo: &Repo, name: &str, content: &str) {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        add(repo, &[path]).unwrap();
    }

    #[test]
    fn test_initial_commit() {
        let (dir, repo) = test_repo();
        stage(&dir, &repo, "hello.txt", "Hello, WYAG!\n");

        let expected_tree = Index::load(&repo).unwrap().build_tree(repo.store()).unwrap();
        let id = commit_as(&repo, "Initial commit", IDENT).unwrap();

        let commit = read_commit(repo.store(), &id).unwrap();
        assert_eq!(commit.tree, expected_tree);
        assert!(commit.is_root());
        assert_eq!(commit.author, IDENT);
        assert_eq!(commit.committer, IDENT);
        assert_eq!(commit.message, "Initial commit");

        assert_eq!(walk(repo.store(), id).count(), 1);

        // the unborn branch now exists and HEAD still points at it
        assert_eq!(resolve_ref(&repo, &branch_ref("main")).unwrap(), id);
        assert_eq!(
            read_ref(&repo, HEAD).unwrap(),
            RefValue::Symbolic("refs/heads/main".to_string())
        );
    }

    #[test]
    fn test_second_commit_has_parent() {
        let (dir, repo) = test_repo();
        stage(&dir, &repo, "f", "v1");
        let first = commit_as(&repo, "one", IDENT).unwrap();
        stage(&dir, &repo, "f", "v2");
        let second = commit_as(&repo, "two", IDENT).unwrap();

        let commit = read_commit(repo.store(), &second).unwrap();
        assert_eq!(commit.parents, vec![first]);
        assert_eq!(walk(repo.store(), second).count(), 2);
    }

    #[test]
    fn test_commit_on_other_branch() {
        let (dir, repo) = test_repo();
        stage(&dir, &repo, "f", "base");
        let base = commit_as(&repo, "base", IDENT).unwrap();

        create_branch(&repo, "feature", &base).unwrap();
        checkout(&repo, "feature").unwrap();
        stage(&dir, &repo, "g", "feature work");
        let tip = commit_as(&repo, "feature", IDENT).unwrap();

        assert_eq!(resolve_ref(&repo, &branch_ref("feature")).unwrap(), tip);
        assert_eq!(resolve_ref(&repo, &branch_ref("main")).unwrap(), base);
    }

    #[test]
    fn test_detached_head_commit_moves_head() {
        let (dir, repo) = test_repo();
        stage(&dir, &repo, "f", "base");
        let base = commit_as(&repo, "base", IDENT).unwrap();

        update_ref(&repo, HEAD, &base).unwrap();
        let next = commit_as(&repo, "detached", IDENT).unwrap();

        assert_eq!(read_ref(&repo, HEAD).unwrap(), RefValue::Direct(next));
        assert_eq!(resolve_ref(&repo, &branch_ref("main")).unwrap(), base);
    }

    #[test]
    fn test_identity_fallbacks() {
        let (dir, mut repo) = test_repo();
        stage(&dir, &repo, "f", "x");

        let id = commit(&repo, "default", None).unwrap();
        let c = read_commit(repo.store(), &id).unwrap();
        assert!(c.author.starts_with("wyrm <wyrm@localhost> "));
        assert!(c.author.ends_with(" +0000"));

        repo.config_mut().user = Some(UserConfig {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        });
        let id = commit(&repo, "configured", None).unwrap();
        let c = read_commit(repo.store(), &id).unwrap();
        assert!(c.author.starts_with("Alice <alice@example.com> "));

        let id = commit(&repo, "explicit", Some("Bob <bob@example.com>")).unwrap();
        let c = read_commit(repo.store(), &id).unwrap();
        assert!(c.author.starts_with("Bob <bob@example.com> "));
    }

    #[test]
    fn test_empty_index_commits_empty_tree() {
        let (_dir, repo) = test_repo();
        let id = commit_as(&repo, "empty", IDENT).unwrap();
        let c = read_commit(repo.store(), &id).unwrap();
        assert_eq!(c.tree.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }
}
