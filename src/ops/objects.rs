use tracing::debug;

use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::object::{read_object, Object, ObjectKind};
use crate::refs::resolve_revision;
use crate::repo::Repo;

/// compute the id `content` would have as an object of `kind`
///
/// tree and commit content must decode. with a repository the object is
/// also written to it.
pub fn hash_object(repo: Option<&Repo>, kind: ObjectKind, content: &[u8]) -> Result<ObjectId> {
    // refuse to store something read_object could never parse back
    Object::decode(kind, content)?;

    match repo {
        Some(repo) => {
            let id = repo.store().write(kind, content)?;
            debug!(%id, %kind, "hashed and wrote object");
            Ok(id)
        }
        None => Ok(ObjectId::compute(kind, content)),
    }
}

/// read the object named by `rev`, checking that it is a `kind`
pub fn cat_file(repo: &Repo, kind: ObjectKind, rev: &str) -> Result<Object> {
    let id = resolve_revision(repo, rev)?;
    let object = read_object(repo.store(), &id)?;
    if object.kind() != kind {
        return Err(Error::UnexpectedKind {
            id,
            expected: kind.as_str(),
            found: object.kind().as_str(),
        });
    }
    Ok(object)
}
