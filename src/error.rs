use std::path::PathBuf;

use crate::ObjectId;

/// error type for wyrm operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a wyrm repository (or any parent up to /): {0}")]
    NoRepo(PathBuf),

    #[error("repository already exists at {0}")]
    RepoExists(PathBuf),

    #[error("unsupported repository format version: {0}")]
    UnsupportedFormatVersion(u32),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("corrupt object {id}: {reason}")]
    Corrupt { id: ObjectId, reason: String },

    #[error("malformed {kind} object: {reason}")]
    MalformedObject { kind: &'static str, reason: String },

    #[error("invalid tree entry mode: {0}")]
    InvalidMode(String),

    #[error("symbolic ref chain starting at {0} does not terminate")]
    RefCycle(String),

    #[error("'{0}' already exists")]
    RefExists(String),

    #[error("cannot delete branch '{0}': it is checked out")]
    BranchCheckedOut(String),

    #[error("malformed ref {name}: {content:?}")]
    MalformedRef { name: String, content: String },

    #[error("invalid ref name: {0}")]
    InvalidRef(String),

    #[error("short object id {0} is ambiguous")]
    AmbiguousObject(String),

    #[error("expected {expected} object, found {found} for {id}")]
    UnexpectedKind {
        id: ObjectId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid object type: {0}")]
    InvalidObjectType(String),

    #[error("invalid tree entry name: {0}")]
    InvalidEntryName(String),

    #[error("duplicate tree entry name: {0}")]
    DuplicateEntryName(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cbor serialization error: {0}")]
    CborEncode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("cbor deserialization error: {0}")]
    CborDecode(#[from] ciborium::de::Error<std::io::Error>),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedObject {
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(id: ObjectId, reason: impl Into<String>) -> Self {
        Error::Corrupt {
            id,
            reason: reason.into(),
        }
    }
}

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
