//! content-addressed object store
//!
//! objects are stored as `zstd("<kind> <len>\0" + payload)` under the SHA-1 of
//! the uncompressed header + payload. the [`Storage`] trait is the key-value
//! seam underneath: [`FsStorage`] persists to fan-out directories, while
//! [`MemoryStorage`] keeps everything in a map for tests.

mod fs;
mod memory;

pub use fs::FsStorage;
pub(crate) use fs::write_temp;
pub use memory::MemoryStorage;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::hash::{object_header, ObjectId, HEX_LEN};
use crate::object::ObjectKind;

/// zstd level used for every object (fast, reasonable ratio)
const COMPRESSION_LEVEL: i32 = 3;

/// shortest accepted abbreviated object id
pub const MIN_PREFIX_LEN: usize = 4;

/// key-value substrate for compressed objects
pub trait Storage {
    /// store bytes under `id`; must be atomic with respect to readers
    fn put(&self, id: &ObjectId, data: &[u8]) -> Result<()>;

    /// fetch the bytes stored under `id`, `None` if absent
    fn get(&self, id: &ObjectId) -> Result<Option<Vec<u8>>>;

    /// check presence without reading
    fn exists(&self, id: &ObjectId) -> bool;

    /// all stored ids whose hex form starts with `prefix` (lowercase hex, >= 2 chars)
    fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>>;
}

/// typed object store over a [`Storage`] adapter
#[derive(Debug)]
pub struct ObjectStore<S> {
    storage: S,
}

impl<S: Storage> ObjectStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// underlying storage adapter
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// compute the id an object would get, without writing it
    pub fn hash(kind: ObjectKind, payload: &[u8]) -> ObjectId {
        ObjectId::compute(kind, payload)
    }

    /// write an object, returning its id
    ///
    /// writing an object that already exists is a no-op.
    pub fn write(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::compute(kind, payload);

        // deduplication: same id means same bytes
        if self.storage.exists(&id) {
            trace!(%id, kind = kind.as_str(), "object already stored");
            return Ok(id);
        }

        let mut raw = object_header(kind, payload.len());
        raw.extend_from_slice(payload);

        let compressed = zstd::encode_all(&raw[..], COMPRESSION_LEVEL)
            .map_err(|e| Error::corrupt(id, format!("compression failed: {}", e)))?;

        self.storage.put(&id, &compressed)?;
        debug!(%id, kind = kind.as_str(), size = payload.len(), "wrote object");

        Ok(id)
    }

    /// read an object, returning its kind and payload
    pub fn read(&self, id: &ObjectId) -> Result<(ObjectKind, Vec<u8>)> {
        let compressed = self
            .storage
            .get(id)?
            .ok_or_else(|| Error::ObjectNotFound(id.to_hex()))?;

        let raw = zstd::decode_all(&compressed[..])
            .map_err(|e| Error::corrupt(*id, format!("decompression failed: {}", e)))?;

        let (kind, payload) = parse_object(id, &raw)?;

        // verify content address
        let actual = ObjectId::compute(kind, payload);
        if actual != *id {
            return Err(Error::corrupt(*id, format!("hash mismatch (content is {})", actual)));
        }

        Ok((kind, payload.to_vec()))
    }

    /// check if an object exists
    pub fn exists(&self, id: &ObjectId) -> bool {
        self.storage.exists(id)
    }

    /// expand an abbreviated hex id to the unique stored object it names
    pub fn resolve_prefix(&self, prefix: &str) -> Result<ObjectId> {
        let prefix = prefix.to_ascii_lowercase();
        if prefix.len() < MIN_PREFIX_LEN
            || prefix.len() > HEX_LEN
            || !prefix.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(Error::InvalidHashHex(prefix));
        }

        if prefix.len() == HEX_LEN {
            let id = ObjectId::from_hex(&prefix)?;
            return if self.exists(&id) {
                Ok(id)
            } else {
                Err(Error::ObjectNotFound(prefix))
            };
        }

        let mut matches = self.storage.ids_with_prefix(&prefix)?;
        match matches.len() {
            0 => Err(Error::ObjectNotFound(prefix)),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousObject(prefix)),
        }
    }
}

/// split a decompressed object into kind and payload, checking the header
fn parse_object<'a>(id: &ObjectId, raw: &'a [u8]) -> Result<(ObjectKind, &'a [u8])> {
    let space = raw
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| Error::corrupt(*id, "header has no type separator"))?;
    let nul = raw[space..]
        .iter()
        .position(|&b| b == 0)
        .map(|p| space + p)
        .ok_or_else(|| Error::corrupt(*id, "header is not NUL terminated"))?;

    let kind = std::str::from_utf8(&raw[..space])
        .ok()
        .and_then(|s| s.parse::<ObjectKind>().ok())
        .ok_or_else(|| {
            Error::corrupt(
                *id,
                format!("unknown object type {:?}", String::from_utf8_lossy(&raw[..space])),
            )
        })?;

    let declared: usize = std::str::from_utf8(&raw[space + 1..nul])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::corrupt(*id, "header length is not a number"))?;

    let payload = &raw[nul + 1..];
    if declared != payload.len() {
        return Err(Error::corrupt(
            *id,
            format!("declared length {} but payload is {} bytes", declared, payload.len()),
        ));
    }

    Ok((kind, payload))
}
