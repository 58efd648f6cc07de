use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::Result;
use crate::hash::ObjectId;
use crate::store::Storage;

/// in-memory storage for tests and scratch stores
///
/// data is lost when the storage is dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RefCell<HashMap<ObjectId, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of stored objects
    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn put(&self, id: &ObjectId, data: &[u8]) -> Result<()> {
        self.objects.borrow_mut().insert(*id, data.to_vec());
        Ok(())
    }

    fn get(&self, id: &ObjectId) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.borrow().get(id).cloned())
    }

    fn exists(&self, id: &ObjectId) -> bool {
        self.objects.borrow().contains_key(id)
    }

    fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let mut ids: Vec<_> = self
            .objects
            .borrow()
            .keys()
            .filter(|id| id.to_hex().starts_with(prefix))
            .copied()
            .collect();
        ids.sort();
        Ok(ids)
    }
}
