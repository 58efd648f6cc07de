use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::ObjectId;
use crate::store::Storage;

/// filesystem storage: `objects/<2 hex>/<38 hex>`
///
/// writes go to a uniquely named file in `tmp` and are renamed into place,
/// so `tmp` must live on the same filesystem as `objects`.
#[derive(Debug, Clone)]
pub struct FsStorage {
    objects: PathBuf,
    tmp: PathBuf,
}

impl FsStorage {
    pub fn new(objects: impl Into<PathBuf>, tmp: impl Into<PathBuf>) -> Self {
        Self {
            objects: objects.into(),
            tmp: tmp.into(),
        }
    }

    /// get the filesystem path to an object
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.to_path_components();
        self.objects.join(dir).join(file)
    }
}

impl Storage for FsStorage {
    fn put(&self, id: &ObjectId, data: &[u8]) -> Result<()> {
        let (dir, file) = id.to_path_components();
        let object_dir = self.objects.join(&dir);
        let object_path = object_dir.join(&file);

        // ensure directory exists
        fs::create_dir_all(&object_dir).with_path(&object_dir)?;

        // atomic write: temp -> fsync -> rename
        let tmp_path = self.tmp.join(uuid::Uuid::new_v4().to_string());
        write_temp(&tmp_path, data)?;

        // rename to final location
        if let Err(e) = fs::rename(&tmp_path, &object_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::Io {
                path: object_path,
                source: e,
            });
        }

        fsync_dir(&object_dir)
    }

    fn get(&self, id: &ObjectId) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(id);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io { path, source: e }),
        }
    }

    fn exists(&self, id: &ObjectId) -> bool {
        self.object_path(id).exists()
    }

    fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let (dir, rest) = prefix.split_at(2);
        let fanout = self.objects.join(dir);
        if !fanout.is_dir() {
            return Ok(vec![]);
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&fanout).with_path(&fanout)? {
            let entry = entry.with_path(&fanout)?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(rest) {
                // ignore stray files that aren't object names
                if let Ok(id) = ObjectId::from_hex(&format!("{}{}", dir, name)) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// create `path` with `data` and fsync it; a partial file is removed on failure
pub(crate) fn write_temp(path: &Path, data: &[u8]) -> Result<()> {
    let written = File::create(path).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(path);
        return Err(Error::Io {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

/// fsync a directory
fn fsync_dir(path: &Path) -> Result<()> {
    let dir = File::open(path).with_path(path)?;
    dir.sync_all().with_path(path)?;
    Ok(())
}
