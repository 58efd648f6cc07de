use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{Config, FORMAT_VERSION};
use crate::error::{Error, IoResultExt, Result};
use crate::store::{write_temp, FsStorage, ObjectStore};

/// name of the metadata directory inside a worktree
pub const META_DIR: &str = ".wyrm";

/// a wyrm repository
///
/// every operation takes the repository explicitly; there is no
/// process-wide "current repository".
///
/// no lock is taken. two processes updating the same ref race with
/// last-writer-wins semantics; objects are immune because identical
/// writes converge on the same file.
#[derive(Debug)]
pub struct Repo {
    worktree: PathBuf,
    path: PathBuf,
    config: Config,
    store: ObjectStore<FsStorage>,
}

impl Repo {
    /// initialize a new repository in the given worktree directory
    pub fn init(worktree: &Path) -> Result<Self> {
        let path = worktree.join(META_DIR);
        if path.exists() {
            return Err(Error::RepoExists(worktree.to_path_buf()));
        }

        // create directory structure
        fs::create_dir_all(path.join("objects")).with_path(&path)?;
        fs::create_dir_all(path.join("refs/heads")).with_path(&path)?;
        fs::create_dir_all(path.join("refs/tags")).with_path(&path)?;
        fs::create_dir_all(path.join("tmp")).with_path(&path)?;

        let config = Config::default();
        config.save(&path.join("config.toml"))?;

        let repo = Self::from_parts(worktree.to_path_buf(), path, config);

        // HEAD starts attached to a branch that has no commits yet
        let head = format!("ref: refs/heads/{}\n", repo.config.core.default_branch);
        repo.write_file_atomic(&repo.head_path(), head.as_bytes())?;

        info!(path = %repo.path.display(), "initialized repository");
        Ok(repo)
    }

    /// open an existing repository rooted at `worktree`
    pub fn open(worktree: &Path) -> Result<Self> {
        let path = worktree.join(META_DIR);
        let config_path = path.join("config.toml");
        if !config_path.exists() {
            return Err(Error::NoRepo(worktree.to_path_buf()));
        }

        let config = Config::load(&config_path)?;
        if config.core.format_version != FORMAT_VERSION {
            return Err(Error::UnsupportedFormatVersion(config.core.format_version));
        }

        Ok(Self::from_parts(worktree.to_path_buf(), path, config))
    }

    /// find the repository containing `start`, walking up parent directories
    pub fn discover(start: &Path) -> Result<Self> {
        let start = start.canonicalize().with_path(start)?;
        for dir in start.ancestors() {
            if dir.join(META_DIR).is_dir() {
                return Self::open(dir);
            }
        }
        Err(Error::NoRepo(start))
    }

    fn from_parts(worktree: PathBuf, path: PathBuf, config: Config) -> Self {
        let store = ObjectStore::new(FsStorage::new(path.join("objects"), path.join("tmp")));
        Self {
            worktree,
            path,
            config,
            store,
        }
    }

    /// worktree root (the directory containing the metadata directory)
    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    /// metadata directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// repository configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// mutable access to configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// save configuration changes
    pub fn save_config(&self) -> Result<()> {
        self.config.save(&self.config_path())
    }

    /// the object store
    pub fn store(&self) -> &ObjectStore<FsStorage> {
        &self.store
    }

    /// path to config.toml
    pub fn config_path(&self) -> PathBuf {
        self.path.join("config.toml")
    }

    /// path to objects directory
    pub fn objects_path(&self) -> PathBuf {
        self.path.join("objects")
    }

    /// path to HEAD
    pub fn head_path(&self) -> PathBuf {
        self.path.join("HEAD")
    }

    /// path to branch heads
    pub fn heads_path(&self) -> PathBuf {
        self.path.join("refs/heads")
    }

    /// path to tags directory
    pub fn tags_path(&self) -> PathBuf {
        self.path.join("refs/tags")
    }

    /// path to the staging index
    pub fn index_path(&self) -> PathBuf {
        self.path.join("index")
    }

    /// path to tmp directory (for atomic writes)
    pub fn tmp_path(&self) -> PathBuf {
        self.path.join("tmp")
    }

    /// replace `target` with `content` via temp file + rename
    pub(crate) fn write_file_atomic(&self, target: &Path, content: &[u8]) -> Result<()> {
        // ensure parent directories exist
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }

        // atomic write: temp -> fsync -> rename
        let tmp_path = self.tmp_path().join(uuid::Uuid::new_v4().to_string());
        write_temp(&tmp_path, content)?;

        if let Err(e) = fs::rename(&tmp_path, target) {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::Io {
                path: target.to_path_buf(),
                source: e,
            });
        }

        // fsync parent directory
        if let Some(parent) = target.parent() {
            let dir = File::open(parent).with_path(parent)?;
            dir.sync_all().with_path(parent)?;
        }

        Ok(())
    }
}
