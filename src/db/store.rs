use super::{COMMENTS_FILE, CommentsFile, SESSIONS_FILE, SessionsFile, USERS_FILE, UsersFile};
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Flat JSON-file store.
///
/// Each collection is one pretty-printed JSON document in the data
/// directory. Readers never lock: writes go to a temp file that is renamed
/// over the target, so a reader sees either the old or the new document.
/// Read-modify-write cycles are serialized by a single mutex.
#[derive(Clone)]
pub struct Database {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    /// Open the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create empty users, comments and sessions files where missing.
    ///
    /// Returns the names of the files that were created.
    pub fn init_files(&self) -> Result<Vec<&'static str>> {
        let mut created = Vec::new();
        if self.ensure_file::<UsersFile>(USERS_FILE)? {
            created.push(USERS_FILE);
        }
        if self.ensure_file::<CommentsFile>(COMMENTS_FILE)? {
            created.push(COMMENTS_FILE);
        }
        if self.ensure_file::<SessionsFile>(SESSIONS_FILE)? {
            created.push(SESSIONS_FILE);
        }
        Ok(created)
    }

    /// Create an empty document for `file` unless it already exists.
    fn ensure_file<T: Serialize + Default>(&self, file: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        if self.dir.join(file).exists() {
            return Ok(false);
        }
        self.write_unlocked(file, &T::default())?;
        Ok(true)
    }

    /// Read a document. A missing file reads as the default value.
    pub(crate) fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(T::default());
        }

        serde_json::from_str(&content).map_err(|e| {
            AppError::Internal(format!("Corrupt data file {}: {}", path.display(), e))
        })
    }

    /// Read, modify and write back a document under the write lock.
    ///
    /// Nothing is written when `f` fails.
    pub(crate) fn update<T, R, F>(&self, file: &str, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _guard = self.write_lock.lock();
        let mut doc: T = self.read(file)?;
        let result = f(&mut doc)?;
        self.write_unlocked(file, &doc)?;
        Ok(result)
    }

    fn write_unlocked<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!(".{}.tmp", file));

        std::fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
