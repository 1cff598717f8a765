//! Durable storage for the record list.
//!
//! A [`RecordStore`] holds the whole encoded list as one text blob. Writes
//! replace it wholesale; a failed write must leave the previous blob readable.
//! [`Seed`] is the read-only data used the first time, before a store exists.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result};

/// Seed data bundled with the crate.
pub const BUNDLED_SEED: &str = include_str!("../assets/patients.csv");

/// Backing storage for the encoded record list.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Read the stored text, or `None` if nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageRead`] if the store exists but cannot be read.
    async fn read(&self) -> Result<Option<String>>;

    /// Replace the stored text.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the text could not be written. The
    /// previously stored text is still intact in that case.
    async fn write(&self, contents: &str) -> Result<()>;

    /// Human-readable location, used in logs and errors.
    fn describe(&self) -> String;
}

/// File-backed store writing through a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store for the file at `path`. Nothing is touched on disk yet.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the path to the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file that receives a write before it is renamed into place.
    fn temp_path(&self) -> PathBuf {
        match self.path.file_name() {
            Some(name) => {
                let mut name = name.to_os_string();
                name.push(".tmp");
                self.path.with_file_name(name)
            }
            None => self.path.with_extension("tmp"),
        }
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| Error::DirectoryCreate {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn read(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => {
                debug!("Read {} bytes from {}", text.len(), self.path.display());
                Ok(Some(text))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::storage_read(self.describe(), source)),
        }
    }

    async fn write(&self, contents: &str) -> Result<()> {
        self.ensure_parent().await?;

        let temp_path = self.temp_path();
        let written: std::io::Result<()> = async {
            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(contents.as_bytes()).await?;
            file.sync_all().await
        }
        .await;

        if let Err(source) = written {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::storage_write(self.describe(), source));
        }

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| Error::storage_write(self.describe(), source))?;

        debug!("Wrote {} bytes to {}", contents.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store, mainly for tests and embedding without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store (as if no file existed yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `contents`.
    #[must_use]
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Current stored text.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn contents(&self) -> Result<Option<String>> {
        self.contents
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }

    /// Make every following write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self) -> Result<Option<String>> {
        self.contents()
    }

    async fn write(&self, contents: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage_write(
                self.describe(),
                std::io::Error::other("writes disabled"),
            ));
        }
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))?;
        *guard = Some(contents.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Where first-run data comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Seed {
    /// The CSV bundled with the crate.
    #[default]
    Bundled,
    /// A CSV file on disk.
    File(PathBuf),
    /// Literal CSV text.
    Inline(String),
}

impl Seed {
    /// Read the seed text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SeedUnavailable`] if a seed file cannot be read.
    pub async fn read(&self) -> Result<String> {
        match self {
            Self::Bundled => Ok(BUNDLED_SEED.to_string()),
            Self::Inline(text) => Ok(text.clone()),
            Self::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| Error::SeedUnavailable {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}
