use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use tokio::fs;

use crate::{error::CacheError, video_id::VideoId};

const ENTRY_EXTENSION: &str = "txt";

/// What a cache entry holds for a given video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Transcript,
    Summary,
}

/// Cache key for a (video, purpose) pair: `{id}` or `{id}_response`
pub fn cache_key(video_id: &VideoId, purpose: Purpose) -> String {
    match purpose {
        Purpose::Transcript => video_id.to_string(),
        Purpose::Summary => format!("{}_response", video_id),
    }
}

/// Get the default cache directory
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("ytsum"))
        .unwrap_or_else(|| PathBuf::from("cache"))
}

/// Flat key to text store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Absence is `Ok(None)`.
    async fn read(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn write(&self, key: &str, text: &str) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

/// Replace anything outside `[A-Za-z0-9_-]` so a key is always a plain file name.
fn sanitize_key(key: &str) -> Result<String, CacheError> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey {
            key: key.to_string(),
        });
    }

    Ok(key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect())
}

/// One `{key}.txt` file per entry under a root directory.
#[derive(Debug, Clone)]
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    /// Open a cache rooted at `root`, creating the directory if missing.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let cache = Self { root: root.into() };
        cache.ensure_root().await?;
        Ok(cache)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        let name = sanitize_key(key)?;
        Ok(self.root.join(format!("{}.{}", name, ENTRY_EXTENSION)))
    }

    async fn ensure_root(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| CacheError::Io {
                path: self.root.clone(),
                source,
            })
    }
}

#[async_trait]
impl CacheStore for FsCache {
    async fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    async fn write(&self, key: &str, text: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key)?;
        self.ensure_root().await?;

        // Write then rename, so readers never see a partial entry
        let tmp_path = path.with_extension(format!("{}.tmp", ENTRY_EXTENSION));
        fs::write(&tmp_path, text)
            .await
            .map_err(|source| CacheError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|source| CacheError::Io { path, source })
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }
}

/// In-memory store, useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-updated map, so a
    // poisoned lock is still safe to use.
    fn entries(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let key = sanitize_key(key)?;
        Ok(self.entries().get(&key).cloned())
    }

    async fn write(&self, key: &str, text: &str) -> Result<(), CacheError> {
        let key = sanitize_key(key)?;
        self.entries_mut().insert(key, text.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let key = sanitize_key(key)?;
        Ok(self.entries_mut().remove(&key).is_some())
    }
}
