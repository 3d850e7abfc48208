//! Persistence port for timers.
//!
//! A [`TimeStorage`] is bound to one `(user, session)` key by whoever
//! constructs it; the engine only stores, loads and deletes one opaque
//! payload.
//!
//! # Concurrency
//!
//! Implementations must guarantee at most one concurrent writer per key.
//! The engine performs a read-modify-write per request (load, mutate, save)
//! and does no locking of its own, so request isolation has to come from
//! the caller or the backend.

use crate::error::StorageError;

/// Key/value persistence for one serialized timer.
pub trait TimeStorage {
    /// Replaces the stored payload.
    fn store(&mut self, data: &str) -> Result<(), StorageError>;

    /// Returns the stored payload, `None` when nothing was stored yet.
    fn load(&mut self) -> Result<Option<String>, StorageError>;

    /// Deletes the stored payload, returning whether one existed.
    fn delete(&mut self) -> Result<bool, StorageError>;

    /// Writes pending data to the backend.
    fn flush(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

impl<S: TimeStorage + ?Sized> TimeStorage for Box<S> {
    fn store(&mut self, data: &str) -> Result<(), StorageError> {
        (**self).store(data)
    }

    fn load(&mut self) -> Result<Option<String>, StorageError> {
        (**self).load()
    }

    fn delete(&mut self) -> Result<bool, StorageError> {
        (**self).delete()
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        (**self).flush()
    }
}

/// Storage kept in memory, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryTimeStorage {
    data: Option<String>,
    writes: usize,
}

impl MemoryTimeStorage {
    pub const fn new() -> Self {
        Self {
            data: None,
            writes: 0,
        }
    }

    /// Storage pre-filled with a payload.
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            writes: 0,
        }
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Number of `store` calls received.
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl TimeStorage for MemoryTimeStorage {
    fn store(&mut self, data: &str) -> Result<(), StorageError> {
        self.data = Some(data.to_string());
        self.writes += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<String>, StorageError> {
        Ok(self.data.clone())
    }

    fn delete(&mut self) -> Result<bool, StorageError> {
        Ok(self.data.take().is_some())
    }
}

/// Write-batching wrapper around another storage.
///
/// The first `load` reads through; later loads are served from memory.
/// `store` only updates memory, and `flush` writes the latest payload to the
/// inner storage once, however many saves happened in between.
#[derive(Debug)]
pub struct CachedTimeStorage<S> {
    inner: S,
    /// `None` until the inner storage has been read or written.
    cache: Option<Option<String>>,
    dirty: bool,
}

impl<S: TimeStorage> CachedTimeStorage<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            cache: None,
            dirty: false,
        }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Whether stored data has not been flushed yet.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl<S: TimeStorage> TimeStorage for CachedTimeStorage<S> {
    fn store(&mut self, data: &str) -> Result<(), StorageError> {
        self.cache = Some(Some(data.to_string()));
        self.dirty = true;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<String>, StorageError> {
        if let Some(cached) = &self.cache {
            return Ok(cached.clone());
        }
        let data = self.inner.load()?;
        self.cache = Some(data.clone());
        Ok(data)
    }

    fn delete(&mut self) -> Result<bool, StorageError> {
        self.cache = Some(None);
        self.dirty = false;
        self.inner.delete()
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        if self.dirty {
            if let Some(Some(data)) = &self.cache {
                self.inner.store(data)?;
            }
            self.dirty = false;
        }
        self.inner.flush()
    }
}
