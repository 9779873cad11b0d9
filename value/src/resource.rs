//! Lazily loaded payloads with a resident content digest.
//!
//! Large constants (meshes, images) dominate the cost of deduplication. A
//! [`Resource`] always knows the [`Digest`] of its content, so hashing never
//! needs the payload. The content itself is only fetched from the backing
//! store when two resources with equal digests must be compared for real.
//!
//! # Example
//!
//! ```rust
//! use tessera_value::{Layout, Resource};
//!
//! let a = Resource::new(Layout::new((4, 4), vec![]));
//! let b = Resource::new(Layout::new((4, 4), vec![]));
//! assert_eq!(a.digest(), b.digest());
//! assert!(a.content_eq(&b).unwrap());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use snafu::OptionExt;
use xxhash_rust::xxh64::Xxh64;

use crate::error::{LoadFailedSnafu, Result};

/// Cheap content hash of a payload. Equal content always has an equal digest;
/// the converse is only probable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub u64);

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Content digest computed from a type's `Hash` implementation with xxh64.
pub trait ContentDigest {
    fn digest(&self) -> Digest;
}

impl<T: Hash + ?Sized> ContentDigest for T {
    fn digest(&self) -> Digest {
        let mut hasher = Xxh64::new(0);
        self.hash(&mut hasher);
        Digest(hasher.finish())
    }
}

/// Backing store access for a deferred payload.
pub trait ResourceLoader<T>: Send + Sync {
    fn load(&self) -> Result<T>;
}

struct Inner<T> {
    cell: OnceLock<Arc<T>>,
    loader: Option<Arc<dyn ResourceLoader<T>>>,
}

/// A payload that may not be resident yet.
///
/// Cloning is cheap and shares both the loaded content and the loader, so a
/// payload is fetched at most once no matter how many constant nodes use it.
pub struct Resource<T> {
    digest: Digest,
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self { digest: self.digest, inner: self.inner.clone() }
    }
}

impl<T: Hash> Resource<T> {
    /// Wrap an already resident value, computing its digest.
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc(value: Arc<T>) -> Self {
        let digest = value.as_ref().digest();
        let cell = OnceLock::new();
        let _ = cell.set(value);
        Self { digest, inner: Arc::new(Inner { cell, loader: None }) }
    }
}

impl<T> Resource<T> {
    /// A payload that stays in the backing store until first use.
    ///
    /// `digest` must be the digest the content would produce once loaded.
    pub fn deferred(digest: Digest, loader: Arc<dyn ResourceLoader<T>>) -> Self {
        Self { digest, inner: Arc::new(Inner { cell: OnceLock::new(), loader: Some(loader) }) }
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.cell.get().is_some()
    }

    /// The content if it is already resident. Never triggers a load.
    pub fn peek(&self) -> Option<&Arc<T>> {
        self.inner.cell.get()
    }

    /// The content, loading it on first access.
    pub fn get(&self) -> Result<&Arc<T>> {
        if let Some(value) = self.inner.cell.get() {
            return Ok(value);
        }
        let loader = self.inner.loader.as_ref().context(LoadFailedSnafu { reason: "no loader for deferred payload" })?;
        let value = loader.load()?;
        Ok(self.inner.cell.get_or_init(|| Arc::new(value)))
    }

    /// Whether both handles share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: PartialEq> Resource<T> {
    /// Deep equality. Different digests short-circuit without loading anything.
    pub fn content_eq(&self, other: &Self) -> Result<bool> {
        if self.ptr_eq(other) {
            return Ok(true);
        }
        if self.digest != other.digest {
            return Ok(false);
        }
        Ok(self.get()? == other.get()?)
    }
}

impl<T: PartialEq> PartialEq for Resource<T> {
    /// A payload that fails to load is never equal to anything but itself.
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other).unwrap_or(false)
    }
}

impl<T: PartialEq> Eq for Resource<T> {}

impl<T> Hash for Resource<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("digest", &self.digest).field("loaded", &self.is_loaded()).finish()
    }
}
