use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Address of a blob: a bucket and a key inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct BlobLocation {
    pub bucket: String,
    pub key: String,
}

impl BlobLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

#[derive(Error, Debug)]
pub(crate) enum StoreError {
    #[error("object {0} does not exist")]
    NotFound(BlobLocation),
    #[error("invalid object location {0}")]
    InvalidLocation(BlobLocation),
    #[error("I/O error on {location}: {source}")]
    Io {
        location: BlobLocation,
        #[source]
        source: std::io::Error,
    },
}

/// Fetch/store capability of an object store. Calls block until the object has been
/// read or written; retries, if any, are the implementation's business.
pub(crate) trait BlobStore {
    fn fetch(&self, location: &BlobLocation) -> Result<Vec<u8>, StoreError>;
    fn store(&mut self, location: &BlobLocation, bytes: Vec<u8>) -> Result<(), StoreError>;
}

/// Object store laid out on a local filesystem: each bucket is a directory under
/// `root`, each key a relative path inside it.
#[derive(Debug, Clone)]
pub(crate) struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, location: &BlobLocation) -> Result<PathBuf, StoreError> {
        let plain = |part: &str| {
            !part.is_empty()
                && Path::new(part)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
        };
        if !plain(&location.bucket) || !plain(&location.key) {
            return Err(StoreError::InvalidLocation(location.clone()));
        }
        Ok(self.root.join(&location.bucket).join(&location.key))
    }
}

impl BlobStore for LocalStore {
    fn fetch(&self, location: &BlobLocation) -> Result<Vec<u8>, StoreError> {
        let path = self.path(location)?;
        std::fs::read(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(location.clone()),
            _ => StoreError::Io {
                location: location.clone(),
                source,
            },
        })
    }

    fn store(&mut self, location: &BlobLocation, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path(location)?;
        let io_error = |source| StoreError::Io {
            location: location.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(&path, bytes).map_err(io_error)
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryStore;
