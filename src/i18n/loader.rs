//! Raw byte loaders for table addresses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::i18n::cancel::CancelToken;
use crate::i18n::error::LoadError;

/// Fetches the raw bytes behind a catalog address.
pub trait Loader: Send + Sync {
    /// What: Load the bytes at `address`.
    ///
    /// Inputs:
    /// - `address`: Opaque address produced by the catalog
    /// - `cancel`: Signal the load should honour to stop early
    ///
    /// Output:
    /// - Raw payload bytes
    ///
    /// # Errors
    /// - `NotFound`/`Io` when the address is missing or unreadable
    /// - `Cancelled` when `cancel` fires first
    fn load_bytes<'a>(
        &'a self,
        address: &'a str,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<Vec<u8>, LoadError>>;
}

/// Reads addresses as filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load_bytes<'a>(
        &'a self,
        address: &'a str,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        Box::pin(async move {
            let path = Path::new(address);
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(LoadError::Cancelled),
                res = tokio::fs::read(path) => {
                    let bytes = res.map_err(|e| LoadError::from_io(address, e))?;
                    tracing::trace!(path = %path.display(), bytes = bytes.len(), "Read table file");
                    Ok(bytes)
                }
            }
        })
    }
}

/// Serves payloads held in memory, keyed by address.
///
/// Suitable for tables embedded with `include_bytes!` or assembled in tests.
#[derive(Debug, Clone, Default)]
pub struct BundleLoader {
    files: HashMap<String, Arc<[u8]>>,
}

impl BundleLoader {
    /// Empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `address`, replacing any previous payload.
    pub fn insert(&mut self, address: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.insert(address.into(), bytes.into());
    }

    /// Builder form of [`BundleLoader::insert`].
    #[must_use]
    pub fn with(mut self, address: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(address, bytes);
        self
    }

    /// Number of payloads held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Loader for BundleLoader {
    fn load_bytes<'a>(
        &'a self,
        address: &'a str,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        let result = if cancel.is_cancelled() {
            Err(LoadError::Cancelled)
        } else {
            self.files
                .get(address)
                .map(|bytes| bytes.to_vec())
                .ok_or_else(|| LoadError::NotFound {
                    address: address.to_string(),
                })
        };
        Box::pin(async move { result })
    }
}
