use std::sync::Arc;

use anyhow::Result;

pub mod github;
pub mod markers;
pub mod memory;
pub mod settings;
pub mod source;
pub mod sqlite;

/// Durable, client-local key-value store holding whole JSON blobs.
///
/// `put` replaces the value for a key in one step: readers see either the previous
/// blob or the new one, never a mix.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

impl<B: BlobStore + ?Sized> BlobStore for Arc<B> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        (**self).put(key, value)
    }
}
