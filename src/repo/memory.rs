use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};

use super::BlobStore;

#[derive(Default)]
struct Inner {
    blobs: HashMap<String, String>,
    writes: usize,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-process blob store. Counts writes and can simulate a broken backend.
#[derive(Default)]
pub struct MemoryBlobStore {
    inner: Mutex<Inner>,
}

impl MemoryBlobStore {
    pub fn with_seed<K, V>(seed: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::default();
        if let Ok(mut inner) = store.inner.lock() {
            inner
                .blobs
                .extend(seed.into_iter().map(|(k, v)| (k.into(), v.into())));
        }
        store
    }

    /// Number of successful `put` calls so far.
    pub fn write_count(&self) -> usize {
        self.inner.lock().map(|i| i.writes).unwrap_or(0)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_reads = fail;
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_writes = fail;
        }
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.lock().ok()?.blobs.get(key).cloned()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("memory blob store lock poisoned"))?;
        if inner.fail_reads {
            bail!("simulated read failure for {key}");
        }
        Ok(inner.blobs.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("memory blob store lock poisoned"))?;
        if inner.fail_writes {
            bail!("simulated write failure for {key}");
        }
        inner.blobs.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }
}
