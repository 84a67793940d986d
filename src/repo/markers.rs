use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::BlobStore;
use crate::domain::{MarkerMap, ReadMarker};

pub const MARKER_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct MarkerBlobOut<'a> {
    version: u32,
    markers: &'a MarkerMap,
}

// Keys stay strings here: untagged enums buffer their input, which loses
// serde_json's numeric-key handling.
#[derive(Deserialize)]
#[serde(untagged)]
enum MarkerBlobIn {
    Versioned {
        version: u32,
        markers: BTreeMap<String, ReadMarker>,
    },
    // Layout written before the version field existed.
    Legacy(BTreeMap<String, ReadMarker>),
}

/// Persists the whole read-marker mapping as one blob.
///
/// Load failures degrade to an empty mapping and save failures are only logged: the
/// caller's in-memory mapping stays authoritative for the session.
pub struct ReadMarkerStore<B: BlobStore> {
    blobs: B,
    key: String,
}

impl<B: BlobStore> ReadMarkerStore<B> {
    pub fn new(blobs: B, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
        }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn load(&self) -> MarkerMap {
        match self.try_load() {
            Ok(markers) => {
                debug!("Loaded {} read markers from {}", markers.len(), self.key);
                markers
            }
            Err(e) => {
                warn!("Failed to load read markers, treating everything as unread: {e:#}");
                MarkerMap::new()
            }
        }
    }

    /// Returns whether the write went through.
    pub fn save(&self, markers: &MarkerMap) -> bool {
        match self.try_save(markers) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to persist {} read markers: {e:#}", markers.len());
                false
            }
        }
    }

    fn try_load(&self) -> Result<MarkerMap> {
        let Some(raw) = self.blobs.get(&self.key)? else {
            return Ok(MarkerMap::new());
        };
        let blob: MarkerBlobIn = serde_json::from_str(&raw)
            .with_context(|| format!("malformed read marker blob {}", self.key))?;
        let entries = match blob {
            MarkerBlobIn::Versioned { version, markers } => {
                if version > MARKER_SCHEMA_VERSION {
                    warn!(
                        "Read marker blob has newer schema version {} (known {}), loading anyway",
                        version, MARKER_SCHEMA_VERSION
                    );
                }
                markers
            }
            MarkerBlobIn::Legacy(markers) => markers,
        };
        Ok(entries
            .into_iter()
            .filter_map(|(id, marker)| match id.parse() {
                Ok(id) => Some((id, marker)),
                Err(_) => {
                    warn!("Skipping read marker with non-numeric id {id:?}");
                    None
                }
            })
            .collect())
    }

    fn try_save(&self, markers: &MarkerMap) -> Result<()> {
        let blob = MarkerBlobOut {
            version: MARKER_SCHEMA_VERSION,
            markers,
        };
        let raw = serde_json::to_string(&blob).context("failed to encode read markers")?;
        self.blobs.put(&self.key, &raw)
    }
}
