//! Persistent coordinate cache keyed by record identity (`location_firedate`).
//!
//! An entry, once present, is authoritative: later conversions of the same
//! record never replace it.

use crate::error::{Error, Result};
use crate::output::write_json_compact;
use crate::types::GeoPoint;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateCache {
    entries: BTreeMap<String, GeoPoint>,
}

impl CoordinateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache file; a missing file yields an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let unreadable = |reason: String| Error::CacheUnreadable {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let entries = serde_json::from_str(&text).map_err(|e| unreadable(e.to_string()))?;
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_compact(path, &self.entries).map_err(|e| Error::CacheWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn get(&self, key: &str) -> Option<GeoPoint> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert unless the key already exists. Returns the value now stored
    /// under `key`, which is the previous one if there was any.
    pub fn insert_if_absent(&mut self, key: String, point: GeoPoint) -> GeoPoint {
        *self.entries.entry(key).or_insert(point)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
