//! Lazily attaches WGS84 positions to fire records.
//!
//! Every conversion goes through the coordinate cache first. A record whose
//! key is cached is never recomputed and never causes a remote call.

use crate::cache::CoordinateCache;
use crate::geo::{Resolution, Strategy, StrategyChain, DEFAULT_POINT};
use crate::kakao::GeoLookup;
use crate::types::{FireRecord, GeoPoint, GridPoint};
use std::time::Duration;
use tracing::{debug, warn};

/// Hard upper bound on new conversions per batch, whatever the caller asks for.
pub const MAX_BATCH: usize = 100;

/// How a single record obtained its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalized {
    /// Served from the cache, or adopted from a position the record already had.
    Cached(GeoPoint),
    /// Computed now by the strategy chain.
    Converted(Resolution),
}

impl Normalized {
    pub fn point(&self) -> GeoPoint {
        match self {
            Normalized::Cached(p) => *p,
            Normalized::Converted(r) => r.point(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub limit: usize,
    pub already_cached: usize,
    pub newly_converted: usize,
    /// New conversions that ended on the fixed default position.
    pub fallbacks: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn total_converted(&self) -> usize {
        self.already_cached + self.newly_converted
    }
}

pub struct CoordinateNormalizer<'a> {
    lookup: &'a dyn GeoLookup,
    chain: StrategyChain,
    cache: CoordinateCache,
    throttle: Duration,
}

impl<'a> CoordinateNormalizer<'a> {
    pub fn new(
        lookup: &'a dyn GeoLookup,
        chain: StrategyChain,
        cache: CoordinateCache,
        throttle: Duration,
    ) -> Self {
        Self { lookup, chain, cache, throttle }
    }

    pub fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    pub fn into_cache(self) -> CoordinateCache {
        self.cache
    }

    /// Walk the chain for one grid point. Rejected or failed strategies are
    /// logged and skipped; the chain always ends in a usable point.
    pub async fn resolve(&self, grid: GridPoint) -> Resolution {
        for strategy in self.chain.strategies() {
            let candidate = match *strategy {
                Strategy::RemoteTranscode => match self.lookup.transcode(grid).await {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("transcoding ({}, {}) failed: {}", grid.x, grid.y, e);
                        continue;
                    }
                },
                Strategy::Linear(_, approx) => approx.apply(grid),
            };
            if self.chain.accepts(candidate) {
                return Resolution::Accepted { point: candidate, strategy: strategy.name() };
            }
            debug!(
                "{} put ({}, {}) outside the box at ({:.5}, {:.5})",
                strategy.name(),
                grid.x,
                grid.y,
                candidate.lng,
                candidate.lat
            );
        }
        warn!(
            "coordinate conversion failed for ({}, {}), using default position",
            grid.x, grid.y
        );
        Resolution::Fallback(self.chain.fallback())
    }

    /// Position for one record, or `None` when it has no usable grid
    /// coordinates. The result is written to both the record and the cache.
    pub async fn normalize(&mut self, record: &mut FireRecord) -> Option<Normalized> {
        let key = record.cache_key();
        if let Some(p) = self.cache.get(&key) {
            if record.wgs84.is_none() {
                record.wgs84 = Some(p);
            }
            return Some(Normalized::Cached(p));
        }
        if let Some(p) = record.wgs84 {
            self.cache.insert_if_absent(key, p);
            return Some(Normalized::Cached(p));
        }

        let grid = record.grid_point()?;
        let resolution = self.resolve(grid).await;
        let stored = self.cache.insert_if_absent(key, resolution.point());
        record.wgs84 = Some(stored);
        debug!("{} -> ({:.5}, {:.5})", record.location, stored.lng, stored.lat);
        Some(Normalized::Converted(resolution))
    }

    /// Address search by free-text name. Never cached; any failure yields the
    /// default position.
    pub async fn normalize_by_name(&self, name: &str) -> GeoPoint {
        match self.lookup.search_address(name).await {
            Ok(p) => p,
            Err(e) => {
                warn!("address search for '{}' failed: {}", name, e);
                DEFAULT_POINT
            }
        }
    }

    /// Convert records in stored order until `requested` (capped at
    /// [`MAX_BATCH`]) new conversions were made. Cached records are counted
    /// but do not use up the limit.
    pub async fn convert_batch(&mut self, records: &mut [FireRecord], requested: usize) -> BatchReport {
        let mut report = BatchReport {
            limit: requested.min(MAX_BATCH),
            ..BatchReport::default()
        };

        for record in records.iter_mut() {
            let fresh = record.wgs84.is_none() && !self.cache.contains(&record.cache_key());
            if fresh && record.grid_point().is_some() && report.newly_converted >= report.limit {
                break;
            }
            match self.normalize(record).await {
                None => report.skipped += 1,
                Some(Normalized::Cached(_)) => report.already_cached += 1,
                Some(Normalized::Converted(r)) => {
                    report.newly_converted += 1;
                    if r.is_fallback() {
                        report.fallbacks += 1;
                    }
                    tokio::time::sleep(self.throttle).await;
                }
            }
        }
        report
    }
}
