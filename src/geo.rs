//! Grid → WGS84 conversion strategies and the national bounding box.
//!
//! The local strategies are plain linear fits, not a real TM projection. They
//! are good enough to drop a marker in the right county.

use crate::types::{GeoPoint, GridPoint};

/// Approximate extent of South Korea, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.west..=self.east).contains(&p.lng) && (self.south..=self.north).contains(&p.lat)
    }
}

pub const KOREA_BBOX: BoundingBox = BoundingBox::new(125.0, 33.0, 132.0, 43.0);

/// Last-resort position (Goseong, Gangwon) used when every strategy fails.
pub const DEFAULT_POINT: GeoPoint = GeoPoint::new(128.4677, 38.3806);

/// `lng = x * scale + lng_offset`, `lat = y * scale + lat_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearApprox {
    pub scale: f64,
    pub lng_offset: f64,
    pub lat_offset: f64,
}

impl LinearApprox {
    pub fn apply(&self, g: GridPoint) -> GeoPoint {
        GeoPoint::new(g.x * self.scale + self.lng_offset, g.y * self.scale + self.lat_offset)
    }
}

/// Primary fit, tuned for central TM coordinates.
pub const APPROX_PRIMARY: LinearApprox = LinearApprox {
    scale: 0.000009,
    lng_offset: 126.0,
    lat_offset: 32.0,
};

/// Wider, flatter fit tried when the primary lands outside the box.
pub const APPROX_SECONDARY: LinearApprox = LinearApprox {
    scale: 0.0000025,
    lng_offset: 126.7,
    lat_offset: 36.5,
};

/// One link of the conversion chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Ask the remote transcoding service (TM → WGS84).
    RemoteTranscode,
    Linear(&'static str, LinearApprox),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match *self {
            Strategy::RemoteTranscode => "remote-transcode",
            Strategy::Linear(name, _) => name,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Strategy::RemoteTranscode)
    }
}

/// Ordered strategies, evaluated until one yields a point inside the box.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyChain {
    strategies: Vec<Strategy>,
    bbox: BoundingBox,
    fallback: GeoPoint,
}

impl StrategyChain {
    /// The two local fits, in order.
    pub fn local() -> Self {
        StrategyChain {
            strategies: vec![
                Strategy::Linear("approx-primary", APPROX_PRIMARY),
                Strategy::Linear("approx-secondary", APPROX_SECONDARY),
            ],
            bbox: KOREA_BBOX,
            fallback: DEFAULT_POINT,
        }
    }

    /// Remote transcoding first, then the local fits.
    pub fn with_remote() -> Self {
        let mut chain = Self::local();
        chain.strategies.insert(0, Strategy::RemoteTranscode);
        chain
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn accepts(&self, p: GeoPoint) -> bool {
        self.bbox.contains(p)
    }

    pub fn fallback(&self) -> GeoPoint {
        self.fallback
    }

    /// Run only the local strategies. Used where no remote call is wanted,
    /// e.g. placing map markers for records that were never converted.
    pub fn resolve_local(&self, g: GridPoint) -> Resolution {
        for s in &self.strategies {
            if let Strategy::Linear(name, approx) = *s {
                let p = approx.apply(g);
                if self.accepts(p) {
                    return Resolution::Accepted { point: p, strategy: name };
                }
            }
        }
        Resolution::Fallback(self.fallback)
    }
}

/// Result of running a chain over one grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Accepted { point: GeoPoint, strategy: &'static str },
    Fallback(GeoPoint),
}

impl Resolution {
    pub fn point(&self) -> GeoPoint {
        match *self {
            Resolution::Accepted { point, .. } => point,
            Resolution::Fallback(point) => point,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_edges_are_inclusive() {
        assert!(KOREA_BBOX.contains(GeoPoint::new(125.0, 33.0)));
        assert!(KOREA_BBOX.contains(GeoPoint::new(132.0, 43.0)));
        assert!(!KOREA_BBOX.contains(GeoPoint::new(124.999, 38.0)));
        assert!(!KOREA_BBOX.contains(GeoPoint::new(128.0, 43.001)));
    }

    #[test]
    fn primary_fit_accepts_central_grid_point() {
        let r = StrategyChain::local().resolve_local(GridPoint { x: 300000.0, y: 500000.0 });
        match r {
            Resolution::Accepted { point, strategy } => {
                assert_eq!(strategy, "approx-primary");
                assert!((point.lng - 128.7).abs() < 1e-9);
                assert!((point.lat - 36.5).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn secondary_fit_used_when_primary_leaves_box() {
        // primary: lat = 1_200_000 * 9e-6 + 32 = 42.8 ok, lng = 800_000 * 9e-6 + 126 = 133.2 out
        // secondary: lng = 128.7, lat = 39.5
        let r = StrategyChain::local().resolve_local(GridPoint { x: 800000.0, y: 1200000.0 });
        match r {
            Resolution::Accepted { point, strategy } => {
                assert_eq!(strategy, "approx-secondary");
                assert!(KOREA_BBOX.contains(point));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn far_away_point_falls_back_to_default() {
        let r = StrategyChain::local().resolve_local(GridPoint { x: 1.0e8, y: 1.0e8 });
        assert!(r.is_fallback());
        assert_eq!(r.point(), DEFAULT_POINT);
    }

    #[test]
    fn remote_chain_puts_transcode_first() {
        let chain = StrategyChain::with_remote();
        assert!(chain.strategies()[0].is_remote());
        assert_eq!(chain.strategies().len(), 3);
        assert_eq!(chain.strategies()[1].name(), "approx-primary");
    }
}
