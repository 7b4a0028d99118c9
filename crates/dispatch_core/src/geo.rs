//! Geographic primitives: the canonical coordinate type and Haversine
//! distance with LRU caching.
//!
//! Every coordinate entering the engine is normalized to [`GeoPoint`] at the
//! ingestion boundary; the legacy formatted-string encoding some driver
//! documents carry is parsed here and nowhere else.

use std::sync::{Mutex, OnceLock};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

use crate::error::DispatchError;

/// Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A structured latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject non-finite and out-of-range coordinates.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(DispatchError::Validation(format!(
                "non-finite coordinates ({}, {})",
                self.lat, self.lng
            )));
        }
        if self.lat.abs() > 90.0 || self.lng.abs() > 180.0 {
            return Err(DispatchError::Validation(format!(
                "coordinates out of range ({}, {})",
                self.lat, self.lng
            )));
        }
        Ok(())
    }
}

/// Uncached Haversine distance in kilometres.
fn haversine_km_uncached(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lng1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lng2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlng = (dlng * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Cache key: coordinates quantized to microdegrees (~0.1 m), which is finer
/// than any location in the campus registry.
type PointKey = (i64, i64);

fn quantize(p: GeoPoint) -> PointKey {
    (
        (p.lat * 1_000_000.0).round() as i64,
        (p.lng * 1_000_000.0).round() as i64,
    )
}

/// Global distance cache (50,000 entries).
fn distance_cache() -> &'static Mutex<LruCache<(PointKey, PointKey), f64>> {
    static CACHE: OnceLock<Mutex<LruCache<(PointKey, PointKey), f64>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        Mutex::new(LruCache::new(
            NonZeroUsize::new(50_000).expect("cache size must be non-zero"),
        ))
    })
}

/// Haversine distance between two points with LRU caching.
///
/// Uses a symmetric key (smaller quantized point first) to maximize cache hits.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (ka, kb) = (quantize(a), quantize(b));
    let key = if ka <= kb { (ka, kb) } else { (kb, ka) };

    let mut cache = match distance_cache().lock() {
        Ok(guard) => guard,
        // Fallback: compute without cache if mutex poisoned
        Err(_) => return haversine_km_uncached(a, b),
    };
    *cache.get_or_insert(key, || haversine_km_uncached(a, b))
}

/// Parse the legacy formatted coordinate encoding, e.g. `"13.135° N, 77.566° E"`.
///
/// Returns a [`DispatchError::Validation`] for anything that does not match the
/// `<deg>° <N|S>, <deg>° <E|W>` shape.
pub fn parse_coordinate_string(input: &str) -> Result<GeoPoint, DispatchError> {
    fn component(part: &str, positive: char, negative: char) -> Option<f64> {
        let part = part.trim();
        let (value, dir) = part.split_once('°')?;
        let value: f64 = value.trim().parse().ok()?;
        match dir.trim().chars().next()? {
            d if d == positive => Some(value),
            d if d == negative => Some(-value),
            _ => None,
        }
    }

    let malformed = || DispatchError::Validation(format!("malformed coordinate string: {input:?}"));
    let (lat_part, lng_part) = input.split_once(',').ok_or_else(malformed)?;
    let lat = component(lat_part, 'N', 'S').ok_or_else(malformed)?;
    let lng = component(lng_part, 'E', 'W').ok_or_else(malformed)?;

    let point = GeoPoint::new(lat, lng);
    point.validate()?;
    Ok(point)
}
