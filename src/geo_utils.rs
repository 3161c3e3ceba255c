//! # Geographic Utilities
//!
//! Core geographic computations for telemetry tracks.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`great_circle_km`] | Great-circle distance between two GPS points, in kilometers |
//! | [`compute_region`] | Bounding region of a gap-filled sample series |
//! | [`region_of_points`] | Bounding region of plain GPS points |
//!
//! ## Example
//!
//! ```rust
//! use track_overlay::{GpsPoint, geo_utils};
//!
//! let berlin = GpsPoint::new(52.5200, 13.4050);
//! let potsdam = GpsPoint::new(52.3906, 13.0645);
//!
//! let km = geo_utils::great_circle_km(&berlin, &potsdam);
//! assert!((km - 27.2).abs() < 0.5);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Spherical Law of Cosines
//!
//! The central angle is `acos(sin φ1 · sin φ2 + cos φ1 · cos φ2 · cos Δλ)`.
//! It is converted to degrees and scaled by 60 nautical-mile minutes per
//! degree × 1.1515 (statute miles per nautical mile) × 1.609344 (km per
//! mile), i.e. about 111.19 km per degree of arc. The `acos` argument is
//! clamped to `[-1, 1]` because rounding can push it just past 1 for nearly
//! identical points.
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).

use crate::{BoundingRegion, GpsPoint, OverlayError, Result, SampleSeries};

/// Statute miles per degree of arc (60 nautical-mile minutes × 1.1515).
const MILES_PER_DEGREE: f64 = 60.0 * 1.1515;

const KM_PER_MILE: f64 = 1.609344;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two GPS points in kilometers.
///
/// Identical coordinates return exactly `0.0` without touching the
/// trigonometric path.
///
/// # Example
///
/// ```rust
/// use track_overlay::{GpsPoint, geo_utils};
///
/// let p = GpsPoint::new(52.0, 13.0);
/// assert_eq!(geo_utils::great_circle_km(&p, &p), 0.0);
/// ```
pub fn great_circle_km(a: &GpsPoint, b: &GpsPoint) -> f64 {
    if a.same_position(b) {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let theta = (a.longitude - b.longitude).to_radians();

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * theta.cos();
    let angle = cos_angle.clamp(-1.0, 1.0).acos().to_degrees();

    angle * MILES_PER_DEGREE * KM_PER_MILE
}

// =============================================================================
// Bounding Region Functions
// =============================================================================

/// Compute the bounding region of a sample series.
///
/// Scans the series with a fresh gap-fill state and tracks the running
/// min/max latitude and longitude of every yielded reading, substituted or
/// not. Leading invalid samples contribute nothing.
///
/// # Errors
///
/// [`OverlayError::EmptySeries`] if no reading is ever yielded.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use track_overlay::{geo_utils, Reading, Sample, SampleSeries};
///
/// let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
/// let series = SampleSeries::new(vec![
///     Sample::valid(t, Reading::new(51.50, -0.13, 0.0, 0.0, 0.0)),
///     Sample::valid(t, Reading::new(51.51, -0.12, 0.0, 0.0, 0.0)),
/// ]);
///
/// let region = geo_utils::compute_region(&series).unwrap();
/// assert_eq!(region.min_lat, 51.50);
/// assert_eq!(region.max_lon, -0.12);
/// ```
pub fn compute_region(series: &SampleSeries) -> Result<BoundingRegion> {
    region_of_points(series.gap_fill().established().map(|f| f.reading.point()))
}

/// Bounding region of a sequence of points.
///
/// # Errors
///
/// [`OverlayError::EmptySeries`] for an empty sequence.
pub fn region_of_points<I>(points: I) -> Result<BoundingRegion>
where
    I: IntoIterator<Item = GpsPoint>,
{
    let mut points = points.into_iter();
    let first = points.next().ok_or(OverlayError::EmptySeries)?;

    let mut region = BoundingRegion {
        min_lat: first.latitude,
        max_lat: first.latitude,
        min_lon: first.longitude,
        max_lon: first.longitude,
    };

    for p in points {
        region.min_lat = region.min_lat.min(p.latitude);
        region.max_lat = region.max_lat.max(p.latitude);
        region.min_lon = region.min_lon.min(p.longitude);
        region.max_lon = region.max_lon.max(p.longitude);
    }

    Ok(region)
}

// =============================================================================
// Unit Tests
// =============================================================================
