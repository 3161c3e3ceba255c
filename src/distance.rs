//! # Cumulative Distance
//!
//! Great-circle distance accumulated along a gap-filled sample series.
//!
//! [`cumulative_distance`] is the direct O(n) scan with an optional early
//! stop at a target position. [`DistanceProfile`] does the same scan once
//! and keeps a prefix sum per sample index, so the distance at any frame is
//! an O(1) lookup instead of a rescan from the start of the track.

use std::collections::HashMap;

use crate::geo_utils::great_circle_km;
use crate::{GpsPoint, OverlayError, Result, SampleSeries};

/// Distance in kilometers along the gap-filled series.
///
/// With `until`, accumulation stops at the first pair whose earlier
/// endpoint has exactly the target's latitude and longitude, giving the
/// distance travelled up to the first time the track reached that point.
/// A target that never appears leaves the full length.
///
/// # Errors
///
/// [`OverlayError::EmptySeries`] with fewer than two usable samples.
///
/// # Example
/// ```
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use track_overlay::{cumulative_distance, GpsPoint, Reading, Sample, SampleSeries};
///
/// let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
/// let series: SampleSeries = (0..5)
///     .map(|i| Sample::valid(t + TimeDelta::seconds(i), Reading::new(52.0 + i as f64 * 0.01, 13.0, 0.0, 0.0, 0.0)))
///     .collect();
///
/// let middle: GpsPoint = series.samples()[2].reading.unwrap().point();
/// let full = cumulative_distance(&series, None).unwrap();
/// let half = cumulative_distance(&series, Some(&middle)).unwrap();
/// assert!((half - full / 2.0).abs() < 1e-6);
/// ```
pub fn cumulative_distance(series: &SampleSeries, until: Option<&GpsPoint>) -> Result<f64> {
    let mut points = series.gap_fill().established().map(|f| f.reading.point());
    let mut prev = points.next().ok_or(OverlayError::EmptySeries)?;

    let mut total = 0.0;
    let mut pairs = 0usize;

    for next in points {
        if until.is_some_and(|target| prev.same_position(target)) {
            return Ok(total);
        }
        total += great_circle_km(&prev, &next);
        pairs += 1;
        prev = next;
    }

    if pairs == 0 {
        return Err(OverlayError::EmptySeries);
    }
    Ok(total)
}

/// Bit-exact coordinate key; `-0.0` and `0.0` share a key.
type CoordKey = (u64, u64);

fn coord_key(p: &GpsPoint) -> CoordKey {
    ((p.latitude + 0.0).to_bits(), (p.longitude + 0.0).to_bits())
}

/// Prefix sums of cumulative distance, one per sample index.
///
/// Built once per track and shared read-only by every frame.
#[derive(Debug, Clone)]
pub struct DistanceProfile {
    /// Kilometers from the start of the series to each index
    prefix: Vec<f64>,
    /// First index at which each exact coordinate appears
    first_seen: HashMap<CoordKey, usize>,
}

impl DistanceProfile {
    /// # Errors
    ///
    /// [`OverlayError::EmptySeries`] with fewer than two usable samples.
    pub fn build(series: &SampleSeries) -> Result<Self> {
        let mut prefix = vec![0.0; series.len()];
        let mut first_seen = HashMap::new();

        let mut total = 0.0;
        let mut prev: Option<GpsPoint> = None;
        let mut usable = 0usize;

        for filled in series.gap_fill().established() {
            let point = filled.reading.point();
            if let Some(p) = prev {
                total += great_circle_km(&p, &point);
            }
            prefix[filled.index] = total;
            first_seen.entry(coord_key(&point)).or_insert(filled.index);
            prev = Some(point);
            usable += 1;
        }

        if usable < 2 {
            return Err(OverlayError::EmptySeries);
        }

        Ok(Self { prefix, first_seen })
    }

    /// Distance travelled when sample `index` was recorded.
    pub fn at(&self, index: usize) -> Option<f64> {
        self.prefix.get(index).copied()
    }

    /// Same result as [`cumulative_distance`] with `until = Some(point)`.
    pub fn until(&self, point: &GpsPoint) -> f64 {
        match self.first_seen.get(&coord_key(point)) {
            Some(&index) => self.prefix[index],
            None => self.total(),
        }
    }

    pub fn total(&self) -> f64 {
        self.prefix.last().copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Reading, Sample};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn at(lat: f64, lon: f64) -> Reading {
        Reading::new(lat, lon, 0.0, 0.0, 0.0)
    }

    /// Wiggly track with gaps, including a revisit of the start position.
    fn gappy_track() -> SampleSeries {
        SampleSeries::new(vec![
            Sample::invalid(t(0)),
            Sample::valid(t(1), at(47.000, 8.000)),
            Sample::valid(t(2), at(47.001, 8.002)),
            Sample::invalid(t(3)),
            Sample::valid(t(4), at(47.003, 8.001)),
            Sample::valid(t(5), at(47.002, 8.004)),
            Sample::invalid(t(6)),
            Sample::valid(t(7), at(47.000, 8.000)),
            Sample::valid(t(8), at(47.004, 7.999)),
        ])
    }

    #[test]
    fn test_scenario_distance() {
        let series = SampleSeries::new(vec![
            Sample::valid(t(0), at(52.0, 13.0)),
            Sample::invalid(t(10)),
            Sample::valid(t(20), at(52.1, 13.1)),
        ]);
        let km = cumulative_distance(&series, None).unwrap();
        let direct = great_circle_km(&GpsPoint::new(52.0, 13.0), &GpsPoint::new(52.1, 13.1));
        assert!(approx_eq(km, direct, 1e-12));
        assert!(approx_eq(km, 13.05, 0.05));
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(cumulative_distance(&SampleSeries::default(), None), Err(OverlayError::EmptySeries));

        let single = SampleSeries::new(vec![Sample::invalid(t(0)), Sample::valid(t(1), at(1.0, 1.0))]);
        assert_eq!(cumulative_distance(&single, None), Err(OverlayError::EmptySeries));
        assert!(DistanceProfile::build(&single).is_err());
    }

    #[test]
    fn test_carried_samples_add_nothing() {
        let series = SampleSeries::new(vec![Sample::valid(t(0), at(1.0, 1.0)), Sample::invalid(t(1))]);
        assert_eq!(cumulative_distance(&series, None), Ok(0.0));
    }

    #[test]
    fn test_until_stops_at_first_occurrence() {
        let series = gappy_track();
        let start = GpsPoint::new(47.000, 8.000);
        // The start position reappears at index 7; the first match wins
        assert_eq!(cumulative_distance(&series, Some(&start)), Ok(0.0));

        let third = GpsPoint::new(47.003, 8.001);
        let expected = great_circle_km(&GpsPoint::new(47.000, 8.000), &GpsPoint::new(47.001, 8.002))
            + great_circle_km(&GpsPoint::new(47.001, 8.002), &third);
        assert!(approx_eq(cumulative_distance(&series, Some(&third)).unwrap(), expected, 1e-12));
    }

    #[test]
    fn test_until_unknown_point_is_full_length() {
        let series = gappy_track();
        let full = cumulative_distance(&series, None).unwrap();
        let nowhere = GpsPoint::new(0.0, 0.0);
        assert_eq!(cumulative_distance(&series, Some(&nowhere)), Ok(full));
    }

    #[test]
    fn test_profile_matches_prefix_scans() {
        let series = gappy_track();
        let profile = DistanceProfile::build(&series).unwrap();
        assert_eq!(profile.len(), series.len());
        assert_eq!(profile.at(0), Some(0.0));

        for i in 2..series.len() {
            let prefix = SampleSeries::new(series.samples()[..=i].to_vec());
            let scanned = cumulative_distance(&prefix, None).unwrap();
            assert!(approx_eq(profile.at(i).unwrap(), scanned, 1e-9), "index {}", i);
        }

        let full = cumulative_distance(&series, None).unwrap();
        assert!(approx_eq(profile.total(), full, 1e-9));
        assert_eq!(profile.at(series.len()), None);
    }

    #[test]
    fn test_profile_until_agrees_with_scan() {
        let series = gappy_track();
        let profile = DistanceProfile::build(&series).unwrap();

        for reading in series.filled_readings().into_iter().flatten() {
            let p = reading.point();
            let scanned = cumulative_distance(&series, Some(&p)).unwrap();
            assert!(approx_eq(profile.until(&p), scanned, 1e-9));
        }
        assert!(approx_eq(profile.until(&GpsPoint::new(1.0, 1.0)), profile.total(), 1e-12));
    }

    #[test]
    fn test_profile_is_monotonic() {
        let profile = DistanceProfile::build(&gappy_track()).unwrap();
        for i in 1..profile.len() {
            assert!(profile.at(i).unwrap() >= profile.at(i - 1).unwrap());
        }
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let series = SampleSeries::new(vec![
            Sample::valid(t(0), at(0.0, 0.0)),
            Sample::valid(t(1), at(0.001, 0.001)),
        ]);
        let profile = DistanceProfile::build(&series).unwrap();
        assert_eq!(profile.until(&GpsPoint::new(-0.0, -0.0)), 0.0);
    }
}
