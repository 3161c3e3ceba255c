//! # Track Overlay
//!
//! Telemetry-to-frame alignment and minimap overlay composition for
//! action-camera video.
//!
//! This library provides:
//! - Gap-filled scans over GPS sample series with missing fixes
//! - Bounding regions and a geographic-to-pixel projector for the minimap
//! - Cumulative great-circle distance with O(1) per-frame lookup
//! - Nearest-timestamp sample selection for scheduled overlay frames
//! - Pure overlay composition into draw commands for an external rasterizer
//!
//! ## Features
//!
//! - **`parallel`** - Compose overlay frames in parallel with rayon
//! - **`async`** - Extract telemetry from several files concurrently with tokio
//! - **`json`** - Serialize configuration and overlay layers with serde
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use track_overlay::{cumulative_distance, nearest, BoundingRegion, Reading, Sample, SampleSeries};
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
//! let series = SampleSeries::new(vec![
//!     Sample::valid(t0, Reading::new(52.0, 13.0, 35.0, 4.0, 90.0)),
//!     Sample::invalid(t0 + chrono::TimeDelta::seconds(10)),
//!     Sample::valid(t0 + chrono::TimeDelta::seconds(20), Reading::new(52.1, 13.1, 36.0, 4.2, 45.0)),
//! ]);
//!
//! let region = BoundingRegion::from_series(&series).unwrap();
//! assert_eq!(region.min_lat, 52.0);
//! assert_eq!(region.max_lon, 13.1);
//!
//! let km = cumulative_distance(&series, None).unwrap();
//! assert!((km - 13.05).abs() < 0.05);
//!
//! let hit = nearest(t0 + chrono::TimeDelta::seconds(9), series.samples()).unwrap();
//! assert_eq!(hit.index, 1);
//! ```

use chrono::{DateTime, Utc};

pub mod error;
pub use error::{OverlayError, Result};

// Forward carry of the last good reading
pub mod gap_fill;
pub use gap_fill::{FilledSample, GapFill, GapFillState};

pub mod geo_utils;

pub mod projection;
pub use projection::{project, PixelPoint, PixelRect, Projector};

pub mod distance;
pub use distance::{cumulative_distance, DistanceProfile};

pub mod sampler;
pub use sampler::{nearest, FrameSampler, Nearest};

pub mod schedule;
pub use schedule::{RenderFrame, RenderSchedule, ScheduledFrames};

// Overlay composition (pure, no I/O)
pub mod overlay;
pub use overlay::{
    DrawCommand, Minimap, OverlayComposer, OverlayConfig, OverlayLayer, Rasterizer, Rgba,
    TextFields, TrackContext,
};

// External collaborators and track assembly
pub mod telemetry;
pub use telemetry::{
    build_track, ExtractedVideo, FixedZone, TelemetryExtractor, TimezoneResolver, Track,
    TrackBuild, TrackSegment, VideoMetadata,
};

pub mod pipeline;
pub use pipeline::{plan_video, render_track, render_video, FrameSample, RenderedFrame, VideoOverlays};

#[cfg(feature = "parallel")]
pub use pipeline::render_video_parallel;

#[cfg(feature = "async")]
pub use pipeline::build_track_concurrent;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use track_overlay::GpsPoint;
/// let point = GpsPoint::new(52.5200, 13.4050); // Berlin
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Exact coordinate equality on the raw values (no epsilon).
    pub fn same_position(&self, other: &GpsPoint) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl From<GpsPoint> for geo::Point<f64> {
    fn from(p: GpsPoint) -> Self {
        geo::Point::new(p.longitude, p.latitude)
    }
}

/// The telemetry fields of a usable sample.
///
/// All five fields are always present, even where an overlay element only
/// reads a subset of them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Degrees, signed
    pub latitude: f64,
    /// Degrees, signed
    pub longitude: f64,
    /// Meters
    pub elevation: f64,
    /// Meters per second
    pub speed: f64,
    /// Degrees (course over ground)
    pub heading: f64,
}

impl Reading {
    pub fn new(latitude: f64, longitude: f64, elevation: f64, speed: f64, heading: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            speed,
            heading,
        }
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// Speed converted to km/h.
    pub fn speed_kmh(&self) -> f64 {
        self.speed * 3.6
    }
}

/// One telemetry reading as delivered by the decoder.
///
/// An invalid sample has no `reading`: its fields are unreadable by
/// construction and can only be substituted through [`GapFillState`].
/// A coordinate of `0.0` is a real coordinate, never "missing".
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Absolute capture time, if the decoder produced one
    pub timestamp: Option<DateTime<Utc>>,
    /// `Some` when the sample is valid
    pub reading: Option<Reading>,
}

impl Sample {
    pub fn new(timestamp: Option<DateTime<Utc>>, reading: Option<Reading>) -> Self {
        Self { timestamp, reading }
    }

    /// A valid, timestamped sample.
    pub fn valid(timestamp: DateTime<Utc>, reading: Reading) -> Self {
        Self::new(Some(timestamp), Some(reading))
    }

    /// A timestamped sample without a usable fix.
    pub fn invalid(timestamp: DateTime<Utc>) -> Self {
        Self::new(Some(timestamp), None)
    }

    pub fn is_valid(&self) -> bool {
        self.reading.is_some()
    }
}

/// An ordered, read-only sequence of samples.
///
/// Samples are in ascending timestamp order within one source file and in
/// source-file order after [`SampleSeries::concat`]; nothing re-sorts them.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Concatenate series in the order given.
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = SampleSeries>,
    {
        let samples = parts.into_iter().flat_map(|s| s.samples).collect();
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_valid()).count()
    }

    /// Start a forward gap-filled scan with its own fresh state.
    pub fn gap_fill(&self) -> GapFill<'_> {
        GapFill::new(&self.samples)
    }

    /// Gap-filled reading for every index, `None` before the first valid sample.
    pub fn filled_readings(&self) -> Vec<Option<Reading>> {
        let mut state = GapFillState::new();
        self.samples.iter().map(|s| state.fill(s).ok()).collect()
    }

    /// Earliest and latest timestamp present in the series.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut timestamps = self.samples.iter().filter_map(|s| s.timestamp);
        let first = timestamps.next()?;
        Some(timestamps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }

    /// First timestamp in series order; the time base of a video's telemetry.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.iter().find_map(|s| s.timestamp)
    }
}

impl From<Vec<Sample>> for SampleSeries {
    fn from(samples: Vec<Sample>) -> Self {
        Self::new(samples)
    }
}

impl FromIterator<Sample> for SampleSeries {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Geographic extent of a gap-filled track.
///
/// Computed once per track and reused for every frame of a render.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingRegion {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingRegion {
    /// Bounding region of the gap-filled series.
    ///
    /// Fails with [`OverlayError::EmptySeries`] when the series has no valid sample.
    pub fn from_series(series: &SampleSeries) -> Result<Self> {
        geo_utils::compute_region(series)
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// True when the region cannot be projected (zero width or height).
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    /// Get the center point of the region.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, point: &GpsPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lon..=self.max_lon).contains(&point.longitude)
    }
}

// ============================================================================
// Tests
// ============================================================================
