//! # Overlay Composition
//!
//! Turns one sampled frame into a transparent overlay layer: text readouts
//! plus a minimap of the whole track with a crosshair at the current
//! position.
//!
//! Composition is pure. It produces an ordered list of [`DrawCommand`]s
//! that an external [`Rasterizer`] replays onto a canvas; encoding and
//! writing images happens elsewhere.
//!
//! Layout for a `W × H` frame:
//!
//! | Element | Position |
//! |---------|----------|
//! | Local time | (50, 100) |
//! | Speed | (50, H − 150) |
//! | Latitude / longitude | (50, H − 100) / (240, H − 100) |
//! | Distance | (50, H − 50) |
//! | Minimap | `0.15·W × 0.075·W`, 20 px from the bottom-right corner |

use std::sync::Arc;

use chrono_tz::Tz;
use geo::{Coord, LineString, Simplify};
use log::{debug, warn};

use crate::distance::DistanceProfile;
use crate::pipeline::FrameSample;
use crate::projection::{PixelPoint, PixelRect, Projector};
use crate::telemetry::{TimezoneResolver, Track};
use crate::{BoundingRegion, GpsPoint, OverlayError, Reading, Result};

const MINIMAP_MARGIN_PX: f64 = 20.0;
const MINIMAP_PADDING_PX: f64 = 5.0;
const MINIMAP_CORNER_RADIUS: f64 = 10.0;
const TRACK_POINT_PX: f64 = 1.0;
const CROSSHAIR_PX: f64 = 1.0;

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Configuration
// =============================================================================

/// Overlay rendering options.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct OverlayConfig {
    /// Overlay frames per second of video
    pub overlay_frame_rate: f64,
    /// Native frame rate assumed when a video does not report one
    pub native_frame_rate: f64,
    /// Minimap width as a fraction of the frame width
    pub minimap_fraction: f64,
    /// Zone used when the resolver has no answer for a position
    pub timezone_fallback: Tz,
    pub font_size_px: f64,
    /// Douglas-Peucker tolerance for the minimap path in pixels (0 = off)
    pub minimap_simplify_px: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            overlay_frame_rate: 2.0,  // 2 overlays per second of video
            native_frame_rate: 60.0,  // Typical action-camera rate
            minimap_fraction: 0.15,
            timezone_fallback: chrono_tz::Europe::Berlin,
            font_size_px: 30.0,
            minimap_simplify_px: 0.0,
        }
    }
}

impl OverlayConfig {
    /// # Errors
    ///
    /// [`OverlayError::InvalidConfig`] naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("overlay_frame_rate", self.overlay_frame_rate),
            ("native_frame_rate", self.native_frame_rate),
            ("font_size_px", self.font_size_px),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(OverlayError::invalid_config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !(self.minimap_fraction > 0.0 && self.minimap_fraction <= 1.0) {
            return Err(OverlayError::invalid_config(format!(
                "minimap_fraction must be in (0, 1], got {}",
                self.minimap_fraction
            )));
        }
        if !self.minimap_simplify_px.is_finite() || self.minimap_simplify_px < 0.0 {
            return Err(OverlayError::invalid_config(format!(
                "minimap_simplify_px must be non-negative, got {}",
                self.minimap_simplify_px
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON config. Missing keys take their defaults.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| OverlayError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Draw Commands
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in `[0, 1]`
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 1.0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 1.0);
    pub const MINIMAP_BACKGROUND: Rgba = Rgba::new(80, 80, 80, 0.5);

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// One primitive for the rasterizer, in paint order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum DrawCommand {
    RoundedRect { rect: PixelRect, radius: f64, fill: Rgba },
    FillRect { rect: PixelRect, fill: Rgba },
    /// Square dots of side `size`, each anchored at its top-left corner
    Points { points: Arc<[PixelPoint]>, size: f64, fill: Rgba },
    /// Filled text outlined with `stroke`; `at` is the baseline start
    Text { text: String, at: PixelPoint, font_px: f64, fill: Rgba, stroke: Rgba },
}

/// Canvas backend that replays draw commands.
pub trait Rasterizer {
    type Error;

    fn fill_rounded_rect(&mut self, rect: &PixelRect, radius: f64, fill: Rgba) -> std::result::Result<(), Self::Error>;
    fn fill_rect(&mut self, rect: &PixelRect, fill: Rgba) -> std::result::Result<(), Self::Error>;
    fn fill_points(&mut self, points: &[PixelPoint], size: f64, fill: Rgba) -> std::result::Result<(), Self::Error>;
    fn draw_text(
        &mut self,
        text: &str,
        at: PixelPoint,
        font_px: f64,
        fill: Rgba,
        stroke: Rgba,
    ) -> std::result::Result<(), Self::Error>;
}

// =============================================================================
// Overlay Layer
// =============================================================================

/// Text readouts of one frame, already formatted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct TextFields {
    pub local_time: String,
    pub latitude: String,
    pub longitude: String,
    pub speed: String,
    /// Absent when the track is too short to measure
    pub distance: Option<String>,
}

/// Minimap geometry of one frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Minimap {
    /// Background rectangle
    pub frame: PixelRect,
    /// Area the track is projected into
    pub plot: PixelRect,
    /// Projected track, shared by every frame of a video
    pub path: Arc<[PixelPoint]>,
    /// Current position
    pub marker: PixelPoint,
}

/// A composed overlay frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct OverlayLayer {
    pub width: u32,
    pub height: u32,
    pub text: TextFields,
    pub minimap: Option<Minimap>,
    pub commands: Vec<DrawCommand>,
}

impl OverlayLayer {
    /// Replay the draw commands in order, stopping at the first error.
    pub fn render_to<R: Rasterizer>(&self, rasterizer: &mut R) -> std::result::Result<(), R::Error> {
        for command in &self.commands {
            match command {
                DrawCommand::RoundedRect { rect, radius, fill } => rasterizer.fill_rounded_rect(rect, *radius, *fill)?,
                DrawCommand::FillRect { rect, fill } => rasterizer.fill_rect(rect, *fill)?,
                DrawCommand::Points { points, size, fill } => rasterizer.fill_points(points, *size, *fill)?,
                DrawCommand::Text { text, at, font_px, fill, stroke } => {
                    rasterizer.draw_text(text, *at, *font_px, *fill, *stroke)?
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Track Context
// =============================================================================

/// Per-track aggregates, computed once and shared by every video.
///
/// The region and the distance profile are independent: a track that is
/// too short for a distance still gets a minimap, and the other way round.
#[derive(Debug, Clone)]
pub struct TrackContext {
    region: Option<BoundingRegion>,
    profile: Option<DistanceProfile>,
    /// Gap-filled reading per track index
    readings: Vec<Option<Reading>>,
    /// Gap-filled position of every established sample
    path: Vec<GpsPoint>,
}

impl TrackContext {
    pub fn new(track: &Track) -> Self {
        let readings = track.series.filled_readings();
        let path: Vec<GpsPoint> = readings.iter().flatten().map(Reading::point).collect();

        let region = BoundingRegion::from_series(&track.series)
            .map_err(|e| warn!("[Overlay] No minimap region: {}", e))
            .ok();
        let profile = DistanceProfile::build(&track.series)
            .map_err(|e| warn!("[Overlay] No distance readout: {}", e))
            .ok();

        debug!(
            "[Overlay] Track context: {} samples, {} path points, total {:.3}km",
            readings.len(),
            path.len(),
            profile.as_ref().map_or(0.0, DistanceProfile::total)
        );

        Self {
            region,
            profile,
            readings,
            path,
        }
    }

    pub fn region(&self) -> Option<&BoundingRegion> {
        self.region.as_ref()
    }

    pub fn profile(&self) -> Option<&DistanceProfile> {
        self.profile.as_ref()
    }

    pub fn path(&self) -> &[GpsPoint] {
        &self.path
    }

    /// Gap-filled reading at a track index.
    pub fn reading(&self, index: usize) -> Option<Reading> {
        self.readings.get(index).copied().flatten()
    }

    /// Kilometers travelled up to a track index.
    pub fn distance_at(&self, index: usize) -> Option<f64> {
        self.profile.as_ref()?.at(index)
    }
}

// =============================================================================
// Composer
// =============================================================================

#[derive(Debug, Clone)]
struct MinimapLayout {
    frame: PixelRect,
    projector: Projector,
    path: Arc<[PixelPoint]>,
}

impl MinimapLayout {
    fn new(config: &OverlayConfig, context: &TrackContext, width: f64, height: f64) -> Result<Self> {
        let w = width * config.minimap_fraction;
        let h = w / 2.0;
        let frame = PixelRect::new(width - w - MINIMAP_MARGIN_PX, height - h - MINIMAP_MARGIN_PX, w, h);

        let region = context.region().copied().ok_or(OverlayError::EmptySeries)?;
        let projector = Projector::new(region, frame.inset(MINIMAP_PADDING_PX))?;

        let projected: Vec<PixelPoint> = context.path().iter().map(|p| projector.project(*p)).collect();
        let path = if config.minimap_simplify_px > 0.0 {
            simplify_path(projected, config.minimap_simplify_px)
        } else {
            projected
        };

        Ok(Self {
            frame,
            projector,
            path: path.into(),
        })
    }
}

/// Douglas-Peucker in pixel space.
fn simplify_path(points: Vec<PixelPoint>, tolerance_px: f64) -> Vec<PixelPoint> {
    let before = points.len();
    let line = LineString::new(points.into_iter().map(Coord::from).collect());
    let simplified: Vec<PixelPoint> = line.simplify(&tolerance_px).0.into_iter().map(PixelPoint::from).collect();
    debug!("[Overlay] Simplified minimap path {} -> {} points", before, simplified.len());
    simplified
}

fn format_local_time(sample: &FrameSample, zone: Tz) -> String {
    sample.timestamp.with_timezone(&zone).format(LOCAL_TIME_FORMAT).to_string()
}

/// Composes overlay layers for one video.
///
/// Built once per video; [`OverlayComposer::compose`] is then a pure
/// function of the frame sample and can run on any thread.
///
/// # Example
/// ```
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use track_overlay::{
///     FixedZone, OverlayComposer, OverlayConfig, Reading, Sample, SampleSeries, Track, TrackContext,
/// };
/// use track_overlay::telemetry::{ExtractedVideo, VideoMetadata};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
/// let series: SampleSeries = (0..10)
///     .map(|i| Sample::valid(t0 + TimeDelta::seconds(i), Reading::new(52.0 + i as f64 * 0.001, 13.0 + i as f64 * 0.002, 35.0, 5.0, 90.0)))
///     .collect();
/// let video = VideoMetadata { duration_secs: 10.0, frame_rate: 60.0, width: 1920, height: 1080, creation_time: None, size_bytes: 0 };
/// let track = Track::assemble(vec![ExtractedVideo { source: "GH010001.MP4".into(), series, video }]);
///
/// let context = TrackContext::new(&track);
/// let zone = FixedZone(chrono_tz::Europe::Berlin);
/// let composer = OverlayComposer::new(&OverlayConfig::default(), &context, (1920, 1080), &zone);
/// assert!(composer.has_minimap());
/// ```
pub struct OverlayComposer<'a> {
    context: &'a TrackContext,
    resolver: &'a dyn TimezoneResolver,
    fallback_zone: Tz,
    font_px: f64,
    width: u32,
    height: u32,
    minimap: Option<MinimapLayout>,
}

impl<'a> OverlayComposer<'a> {
    pub fn new(
        config: &OverlayConfig,
        context: &'a TrackContext,
        dimensions: (u32, u32),
        resolver: &'a dyn TimezoneResolver,
    ) -> Self {
        let (width, height) = dimensions;
        let minimap = MinimapLayout::new(config, context, f64::from(width), f64::from(height))
            .map_err(|e| warn!("[Overlay] Minimap disabled for {}x{}: {}", width, height, e))
            .ok();

        Self {
            context,
            resolver,
            fallback_zone: config.timezone_fallback,
            font_px: config.font_size_px,
            width,
            height,
            minimap,
        }
    }

    pub fn has_minimap(&self) -> bool {
        self.minimap.is_some()
    }

    /// Compose the overlay for one sampled frame.
    pub fn compose(&self, sample: &FrameSample) -> OverlayLayer {
        let reading = sample.reading;
        let zone = self.resolver.resolve(reading.point()).unwrap_or(self.fallback_zone);

        let text = TextFields {
            local_time: format_local_time(sample, zone),
            latitude: reading.latitude.to_string(),
            longitude: reading.longitude.to_string(),
            speed: format!("{:.2} km/h", reading.speed_kmh()),
            distance: self
                .context
                .distance_at(sample.track_index)
                .map(|km| format!("{:.3}km", km)),
        };

        let h = f64::from(self.height);
        let mut commands = Vec::with_capacity(9);
        let mut push_text = |value: &str, x: f64, y: f64| {
            commands.push(DrawCommand::Text {
                text: value.to_string(),
                at: PixelPoint::new(x, y),
                font_px: self.font_px,
                fill: Rgba::WHITE,
                stroke: Rgba::BLACK,
            });
        };
        push_text(&text.local_time, 50.0, 100.0);
        push_text(&text.latitude, 50.0, h - 100.0);
        push_text(&text.longitude, 240.0, h - 100.0);
        push_text(&text.speed, 50.0, h - 150.0);
        if let Some(distance) = &text.distance {
            push_text(distance, 50.0, h - 50.0);
        }

        let minimap = self.minimap.as_ref().map(|layout| {
            let plot = *layout.projector.target();
            let marker = layout.projector.project(reading.point());

            commands.push(DrawCommand::RoundedRect {
                rect: layout.frame,
                radius: MINIMAP_CORNER_RADIUS,
                fill: Rgba::MINIMAP_BACKGROUND,
            });
            commands.push(DrawCommand::Points {
                points: Arc::clone(&layout.path),
                size: TRACK_POINT_PX,
                fill: Rgba::WHITE,
            });
            // Crosshair
            commands.push(DrawCommand::FillRect {
                rect: PixelRect::new(marker.x, plot.y, CROSSHAIR_PX, plot.height),
                fill: Rgba::WHITE,
            });
            commands.push(DrawCommand::FillRect {
                rect: PixelRect::new(plot.x, marker.y, plot.width, CROSSHAIR_PX),
                fill: Rgba::WHITE,
            });

            Minimap {
                frame: layout.frame,
                plot,
                path: Arc::clone(&layout.path),
                marker,
            }
        });

        OverlayLayer {
            width: self.width,
            height: self.height,
            text,
            minimap,
            commands,
        }
    }
}
