//! # Telemetry Sources and Track Assembly
//!
//! Decoding telemetry out of a video container and looking up a time zone
//! for a coordinate both happen outside this crate. They plug in through
//! [`TelemetryExtractor`] and [`TimezoneResolver`].
//!
//! [`build_track`] runs the extractor over every source file of one
//! recording session and concatenates the results into a single [`Track`].
//! A file that fails is logged and left out; it never aborts the session.

use std::ops::Range;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{info, warn};

use crate::{GpsPoint, OverlayError, Result, SampleSeries};

/// Container-level facts about one video file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoMetadata {
    pub duration_secs: f64,
    /// Native frames per second; `0.0` when the container does not say
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
    pub creation_time: Option<DateTime<Utc>>,
    pub size_bytes: u64,
}

/// Everything pulled out of one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedVideo {
    pub source: String,
    pub series: SampleSeries,
    pub video: VideoMetadata,
}

/// Decodes the GPS telemetry stream and probes the video of a source file.
pub trait TelemetryExtractor {
    /// # Errors
    ///
    /// [`OverlayError::NoTelemetryStream`] when the file carries no GPS
    /// stream, [`OverlayError::Extraction`] for any other failure.
    fn extract(&self, source: &str) -> Result<ExtractedVideo>;
}

/// Maps a coordinate to the time zone in force there.
pub trait TimezoneResolver: Send + Sync {
    fn resolve(&self, point: GpsPoint) -> Option<Tz>;
}

impl<F> TimezoneResolver for F
where
    F: Fn(GpsPoint) -> Option<Tz> + Send + Sync,
{
    fn resolve(&self, point: GpsPoint) -> Option<Tz> {
        self(point)
    }
}

/// Resolves every coordinate to the same zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedZone(pub Tz);

impl TimezoneResolver for FixedZone {
    fn resolve(&self, _point: GpsPoint) -> Option<Tz> {
        Some(self.0)
    }
}

/// The part of a track that came from one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSegment {
    pub source: String,
    /// Index range into [`Track::series`]
    pub range: Range<usize>,
    pub video: VideoMetadata,
}

/// All telemetry of one recording session, in source-file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub series: SampleSeries,
    pub segments: Vec<TrackSegment>,
    /// Earliest video creation time across the session
    pub start_time: Option<DateTime<Utc>>,
}

impl Track {
    /// Concatenate extracted videos in the order given.
    pub fn assemble(videos: Vec<ExtractedVideo>) -> Self {
        let mut segments = Vec::with_capacity(videos.len());
        let mut parts = Vec::with_capacity(videos.len());
        let mut offset = 0;

        for extracted in videos {
            let len = extracted.series.len();
            segments.push(TrackSegment {
                source: extracted.source,
                range: offset..offset + len,
                video: extracted.video,
            });
            parts.push(extracted.series);
            offset += len;
        }

        let start_time = segments.iter().filter_map(|s| s.video.creation_time).min();

        Self {
            series: SampleSeries::concat(parts),
            segments,
            start_time,
        }
    }

    /// Samples of the `index`-th segment.
    pub fn segment_series(&self, index: usize) -> Option<SampleSeries> {
        let segment = self.segments.get(index)?;
        self.series
            .samples()
            .get(segment.range.clone())
            .map(|samples| SampleSeries::new(samples.to_vec()))
    }

    /// Output file name for the concatenated session video,
    /// e.g. `20240501_100000.mp4`.
    pub fn output_file_name(&self) -> Option<String> {
        self.start_time
            .map(|t| t.format("%Y%m%d_%H%M%S.mp4").to_string())
    }
}

/// Outcome of [`build_track`].
#[derive(Debug, Clone, Default)]
pub struct TrackBuild {
    pub track: Track,
    /// Sources that were left out, with the reason
    pub skipped: Vec<(String, OverlayError)>,
}

/// Extract every source in order and assemble the session track.
///
/// A source that fails extraction, or that yields an empty series, is
/// logged and skipped.
pub fn build_track<S, E>(sources: &[S], extractor: &E) -> TrackBuild
where
    S: AsRef<str>,
    E: TelemetryExtractor + ?Sized,
{
    info!("[Track] Extracting telemetry from {} files", sources.len());

    let results = sources
        .iter()
        .map(|s| (s.as_ref().to_string(), extractor.extract(s.as_ref())));
    collect_track(results)
}

/// Shared tail of the sequential and concurrent builders.
pub(crate) fn collect_track<I>(results: I) -> TrackBuild
where
    I: IntoIterator<Item = (String, Result<ExtractedVideo>)>,
{
    let start = std::time::Instant::now();
    let mut videos = Vec::new();
    let mut skipped = Vec::new();

    for (source, result) in results {
        match result.and_then(|v| non_empty(&source, v)) {
            Ok(video) => {
                info!(
                    "[Track] {}: {} samples ({} valid), {:.0}s @ {} fps, {}x{}, {}MiB",
                    source,
                    video.series.len(),
                    video.series.valid_count(),
                    video.video.duration_secs,
                    video.video.frame_rate,
                    video.video.width,
                    video.video.height,
                    video.video.size_bytes / 1024 / 1024
                );
                videos.push(video);
            }
            Err(e) => {
                warn!("[Track] Skipping {}: {}", source, e);
                skipped.push((source, e));
            }
        }
    }

    let track = Track::assemble(videos);
    info!(
        "[Track] Assembled {} segments, {} samples in {}ms (start: {})",
        track.segments.len(),
        track.series.len(),
        start.elapsed().as_millis(),
        track
            .start_time
            .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339())
    );

    TrackBuild { track, skipped }
}

fn non_empty(source: &str, video: ExtractedVideo) -> Result<ExtractedVideo> {
    if video.series.is_empty() {
        return Err(OverlayError::no_telemetry(source));
    }
    Ok(video)
}
