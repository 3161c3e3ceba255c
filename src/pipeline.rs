//! # Render Pipeline
//!
//! Ties the stages together for a whole recording session:
//!
//! 1. [`plan_video`] walks a video's [`RenderSchedule`] and picks the
//!    nearest telemetry sample for every scheduled frame.
//! 2. [`render_video`] (or [`render_video_parallel`] with the `parallel`
//!    feature) composes an overlay layer per planned frame.
//! 3. [`render_track`] does both for every video of a track, sharing the
//!    track-wide region, distance profile and path between them.
//!
//! With the `async` feature, [`build_track_concurrent`] extracts telemetry
//! from several files at once on tokio's blocking pool.

use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "async")]
use std::sync::Arc;

#[cfg(feature = "async")]
use crate::telemetry::{collect_track, ExtractedVideo, TelemetryExtractor};

use crate::overlay::{OverlayComposer, OverlayConfig, OverlayLayer, TrackContext};
use crate::sampler::FrameSampler;
use crate::schedule::{RenderFrame, RenderSchedule};
use crate::telemetry::{TimezoneResolver, Track, TrackBuild, TrackSegment};
use crate::{OverlayError, Reading, Result};

/// The telemetry chosen for one scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub frame: RenderFrame,
    /// Index of the chosen sample in the track series
    pub track_index: usize,
    /// Raw timestamp of the chosen sample
    pub timestamp: DateTime<Utc>,
    /// Gap-filled reading at `track_index`
    pub reading: Reading,
}

/// A composed overlay ready to be rasterized.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    /// Position in the overlay image sequence
    pub ordinal: usize,
    /// `0000.png`, `0001.png`, ...
    pub file_name: String,
    pub layer: OverlayLayer,
}

impl RenderedFrame {
    fn new(ordinal: usize, layer: OverlayLayer) -> Self {
        Self {
            ordinal,
            file_name: format!("{:04}.png", ordinal),
            layer,
        }
    }
}

/// All overlay frames of one source video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOverlays {
    pub source: String,
    pub frames: Vec<RenderedFrame>,
}

/// Pick the telemetry for every scheduled frame of one video.
///
/// Frame times are measured from the first timestamp in the video's own
/// telemetry. Frames outside the telemetry's time span, or before the
/// track's first valid sample, are skipped.
///
/// # Errors
///
/// - [`OverlayError::InvalidConfig`] when the video's duration or frame
///   rate cannot form a schedule
/// - [`OverlayError::NoUsableSamples`] when the segment has no timestamps
pub fn plan_video(
    track: &Track,
    context: &TrackContext,
    segment: &TrackSegment,
    config: &OverlayConfig,
) -> Result<Vec<FrameSample>> {
    let samples = track
        .series
        .samples()
        .get(segment.range.clone())
        .ok_or(OverlayError::EmptySeries)?;
    let base = samples
        .iter()
        .find_map(|s| s.timestamp)
        .ok_or(OverlayError::NoUsableSamples)?;

    let schedule = RenderSchedule::for_video(&segment.video, config)?;
    let candidates = schedule.frames().len();
    info!(
        "[Render {}] {} native frames @ {} fps, {} candidates (stride {}), base {}",
        segment.source,
        schedule.total_frames(),
        schedule.native_fps(),
        candidates,
        schedule.stride(),
        base.to_rfc3339()
    );

    let sampler = FrameSampler::from_samples(samples);
    let progress_step = (candidates / 10).max(1);
    let mut plan = Vec::with_capacity(candidates);

    for (frame, hit) in schedule.resolve(base, &sampler) {
        let Some(timestamp) = hit.sample.timestamp else {
            continue;
        };
        let track_index = segment.range.start + hit.index;

        let ordinal = frame.index / schedule.stride();
        if ordinal % progress_step == 0 {
            info!(
                "[Render {}] [{}%] target {}",
                segment.source,
                ordinal * 100 / candidates.max(1),
                frame.timestamp(base).to_rfc3339()
            );
        }

        match context.reading(track_index) {
            Some(reading) => plan.push(FrameSample {
                frame,
                track_index,
                timestamp,
                reading,
            }),
            None => debug!(
                "[Render {}] Frame {} precedes the first valid sample, skipping",
                segment.source, frame.index
            ),
        }
    }

    info!(
        "[Render {}] Collected {} of {} target frames",
        segment.source,
        plan.len(),
        candidates
    );

    Ok(plan)
}

/// Compose every planned frame in order.
pub fn render_video(plan: &[FrameSample], composer: &OverlayComposer<'_>) -> Vec<RenderedFrame> {
    let progress_step = (plan.len() / 10).max(1);

    plan.iter()
        .enumerate()
        .map(|(ordinal, sample)| {
            if ordinal % progress_step == 0 {
                debug!("[Render] Frame render [{}%]", ordinal * 100 / plan.len());
            }
            RenderedFrame::new(ordinal, composer.compose(sample))
        })
        .collect()
}

/// Compose every planned frame on the rayon pool. Output order and file
/// names match [`render_video`].
#[cfg(feature = "parallel")]
pub fn render_video_parallel(plan: &[FrameSample], composer: &OverlayComposer<'_>) -> Vec<RenderedFrame> {
    plan.par_iter()
        .enumerate()
        .map(|(ordinal, sample)| RenderedFrame::new(ordinal, composer.compose(sample)))
        .collect()
}

/// Plan and compose the overlays of every video in a track.
///
/// A video that cannot be planned is logged and left out.
///
/// # Errors
///
/// [`OverlayError::InvalidConfig`] when `config` fails validation.
pub fn render_track(
    build: &TrackBuild,
    config: &OverlayConfig,
    resolver: &dyn TimezoneResolver,
) -> Result<Vec<VideoOverlays>> {
    config.validate()?;

    let track = &build.track;
    let context = TrackContext::new(track);
    let mut overlays = Vec::with_capacity(track.segments.len());

    for segment in &track.segments {
        let start = Instant::now();

        let plan = match plan_video(track, &context, segment, config) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("[Render {}] Skipping video: {}", segment.source, e);
                continue;
            }
        };

        let composer = OverlayComposer::new(config, &context, (segment.video.width, segment.video.height), resolver);

        #[cfg(feature = "parallel")]
        let frames = render_video_parallel(&plan, &composer);
        #[cfg(not(feature = "parallel"))]
        let frames = render_video(&plan, &composer);

        info!(
            "[Render {}] Composed {} overlay frames in {}ms",
            segment.source,
            frames.len(),
            start.elapsed().as_millis()
        );

        overlays.push(VideoOverlays {
            source: segment.source.clone(),
            frames,
        });
    }

    Ok(overlays)
}

/// Extract telemetry from every source concurrently and assemble the track.
///
/// Extraction runs on tokio's blocking pool with at most `max_in_flight`
/// files in progress. Segments keep the order of `sources` regardless of
/// which extraction finishes first.
#[cfg(feature = "async")]
pub async fn build_track_concurrent<E>(sources: Vec<String>, extractor: Arc<E>, max_in_flight: usize) -> TrackBuild
where
    E: TelemetryExtractor + Send + Sync + 'static,
{
    use futures::stream::{self, StreamExt};

    info!(
        "[Track] Extracting telemetry from {} files (max in flight: {})",
        sources.len(),
        max_in_flight
    );

    let results: Vec<(String, Result<ExtractedVideo>)> = stream::iter(sources)
        .map(|source| {
            let extractor = Arc::clone(&extractor);
            async move {
                let name = source.clone();
                let result = tokio::task::spawn_blocking(move || extractor.extract(&source))
                    .await
                    .unwrap_or_else(|e| Err(OverlayError::extraction(name.as_str(), e.to_string())));
                (name, result)
            }
        })
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    collect_track(results)
}
