//! Which native video frames get an overlay.
//!
//! Overlays are rendered at a lower rate than the video. Every `stride`-th
//! native frame is a candidate; its target time is the video's telemetry
//! base time plus the frame's offset.

use chrono::{DateTime, TimeDelta, Utc};

use crate::sampler::{FrameSampler, Nearest};
use crate::telemetry::VideoMetadata;
use crate::{OverlayConfig, OverlayError, Result};

/// A native frame index selected for overlay rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFrame {
    /// Index in `[0, total_frames)`
    pub index: usize,
    /// Time since the start of the video
    pub offset: TimeDelta,
}

impl RenderFrame {
    /// Absolute target time of this frame.
    pub fn timestamp(&self, base: DateTime<Utc>) -> DateTime<Utc> {
        base + self.offset
    }
}

fn frame_offset(index: usize, native_fps: f64) -> TimeDelta {
    TimeDelta::microseconds((index as f64 / native_fps * 1e6).round() as i64)
}

/// Frame selection for one video.
///
/// # Example
/// ```
/// use track_overlay::RenderSchedule;
///
/// // Ten minutes at 60 fps with a 2 fps overlay
/// let schedule = RenderSchedule::new(600.0, 60.0, 2.0).unwrap();
/// assert_eq!(schedule.stride(), 30);
/// assert_eq!(schedule.frames().count(), 1200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSchedule {
    total_frames: usize,
    stride: usize,
    native_fps: f64,
    overlay_fps: f64,
}

impl RenderSchedule {
    /// # Errors
    ///
    /// [`OverlayError::InvalidConfig`] when the duration or either rate is
    /// not a positive finite number.
    pub fn new(duration_secs: f64, native_fps: f64, overlay_fps: f64) -> Result<Self> {
        for (name, value) in [
            ("duration", duration_secs),
            ("native frame rate", native_fps),
            ("overlay frame rate", overlay_fps),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(OverlayError::invalid_config(format!("{} must be positive, got {}", name, value)));
            }
        }

        let total_frames = (duration_secs * native_fps).trunc() as usize;
        let stride = ((native_fps / overlay_fps).round() as usize).max(1);

        Ok(Self {
            total_frames,
            stride,
            native_fps,
            overlay_fps,
        })
    }

    /// Schedule for a probed video. The video's own frame rate wins; the
    /// configured native rate is used when the probe reported none.
    pub fn for_video(video: &VideoMetadata, config: &OverlayConfig) -> Result<Self> {
        let native_fps = if video.frame_rate.is_finite() && video.frame_rate > 0.0 {
            video.frame_rate
        } else {
            config.native_frame_rate
        };
        Self::new(video.duration_secs, native_fps, config.overlay_frame_rate)
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn native_fps(&self) -> f64 {
        self.native_fps
    }

    pub fn overlay_fps(&self) -> f64 {
        self.overlay_fps
    }

    /// Candidate frames `0, stride, 2·stride, …` below `total_frames`.
    pub fn frames(&self) -> ScheduledFrames {
        ScheduledFrames {
            next: 0,
            total: self.total_frames,
            stride: self.stride,
            native_fps: self.native_fps,
        }
    }

    /// Pair every candidate frame with its nearest sample.
    ///
    /// Frames whose target time falls outside the sampler's time span,
    /// widened by half an overlay interval on each side, are skipped; so is
    /// everything when the sampler has no timestamped samples.
    pub fn resolve<'a>(
        &self,
        base: DateTime<Utc>,
        sampler: &'a FrameSampler<'a>,
    ) -> impl Iterator<Item = (RenderFrame, Nearest<'a>)> + 'a {
        let half = TimeDelta::microseconds((0.5 / self.overlay_fps * 1e6).round() as i64);
        let window = sampler.span().map(|(lo, hi)| (lo - half, hi + half));

        self.frames().filter_map(move |frame| {
            let (lo, hi) = window?;
            let target = frame.timestamp(base);
            if target < lo || target > hi {
                return None;
            }
            sampler.nearest(target).ok().map(|hit| (frame, hit))
        })
    }
}

/// Lazy iterator over scheduled frames; [`RenderSchedule::frames`] starts
/// a fresh one each call.
#[derive(Debug, Clone)]
pub struct ScheduledFrames {
    next: usize,
    total: usize,
    stride: usize,
    native_fps: f64,
}

impl Iterator for ScheduledFrames {
    type Item = RenderFrame;

    fn next(&mut self) -> Option<RenderFrame> {
        if self.next >= self.total {
            return None;
        }
        let index = self.next;
        self.next = self.next.saturating_add(self.stride);
        Some(RenderFrame {
            index,
            offset: frame_offset(index, self.native_fps),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.next >= self.total {
            0
        } else {
            (self.total - self.next).div_ceil(self.stride)
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ScheduledFrames {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sample;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_ten_minutes_at_sixty() {
        let schedule = RenderSchedule::new(600.0, 60.0, 2.0).unwrap();
        assert_eq!(schedule.total_frames(), 36_000);
        assert_eq!(schedule.stride(), 30);

        let frames: Vec<RenderFrame> = schedule.frames().collect();
        assert_eq!(frames.len(), 1200);
        assert_eq!(schedule.frames().len(), 1200);
        assert_eq!(frames[0].index, 0);
        assert_eq!(frames[1].index, 30);
        assert_eq!(frames[1199].index, 35_970);
        assert_eq!(frames[1].offset, TimeDelta::milliseconds(500));
    }

    #[test]
    fn test_total_frames_truncates() {
        let schedule = RenderSchedule::new(1.99, 60.0, 2.0).unwrap();
        assert_eq!(schedule.total_frames(), 119);
        assert_eq!(schedule.frames().map(|f| f.index).collect::<Vec<_>>(), vec![0, 30, 60, 90]);
    }

    #[test]
    fn test_stride_rounds_and_never_zero() {
        assert_eq!(RenderSchedule::new(10.0, 29.97, 2.0).unwrap().stride(), 15);
        // Overlay faster than the video still advances one frame at a time
        assert_eq!(RenderSchedule::new(10.0, 24.0, 100.0).unwrap().stride(), 1);
    }

    #[test]
    fn test_frames_restartable() {
        let schedule = RenderSchedule::new(5.0, 60.0, 2.0).unwrap();
        let first: Vec<_> = schedule.frames().collect();
        let second: Vec<_> = schedule.frames().collect();
        assert_eq!(first, second);

        let mut iter = schedule.frames();
        iter.next();
        let fork = iter.clone();
        assert_eq!(iter.count(), fork.count());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(RenderSchedule::new(0.0, 60.0, 2.0), Err(OverlayError::InvalidConfig(_))));
        assert!(matches!(RenderSchedule::new(10.0, 0.0, 2.0), Err(OverlayError::InvalidConfig(_))));
        assert!(matches!(RenderSchedule::new(10.0, 60.0, -1.0), Err(OverlayError::InvalidConfig(_))));
        assert!(matches!(RenderSchedule::new(f64::NAN, 60.0, 2.0), Err(OverlayError::InvalidConfig(_))));
    }

    #[test]
    fn test_for_video_falls_back_to_config_rate() {
        let config = OverlayConfig::default();
        let mut video = VideoMetadata {
            duration_secs: 10.0,
            frame_rate: 0.0,
            width: 1920,
            height: 1080,
            creation_time: None,
            size_bytes: 0,
        };
        assert_eq!(RenderSchedule::for_video(&video, &config).unwrap().stride(), 30);

        video.frame_rate = 30.0;
        let schedule = RenderSchedule::for_video(&video, &config).unwrap();
        assert_eq!(schedule.stride(), 15);
        assert_eq!(schedule.total_frames(), 300);
    }

    #[test]
    fn test_resolve_skips_frames_past_telemetry() {
        // Telemetry covers the first 2 s of a 5 s video
        let samples: Vec<Sample> = (0..=20)
            .map(|i| Sample::invalid(base() + TimeDelta::milliseconds(i * 100)))
            .collect();
        let sampler = FrameSampler::from_samples(&samples);
        let schedule = RenderSchedule::new(5.0, 60.0, 2.0).unwrap();

        let resolved: Vec<_> = schedule.resolve(base(), &sampler).collect();
        // Window ends at 2.25 s, so the 2.5 s frame is dropped
        let indices: Vec<usize> = resolved.iter().map(|(f, _)| f.index).collect();
        assert_eq!(indices, vec![0, 30, 60, 90, 120]);
        assert_eq!(resolved[1].1.index, 5);
    }

    #[test]
    fn test_resolve_without_timestamps() {
        let samples = vec![Sample::new(None, None)];
        let sampler = FrameSampler::from_samples(&samples);
        let schedule = RenderSchedule::new(5.0, 60.0, 2.0).unwrap();
        assert_eq!(schedule.resolve(base(), &sampler).count(), 0);
    }
}
