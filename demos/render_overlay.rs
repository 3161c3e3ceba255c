//! Render overlays for a synthetic two-file recording session.
//!
//! Run with: cargo run --example render_overlay

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use track_overlay::{
    build_track, render_track, ExtractedVideo, FixedZone, OverlayConfig, OverlayError, PixelPoint,
    PixelRect, Rasterizer, Reading, Rgba, Sample, SampleSeries, TelemetryExtractor, VideoMetadata,
};

/// Pretends every file is a 30 s clip with 18 Hz GPS along a loop,
/// with a short dropout in the middle.
struct LoopExtractor {
    start: DateTime<Utc>,
}

impl TelemetryExtractor for LoopExtractor {
    fn extract(&self, source: &str) -> Result<ExtractedVideo, OverlayError> {
        let part: i64 = match source {
            "GH010042.MP4" => 0,
            "GH020042.MP4" => 1,
            _ => return Err(OverlayError::no_telemetry(source)),
        };

        let clip_start = self.start + TimeDelta::seconds(30 * part);
        let samples: SampleSeries = (0..30 * 18)
            .map(|i| {
                let ts = clip_start + TimeDelta::microseconds(i * 1_000_000 / 18);
                if (200..220).contains(&i) {
                    return Sample::invalid(ts);
                }
                let angle = (part * 540 + i) as f64 / 1080.0 * std::f64::consts::TAU;
                let reading = Reading::new(
                    46.5197 + 0.004 * angle.sin(),
                    6.6323 + 0.006 * angle.cos(),
                    372.0,
                    8.5,
                    angle.to_degrees() % 360.0,
                );
                Sample::valid(ts, reading)
            })
            .collect();

        Ok(ExtractedVideo {
            source: source.to_string(),
            series: samples,
            video: VideoMetadata {
                duration_secs: 30.0,
                frame_rate: 59.94,
                width: 1920,
                height: 1080,
                creation_time: Some(clip_start),
                size_bytes: 120 * 1024 * 1024,
            },
        })
    }
}

/// Counts what a real canvas backend would paint.
#[derive(Default)]
struct CountingRasterizer {
    rects: usize,
    points: usize,
    texts: Vec<String>,
}

impl Rasterizer for CountingRasterizer {
    type Error = std::convert::Infallible;

    fn fill_rounded_rect(&mut self, _: &PixelRect, _: f64, _: Rgba) -> Result<(), Self::Error> {
        self.rects += 1;
        Ok(())
    }

    fn fill_rect(&mut self, _: &PixelRect, _: Rgba) -> Result<(), Self::Error> {
        self.rects += 1;
        Ok(())
    }

    fn fill_points(&mut self, points: &[PixelPoint], _: f64, _: Rgba) -> Result<(), Self::Error> {
        self.points += points.len();
        Ok(())
    }

    fn draw_text(&mut self, text: &str, _: PixelPoint, _: f64, _: Rgba, _: Rgba) -> Result<(), Self::Error> {
        self.texts.push(text.to_string());
        Ok(())
    }
}

fn main() {
    let start = Utc.with_ymd_and_hms(2024, 7, 14, 8, 30, 0).unwrap();
    let extractor = LoopExtractor { start };
    let sources = ["GH010042.MP4", "GH020042.MP4", "README.txt"];

    let build = build_track(&sources, &extractor);
    println!("Track Overlay Example\n");
    println!(
        "Track: {} samples in {} segments, {} skipped",
        build.track.series.len(),
        build.track.segments.len(),
        build.skipped.len()
    );
    if let Some(name) = build.track.output_file_name() {
        println!("Session output: {}\n", name);
    }

    let config = OverlayConfig::default();
    let zone = FixedZone(chrono_tz::Europe::Zurich);
    let overlays = match render_track(&build, &config, &zone) {
        Ok(overlays) => overlays,
        Err(e) => {
            eprintln!("Render failed: {}", e);
            return;
        }
    };

    for video in &overlays {
        println!("{}: {} overlay frames", video.source, video.frames.len());
        let Some(last) = video.frames.last() else {
            continue;
        };

        let mut canvas = CountingRasterizer::default();
        if let Err(e) = last.layer.render_to(&mut canvas) {
            match e {}
        }
        println!("   Last frame: {}", last.file_name);
        println!("   Texts: {}", canvas.texts.join(" | "));
        println!("   Rects: {}, track points: {}\n", canvas.rects, canvas.points);
    }
}
