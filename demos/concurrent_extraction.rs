//! Extract telemetry from several files concurrently.
//!
//! Run with: cargo run --example concurrent_extraction --features async

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{TimeDelta, TimeZone, Utc};
use track_overlay::{
    build_track_concurrent, ExtractedVideo, OverlayError, Reading, Sample, TelemetryExtractor,
    VideoMetadata,
};

/// Simulates a slow container parser: 200 ms per file.
struct SlowExtractor;

impl TelemetryExtractor for SlowExtractor {
    fn extract(&self, source: &str) -> Result<ExtractedVideo, OverlayError> {
        std::thread::sleep(Duration::from_millis(200));

        let part: i64 = source[2..4]
            .parse()
            .map_err(|_| OverlayError::extraction(source, "unexpected file name"))?;
        let clip_start = Utc.with_ymd_and_hms(2024, 6, 2, 14, 0, 0).unwrap() + TimeDelta::minutes(part - 1);

        let series = (0..60 * 10)
            .map(|i| {
                let reading = Reading::new(59.3293 + part as f64 * 0.001 + i as f64 * 1e-6, 18.0686, 20.0, 3.0, 0.0);
                Sample::valid(clip_start + TimeDelta::milliseconds(i * 100), reading)
            })
            .collect();

        Ok(ExtractedVideo {
            source: source.to_string(),
            series,
            video: VideoMetadata {
                duration_secs: 60.0,
                frame_rate: 30.0,
                width: 2704,
                height: 1520,
                creation_time: Some(clip_start),
                size_bytes: 0,
            },
        })
    }
}

#[tokio::main]
async fn main() {
    let sources: Vec<String> = (1..=8).map(|i| format!("GH{:02}0001.MP4", i)).collect();

    let start = Instant::now();
    let build = build_track_concurrent(sources, Arc::new(SlowExtractor), 4).await;

    println!("Extracted {} files in {:.2}s", build.track.segments.len(), start.elapsed().as_secs_f64());
    for segment in &build.track.segments {
        println!("   {} -> samples {:?}", segment.source, segment.range);
    }
    for (source, err) in &build.skipped {
        println!("   skipped {}: {}", source, err);
    }
}
