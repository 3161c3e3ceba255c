//! Compare sequential and rayon overlay composition on a long clip.
//!
//! Run with: cargo run --release --example parallel_frames --features parallel

use std::time::Instant;

use chrono::{TimeDelta, TimeZone, Utc};
use track_overlay::telemetry::TrackSegment;
use track_overlay::{
    plan_video, render_video, render_video_parallel, FixedZone, OverlayComposer, OverlayConfig,
    Reading, Sample, SampleSeries, Track, TrackContext, VideoMetadata,
};

fn main() {
    let start = Utc.with_ymd_and_hms(2024, 9, 1, 6, 0, 0).unwrap();
    let minutes = 20;

    // 18 Hz GPS on a slow spiral
    let series: SampleSeries = (0..minutes * 60 * 18)
        .map(|i| {
            let f = i as f64 / 18.0;
            let reading = Reading::new(
                45.8326 + 0.00002 * f * (f / 60.0).sin(),
                6.8652 + 0.00003 * f * (f / 60.0).cos(),
                1035.0 + f / 10.0,
                5.0,
                0.0,
            );
            Sample::valid(start + TimeDelta::microseconds(i * 1_000_000 / 18), reading)
        })
        .collect();

    let video = VideoMetadata {
        duration_secs: (minutes * 60) as f64,
        frame_rate: 60.0,
        width: 3840,
        height: 2160,
        creation_time: Some(start),
        size_bytes: 0,
    };
    let track = Track {
        segments: vec![TrackSegment {
            source: "GX010007.MP4".to_string(),
            range: 0..series.len(),
            video: video.clone(),
        }],
        series,
        start_time: Some(start),
    };

    let config = OverlayConfig {
        minimap_simplify_px: 0.5,
        ..OverlayConfig::default()
    };
    let context = TrackContext::new(&track);
    let plan = match plan_video(&track, &context, &track.segments[0], &config) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Planning failed: {}", e);
            return;
        }
    };

    let zone = FixedZone(chrono_tz::Europe::Paris);
    let composer = OverlayComposer::new(&config, &context, (video.width, video.height), &zone);

    println!("Composing {} overlay frames ({} samples)\n", plan.len(), track.series.len());

    let t = Instant::now();
    let sequential = render_video(&plan, &composer);
    let seq_ms = t.elapsed().as_secs_f64() * 1000.0;

    let t = Instant::now();
    let parallel = render_video_parallel(&plan, &composer);
    let par_ms = t.elapsed().as_secs_f64() * 1000.0;

    println!("Sequential: {:.1}ms", seq_ms);
    println!("Parallel:   {:.1}ms ({:.1}x)", par_ms, seq_ms / par_ms.max(1e-6));
    println!("Identical output: {}", sequential == parallel);
}
