//! Nearest-timestamp sample selection.
//!
//! Samples without a timestamp are never candidates: gap filling can
//! substitute position, but not the time a sample was taken.

use chrono::{DateTime, TimeDelta, Utc};

use crate::{OverlayError, Result, Sample, SampleSeries};

/// The sample chosen for a target time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest<'a> {
    /// Position in the searched slice
    pub index: usize,
    pub sample: &'a Sample,
}

fn gap(a: DateTime<Utc>, b: DateTime<Utc>) -> TimeDelta {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// Find the sample whose timestamp is closest to `target`.
///
/// Scans every sample; on equal distance the first one encountered wins.
///
/// # Errors
///
/// [`OverlayError::NoUsableSamples`] when no sample has a timestamp.
///
/// # Example
/// ```
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use track_overlay::{nearest, Sample};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
/// let samples = vec![Sample::invalid(t0), Sample::invalid(t0 + TimeDelta::seconds(10))];
///
/// // Exactly halfway: the earlier sample wins
/// assert_eq!(nearest(t0 + TimeDelta::seconds(5), &samples).unwrap().index, 0);
/// assert_eq!(nearest(t0 + TimeDelta::seconds(6), &samples).unwrap().index, 1);
/// ```
pub fn nearest(target: DateTime<Utc>, samples: &[Sample]) -> Result<Nearest<'_>> {
    let mut best: Option<(usize, TimeDelta)> = None;

    for (index, sample) in samples.iter().enumerate() {
        let Some(ts) = sample.timestamp else {
            continue;
        };
        let d = gap(ts, target);
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((index, d));
        }
    }

    best.map(|(index, _)| Nearest { index, sample: &samples[index] })
        .ok_or(OverlayError::NoUsableSamples)
}

/// Pre-indexed nearest-timestamp lookup over one series.
///
/// When the timestamps are non-decreasing (the normal case for a single
/// file) lookups use binary search; otherwise they fall back to the full
/// scan of [`nearest`]. Both give the same answer, tie-breaks included.
#[derive(Debug, Clone)]
pub struct FrameSampler<'a> {
    samples: &'a [Sample],
    /// (timestamp, index) of every timestamped sample, in series order
    timed: Vec<(DateTime<Utc>, usize)>,
    sorted: bool,
}

impl<'a> FrameSampler<'a> {
    pub fn new(series: &'a SampleSeries) -> Self {
        Self::from_samples(series.samples())
    }

    pub fn from_samples(samples: &'a [Sample]) -> Self {
        let timed: Vec<(DateTime<Utc>, usize)> = samples
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.timestamp.map(|t| (t, i)))
            .collect();
        let sorted = timed.windows(2).all(|w| w[0].0 <= w[1].0);
        Self { samples, timed, sorted }
    }

    /// Number of samples with a timestamp.
    pub fn usable(&self) -> usize {
        self.timed.len()
    }

    /// Earliest and latest timestamp covered.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if self.sorted {
            Some((self.timed.first()?.0, self.timed.last()?.0))
        } else {
            let lo = self.timed.iter().map(|(t, _)| *t).min()?;
            let hi = self.timed.iter().map(|(t, _)| *t).max()?;
            Some((lo, hi))
        }
    }

    /// # Errors
    ///
    /// [`OverlayError::NoUsableSamples`] when no sample has a timestamp.
    pub fn nearest(&self, target: DateTime<Utc>) -> Result<Nearest<'a>> {
        if !self.sorted {
            return nearest(target, self.samples);
        }
        if self.timed.is_empty() {
            return Err(OverlayError::NoUsableSamples);
        }

        // First entry at or after the target
        let after = self.timed.partition_point(|(t, _)| *t < target);

        // Leftmost entry of the run just before the target
        let before = after.checked_sub(1).map(|last| {
            let t = self.timed[last].0;
            self.timed.partition_point(|(u, _)| *u < t)
        });

        let pick = match (before, self.timed.get(after)) {
            (Some(b), Some(&(t_after, _))) => {
                if gap(self.timed[b].0, target) <= gap(t_after, target) {
                    b
                } else {
                    after
                }
            }
            (Some(b), None) => b,
            (None, _) => after,
        };

        let index = self.timed[pick].1;
        Ok(Nearest { index, sample: &self.samples[index] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reading;
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + TimeDelta::milliseconds(ms)
    }

    fn at(lat: f64, lon: f64) -> Reading {
        Reading::new(lat, lon, 0.0, 0.0, 0.0)
    }

    #[test]
    fn test_scenario_invalid_entry_is_nearest() {
        let series = SampleSeries::new(vec![
            Sample::valid(t(0), at(52.0, 13.0)),
            Sample::invalid(t(10_000)),
            Sample::valid(t(20_000), at(52.1, 13.1)),
        ]);
        let hit = nearest(t(9_000), series.samples()).unwrap();
        assert_eq!(hit.index, 1);
        assert!(!hit.sample.is_valid());
        // Content comes from the carried-forward reading
        assert_eq!(series.filled_readings()[hit.index], Some(at(52.0, 13.0)));
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(nearest(t(0), &[]), Err(OverlayError::NoUsableSamples));
        let series = SampleSeries::default();
        assert_eq!(FrameSampler::new(&series).nearest(t(0)), Err(OverlayError::NoUsableSamples));
    }

    #[test]
    fn test_untimed_samples_skipped() {
        let samples = vec![
            Sample::new(None, Some(at(1.0, 1.0))),
            Sample::invalid(t(500)),
            Sample::new(None, Some(at(2.0, 2.0))),
        ];
        assert_eq!(nearest(t(0), &samples).unwrap().index, 1);

        let only_untimed = vec![Sample::new(None, Some(at(1.0, 1.0)))];
        assert_eq!(nearest(t(0), &only_untimed), Err(OverlayError::NoUsableSamples));
    }

    #[test]
    fn test_within_half_spacing() {
        // 18 Hz-ish spacing
        let spacing = 55;
        let samples: Vec<Sample> = (0..100).map(|i| Sample::invalid(t(i * spacing))).collect();
        for target_ms in (0..100 * spacing).step_by(7) {
            let hit = nearest(t(target_ms), &samples).unwrap();
            let ts = hit.sample.timestamp.unwrap();
            assert!(gap(ts, t(target_ms)) <= TimeDelta::milliseconds(spacing / 2 + 1));
        }
    }

    #[test]
    fn test_sampler_matches_scan() {
        // Duplicates, gaps and untimed entries
        let samples = vec![
            Sample::invalid(t(0)),
            Sample::new(None, None),
            Sample::invalid(t(100)),
            Sample::invalid(t(100)),
            Sample::invalid(t(200)),
            Sample::new(None, Some(at(1.0, 1.0))),
            Sample::invalid(t(400)),
            Sample::invalid(t(400)),
            Sample::invalid(t(1000)),
        ];
        let sampler = FrameSampler::from_samples(&samples);
        for target_ms in -100..1200 {
            let scanned = nearest(t(target_ms), &samples).unwrap();
            let indexed = sampler.nearest(t(target_ms)).unwrap();
            assert_eq!(indexed.index, scanned.index, "target {}ms", target_ms);
        }
        assert_eq!(sampler.usable(), 7);
        assert_eq!(sampler.span(), Some((t(0), t(1000))));
    }

    #[test]
    fn test_sampler_unsorted_falls_back() {
        let samples = vec![Sample::invalid(t(300)), Sample::invalid(t(100)), Sample::invalid(t(200))];
        let sampler = FrameSampler::from_samples(&samples);
        assert_eq!(sampler.nearest(t(190)).unwrap().index, 2);
        assert_eq!(sampler.span(), Some((t(100), t(300))));
    }
}
