//! # Gap Filling
//!
//! Substitutes invalid samples with the most recent valid reading during a
//! forward scan.
//!
//! The carry-forward cell is a plain value owned by the caller. Every
//! independent pass (bounding region, minimap path, distance) builds its own
//! [`GapFillState`], so no pass can observe another pass's last reading.
//! There is no look-ahead and no interpolation: the most recent valid
//! reading wins.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use track_overlay::{GapFillState, OverlayError, Reading, Sample};
//!
//! let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
//! let good = Reading::new(52.0, 13.0, 30.0, 1.0, 0.0);
//!
//! let mut state = GapFillState::new();
//! assert_eq!(state.fill(&Sample::invalid(t)), Err(OverlayError::NoValidSampleYet));
//! assert_eq!(state.fill(&Sample::valid(t, good)), Ok(good));
//! assert_eq!(state.fill(&Sample::invalid(t)), Ok(good));
//! ```

use std::iter::Enumerate;
use std::slice;

use chrono::{DateTime, Utc};

use crate::{OverlayError, Reading, Result, Sample};

/// The "last known good reading" cell of one forward scan.
#[derive(Debug, Clone, Default)]
pub struct GapFillState {
    last_good: Option<Reading>,
}

impl GapFillState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valid samples update the cell and are returned; invalid samples get
    /// the cell's content, or `NoValidSampleYet` while it is still empty.
    pub fn fill(&mut self, sample: &Sample) -> Result<Reading> {
        match sample.reading {
            Some(reading) => {
                self.last_good = Some(reading);
                Ok(reading)
            }
            None => self.last_good.ok_or(OverlayError::NoValidSampleYet),
        }
    }

    pub fn last_good(&self) -> Option<&Reading> {
        self.last_good.as_ref()
    }
}

/// A sample after gap filling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilledSample {
    /// Position in the scanned series
    pub index: usize,
    /// Raw timestamp of the scanned sample (never substituted)
    pub timestamp: Option<DateTime<Utc>>,
    pub reading: Reading,
    /// True when `reading` was carried forward from an earlier sample
    pub carried: bool,
}

/// Forward gap-filled scan over a slice of samples.
///
/// Yields one item per input sample. Leading invalid samples yield
/// `Err(NoValidSampleYet)`; use [`GapFill::established`] to skip them.
#[derive(Debug, Clone)]
pub struct GapFill<'a> {
    samples: Enumerate<slice::Iter<'a, Sample>>,
    state: GapFillState,
}

impl<'a> GapFill<'a> {
    pub fn new(samples: &'a [Sample]) -> Self {
        Self {
            samples: samples.iter().enumerate(),
            state: GapFillState::new(),
        }
    }

    /// Only the samples for which a reading exists.
    pub fn established(self) -> impl Iterator<Item = FilledSample> + 'a {
        self.filter_map(|item| item.ok())
    }
}

impl Iterator for GapFill<'_> {
    type Item = Result<FilledSample>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, sample) = self.samples.next()?;
        Some(self.state.fill(sample).map(|reading| FilledSample {
            index,
            timestamp: sample.timestamp,
            reading,
            carried: !sample.is_valid(),
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.samples.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SampleSeries;
    use chrono::{TimeDelta, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn at(lat: f64, lon: f64) -> Reading {
        Reading::new(lat, lon, 100.0, 2.0, 180.0)
    }

    #[test]
    fn test_leading_invalid_samples_fail() {
        let series = SampleSeries::new(vec![
            Sample::invalid(t(0)),
            Sample::invalid(t(1)),
            Sample::valid(t(2), at(1.0, 1.0)),
        ]);
        let items: Vec<_> = series.gap_fill().collect();
        assert_eq!(items[0], Err(OverlayError::NoValidSampleYet));
        assert_eq!(items[1], Err(OverlayError::NoValidSampleYet));
        assert!(items[2].is_ok());
    }

    #[test]
    fn test_invalid_yields_most_recent_valid() {
        let series = SampleSeries::new(vec![
            Sample::valid(t(0), at(1.0, 1.0)),
            Sample::invalid(t(1)),
            Sample::valid(t(2), at(2.0, 2.0)),
            Sample::invalid(t(3)),
            Sample::invalid(t(4)),
        ]);
        let filled: Vec<FilledSample> = series.gap_fill().established().collect();
        assert_eq!(filled.len(), 5);
        assert_eq!(filled[1].reading, at(1.0, 1.0));
        assert!(filled[1].carried);
        assert_eq!(filled[3].reading, at(2.0, 2.0));
        assert_eq!(filled[4].reading, at(2.0, 2.0));
        assert!(!filled[2].carried);
        // Timestamps are the scanned sample's own, not the donor's
        assert_eq!(filled[4].timestamp, Some(t(4)));
    }

    #[test]
    fn test_established_skips_leading() {
        let series = SampleSeries::new(vec![
            Sample::invalid(t(0)),
            Sample::valid(t(1), at(3.0, 4.0)),
            Sample::invalid(t(2)),
        ]);
        let indices: Vec<usize> = series.gap_fill().established().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_scans_do_not_share_state() {
        let first = SampleSeries::new(vec![Sample::valid(t(0), at(9.0, 9.0))]);
        let second = SampleSeries::new(vec![Sample::invalid(t(0))]);

        // Exhaust a scan of the first series, then scan the second
        assert_eq!(first.gap_fill().established().count(), 1);
        let items: Vec<_> = second.gap_fill().collect();
        assert_eq!(items, vec![Err(OverlayError::NoValidSampleYet)]);
    }

    #[test]
    fn test_state_last_good() {
        let mut state = GapFillState::new();
        assert!(state.last_good().is_none());
        state.fill(&Sample::valid(t(0), at(0.0, 0.0))).unwrap();
        assert_eq!(state.last_good(), Some(&at(0.0, 0.0)));
    }
}
