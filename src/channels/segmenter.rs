//! Slicing a series into channel segments at confirmed direction reversals.

use std::ops::Range;

use tracing::{debug, trace};

use super::direction::DirectionMachine;
use super::fitter::{ChannelConfig, ChannelFitter, FittedChannel};
use super::regression::TrendLine;
use crate::{AnalysisError, Period, Result, OHLCV};

/// A contiguous bar span `[start_index, end_index)` with its fitted channel.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelSegment {
    start_index: usize,
    end_index: usize,
    channel: FittedChannel,
}

impl ChannelSegment {
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Exclusive.
    pub fn end_index(&self) -> usize {
        self.end_index
    }

    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bars of `series` this segment covers.
    pub fn bars<'a, T>(&self, series: &'a [T]) -> &'a [T] {
        let end = self.end_index.min(series.len());
        &series[self.start_index.min(end)..end]
    }

    pub fn channel(&self) -> &FittedChannel {
        &self.channel
    }

    pub fn line(&self) -> &TrendLine {
        self.channel.line()
    }

    pub fn radius(&self) -> f64 {
        self.channel.radius()
    }

    pub fn main_price1(&self) -> f64 {
        self.channel.main_price1()
    }

    pub fn main_price2(&self) -> f64 {
        self.channel.main_price2()
    }

    pub fn upper_price1(&self) -> f64 {
        self.channel.upper_price1()
    }

    pub fn upper_price2(&self) -> f64 {
        self.channel.upper_price2()
    }

    pub fn lower_price1(&self) -> f64 {
        self.channel.lower_price1()
    }

    pub fn lower_price2(&self) -> f64 {
        self.channel.lower_price2()
    }
}

/// Walks the direction machine over a series and cuts a segment each time the
/// direction sign crosses zero, unless the reversal comes within
/// `confirmations` bars of the previous cut (treated as noise).
///
/// Every emitted segment is longer than `confirmations`, which keeps at least
/// two samples under each regression.
#[derive(Debug, Clone)]
pub struct ChannelSegmenter {
    confirmations: Period,
    config: ChannelConfig,
    trailing: bool,
}

impl ChannelSegmenter {
    pub fn new(confirmations: usize, config: ChannelConfig) -> Result<Self> {
        let confirmations = Period::new(confirmations)
            .map_err(|_| AnalysisError::InvalidArgument("confirmations must be > 0"))?;
        Ok(Self::with_period(confirmations, config))
    }

    pub fn with_period(confirmations: Period, config: ChannelConfig) -> Self {
        Self {
            confirmations,
            config,
            trailing: false,
        }
    }

    /// Also emit the open span after the last reversal when it is long enough.
    pub fn with_trailing_segment(mut self, enable: bool) -> Self {
        self.trailing = enable;
        self
    }

    pub fn confirmations(&self) -> Period {
        self.confirmations
    }

    /// Segment spans without fitting them.
    pub fn boundaries<T: OHLCV>(&self, bars: &[T]) -> Vec<Range<usize>> {
        let confirmations = self.confirmations.get();
        let mut machine = DirectionMachine::with_period(self.confirmations);
        let mut spans = Vec::new();
        let mut last_value = 0i64;
        let mut last_reversal = 0usize;

        for (i, bar) in bars.iter().enumerate() {
            let value = machine.step(bar);
            let reversed = (value > 0 && last_value <= 0) || (value < 0 && last_value >= 0);
            if reversed {
                if i - last_reversal > confirmations {
                    spans.push(last_reversal..i);
                    last_reversal = i;
                } else {
                    trace!(index = i, last_reversal, "reversal ignored as noise");
                }
            }
            last_value = value;
        }

        if self.trailing && bars.len() - last_reversal > confirmations {
            spans.push(last_reversal..bars.len());
        }
        spans
    }

    /// Cut and fit every segment of `bars`.
    pub fn segment<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<ChannelSegment>> {
        self.boundaries(bars)
            .into_iter()
            .map(|span| {
                let channel = ChannelFitter::fit(&bars[span.clone()], self.config)?.finish()?;
                debug!(
                    start = span.start,
                    end = span.end,
                    radius = channel.radius(),
                    "channel segment fitted"
                );
                Ok(ChannelSegment {
                    start_index: span.start,
                    end_index: span.end,
                    channel,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::bar::Bar;

    fn closes(values: &[i64]) -> Vec<Bar> {
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let c = Decimal::from(c);
                Bar::new(i as i64 * 60_000, c, c + Decimal::ONE, c - Decimal::ONE, c, Decimal::ONE)
            })
            .collect()
    }

    #[test]
    fn test_rise_then_fall_cuts_at_first_down_bar() {
        let bars = closes(&[100, 101, 102, 103, 104, 103, 102, 101, 100, 99]);
        let segmenter = ChannelSegmenter::new(2, ChannelConfig::default()).unwrap();
        assert_eq!(segmenter.boundaries(&bars), vec![0..6]);

        let segments = segmenter.segment(&bars).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].range(), 0..6);
        assert_eq!(segments[0].bars(&bars).len(), 6);
    }

    #[test]
    fn test_trailing_segment_is_opt_in() {
        let bars = closes(&[100, 101, 102, 103, 104, 103, 102, 101, 100, 99]);
        let segmenter = ChannelSegmenter::new(2, ChannelConfig::default())
            .unwrap()
            .with_trailing_segment(true);
        assert_eq!(segmenter.boundaries(&bars), vec![0..6, 6..10]);
    }

    #[test]
    fn test_quick_reversal_is_noise() {
        // up at 1, down at 3: 3 - 0 > 2 so cut; up again at 4: 4 - 3 <= 2 so ignored
        let bars = closes(&[10, 11, 12, 5, 20, 21, 22, 23]);
        let segmenter = ChannelSegmenter::new(2, ChannelConfig::default()).unwrap();
        let spans = segmenter.boundaries(&bars);
        assert_eq!(spans, vec![0..3]);
    }

    #[test]
    fn test_segments_longer_than_confirmations() {
        let bars = closes(&[1, 5, 2, 6, 1, 7, 0, 8, 3, 9, 2, 10, 1, 11, 0, 12]);
        for confirmations in 1..5 {
            let segmenter = ChannelSegmenter::new(confirmations, ChannelConfig::default())
                .unwrap()
                .with_trailing_segment(true);
            for segment in segmenter.segment(&bars).unwrap() {
                assert!(segment.len() > confirmations);
            }
        }
    }

    #[test]
    fn test_empty_series_has_no_segments() {
        let bars: Vec<Bar> = Vec::new();
        let segmenter = ChannelSegmenter::new(3, ChannelConfig::default())
            .unwrap()
            .with_trailing_segment(true);
        assert!(segmenter.segment(&bars).unwrap().is_empty());
    }

    #[test]
    fn test_zero_confirmations_rejected() {
        assert!(ChannelSegmenter::new(0, ChannelConfig::default())
            .unwrap_err()
            .is_invalid_argument());
    }
}
