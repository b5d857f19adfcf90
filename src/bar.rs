//! Concrete bar record and the validated, frozen bar series.

use std::ops::Deref;

use rust_decimal::Decimal;

use crate::{AnalysisError, OHLCVExt, Result, OHLCV};

/// One OHLCV candle with exact decimal prices.
///
/// Times are Unix epoch milliseconds. `last_traded_price` is the price the
/// scorer measures touch proximity against; for plain candles it equals the
/// close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub start_time: i64,
    pub end_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub last_traded_price: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// Bar whose start time equals its end time and whose last traded price is the close.
    pub fn new(
        end_time: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            start_time: end_time,
            end_time,
            open,
            high,
            low,
            close,
            last_traded_price: close,
            volume,
        }
    }

    pub fn with_start_time(mut self, start_time: i64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_last_traded_price(mut self, price: Decimal) -> Self {
        self.last_traded_price = price;
        self
    }

    /// Copy any `OHLCV` value into a `Bar`.
    pub fn from_ohlcv<T: OHLCV>(bar: &T) -> Self {
        Self {
            start_time: bar.start_time(),
            end_time: bar.end_time(),
            open: bar.open(),
            high: bar.high(),
            low: bar.low(),
            close: bar.close(),
            last_traded_price: bar.last_traded_price(),
            volume: bar.volume(),
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> Decimal {
        self.open
    }

    fn high(&self) -> Decimal {
        self.high
    }

    fn low(&self) -> Decimal {
        self.low
    }

    fn close(&self) -> Decimal {
        self.close
    }

    fn volume(&self) -> Decimal {
        self.volume
    }

    fn end_time(&self) -> i64 {
        self.end_time
    }

    fn start_time(&self) -> i64 {
        self.start_time
    }

    fn last_traded_price(&self) -> Decimal {
        self.last_traded_price
    }
}

// ============================================================
// SERIES
// ============================================================

/// Ordered, immutable sequence of bars.
///
/// Every bar passes [`OHLCVExt::validate`] and end times are strictly
/// increasing. Dereferences to `[Bar]`, so every engine accepts it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        let mut builder = BarSeriesBuilder::with_capacity(bars.len());
        for bar in bars {
            builder.push(bar)?;
        }
        Ok(builder.build())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    pub fn into_vec(self) -> Vec<Bar> {
        self.bars
    }
}

impl Deref for BarSeries {
    type Target = [Bar];

    fn deref(&self) -> &[Bar] {
        &self.bars
    }
}

impl AsRef<[Bar]> for BarSeries {
    fn as_ref(&self) -> &[Bar] {
        &self.bars
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

/// Append-only construction of a [`BarSeries`].
#[derive(Debug, Default)]
pub struct BarSeriesBuilder {
    bars: Vec<Bar>,
}

impl BarSeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bars: Vec::with_capacity(capacity),
        }
    }

    /// Append a bar, rejecting malformed bars and out-of-order end times.
    pub fn push(&mut self, bar: Bar) -> Result<&mut Self> {
        let index = self.bars.len();
        bar.validate().map_err(|e| match e {
            AnalysisError::InvalidBar { reason, .. } => AnalysisError::InvalidBar { index, reason },
            other => other,
        })?;
        if let Some(last) = self.bars.last() {
            if bar.end_time <= last.end_time {
                return Err(AnalysisError::InvalidBar {
                    index,
                    reason: "end_time not after previous bar",
                });
            }
        }
        self.bars.push(bar);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn build(self) -> BarSeries {
        BarSeries { bars: self.bars }
    }
}
