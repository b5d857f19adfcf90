//! Regression channel around a span of bars.
//!
//! The main line is the OLS fit of close against end time (milliseconds). The
//! radius is the `contained_ratio` empirical quantile of the bars' absolute
//! deviation from that line, so roughly that fraction of bars lies inside
//! `line ± radius`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::regression::{LinearRegression, TrendLine};
use crate::{AnalysisError, Ratio, Result, OHLCV};

/// Channel sizing options.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelConfig {
    /// Fraction of bars the envelope should contain.
    pub contained_ratio: Ratio,
    /// Measure deviation by close only instead of the whole high/low range.
    pub consider_only_close: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            contained_ratio: Ratio::new_const(0.95),
            consider_only_close: false,
        }
    }
}

impl ChannelConfig {
    /// Fails with `OutOfRange` unless `contained_ratio` is in `[0, 1]`.
    pub fn new(contained_ratio: f64, consider_only_close: bool) -> Result<Self> {
        Ok(Self {
            contained_ratio: Ratio::new(contained_ratio)?,
            consider_only_close,
        })
    }
}

/// The numbers of one bar that the channel needs.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelSample {
    pub time: i64,
    pub close: f64,
    pub low: f64,
    pub high: f64,
}

impl ChannelSample {
    pub fn from_bar<T: OHLCV>(bar: &T) -> Self {
        Self {
            time: bar.end_time(),
            close: to_f64(bar.close()),
            low: to_f64(bar.low()),
            high: to_f64(bar.high()),
        }
    }

    fn error(&self, line: &TrendLine, only_close: bool) -> f64 {
        let ideal = line.price_at(self.time);
        if only_close {
            (ideal - self.close).abs()
        } else {
            (ideal - self.low).abs().max((ideal - self.high).abs())
        }
    }
}

// rust_decimal converts every finite value; NaN only if that ever changes.
#[inline]
fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Growable channel with a fixed capacity and a lazily recomputed radius.
#[derive(Debug, Clone)]
pub struct ChannelFitter {
    config: ChannelConfig,
    capacity: usize,
    regression: LinearRegression,
    samples: Vec<ChannelSample>,
    radius: Option<f64>,
}

impl ChannelFitter {
    pub fn with_capacity(capacity: usize, config: ChannelConfig) -> Self {
        Self {
            config,
            capacity,
            regression: LinearRegression::new(),
            samples: Vec::with_capacity(capacity),
            radius: None,
        }
    }

    /// Fit a channel over every bar of `bars`.
    pub fn fit<T: OHLCV>(bars: &[T], config: ChannelConfig) -> Result<Self> {
        let mut fitter = Self::with_capacity(bars.len(), config);
        for bar in bars {
            fitter.add_bar(bar)?;
        }
        Ok(fitter)
    }

    pub fn add_bar<T: OHLCV>(&mut self, bar: &T) -> Result<()> {
        self.add_sample(ChannelSample::from_bar(bar))
    }

    pub fn add_sample(&mut self, sample: ChannelSample) -> Result<()> {
        if self.is_full() {
            return Err(AnalysisError::InvalidArgument("channel is at capacity"));
        }
        self.regression.add_sample(sample.time as f64, sample.close);
        self.samples.push(sample);
        self.radius = None;
        Ok(())
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Every slot up to the configured capacity holds a bar.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn samples(&self) -> &[ChannelSample] {
        &self.samples
    }

    pub fn line(&self) -> Result<TrendLine> {
        self.regression.regress()
    }

    /// Envelope radius; cached until the next sample arrives.
    pub fn radius(&mut self) -> Result<f64> {
        if let Some(radius) = self.radius {
            return Ok(radius);
        }
        let line = self.line()?;
        let radius = quantile_radius(&self.samples, &line, &self.config)?;
        self.radius = Some(radius);
        Ok(radius)
    }

    /// Freeze the current state into an immutable channel.
    pub fn finish(&mut self) -> Result<FittedChannel> {
        let line = self.line()?;
        let radius = self.radius()?;
        Ok(FittedChannel {
            line,
            radius,
            samples: self.samples.clone(),
        })
    }
}

fn quantile_radius(samples: &[ChannelSample], line: &TrendLine, config: &ChannelConfig) -> Result<f64> {
    if samples.is_empty() {
        return Err(AnalysisError::InsufficientData { need: 1, got: 0 });
    }
    let mut errors: Vec<f64> = samples
        .iter()
        .map(|s| s.error(line, config.consider_only_close))
        .collect();
    errors.sort_by(f64::total_cmp);

    let last = errors.len() - 1;
    let pos = ((last as f64) * config.contained_ratio.get()).floor() as usize;
    Ok(errors[pos.min(last)])
}

/// Immutable fitted channel: main line, radius and the samples it covers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FittedChannel {
    line: TrendLine,
    radius: f64,
    samples: Vec<ChannelSample>,
}

impl FittedChannel {
    pub fn line(&self) -> &TrendLine {
        &self.line
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn samples(&self) -> &[ChannelSample] {
        &self.samples
    }

    /// End time of the first bar.
    pub fn time1(&self) -> i64 {
        self.samples.first().map_or(0, |s| s.time)
    }

    /// End time of the last bar.
    pub fn time2(&self) -> i64 {
        self.samples.last().map_or(0, |s| s.time)
    }

    pub fn main_price(&self, time_ms: i64) -> f64 {
        self.line.price_at(time_ms)
    }

    pub fn upper_price(&self, time_ms: i64) -> f64 {
        self.main_price(time_ms) + self.radius
    }

    pub fn lower_price(&self, time_ms: i64) -> f64 {
        self.main_price(time_ms) - self.radius
    }

    pub fn main_price1(&self) -> f64 {
        self.main_price(self.time1())
    }

    pub fn main_price2(&self) -> f64 {
        self.main_price(self.time2())
    }

    pub fn upper_price1(&self) -> f64 {
        self.upper_price(self.time1())
    }

    pub fn upper_price2(&self) -> f64 {
        self.upper_price(self.time2())
    }

    pub fn lower_price1(&self) -> f64 {
        self.lower_price(self.time1())
    }

    pub fn lower_price2(&self) -> f64 {
        self.lower_price(self.time2())
    }

    /// Fraction of samples whose measured deviation is within the radius.
    pub fn containment(&self, consider_only_close: bool) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let inside = self
            .samples
            .iter()
            .filter(|s| s.error(&self.line, consider_only_close) <= self.radius)
            .count();
        inside as f64 / self.samples.len() as f64
    }
}
