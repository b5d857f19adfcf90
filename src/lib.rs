//! # trendsr - trend channels and support/resistance levels
//!
//! Bar-series analysis for technical trading: confirmed-reversal trend
//! channels fitted by regression, and price levels scored by how the market
//! interacted with them.
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use trendsr::prelude::*;
//!
//! // One bar per minute, oscillating between 100 and 109
//! let bars: Vec<Bar> = (0..40i64)
//!     .map(|i| {
//!         let c = Decimal::from(100 + i % 10);
//!         Bar::new(i * 60_000, c, c + Decimal::ONE, c - Decimal::ONE, c, Decimal::from(10))
//!     })
//!     .collect();
//!
//! let analyzer = AnalyzerBuilder::new()
//!     .group_size(1)
//!     .confirmations(2)
//!     .build()
//!     .unwrap();
//!
//! let analysis = analyzer.analyze(&bars).unwrap();
//! for segment in &analysis.channels {
//!     assert!(segment.len() > 2);
//! }
//! ```

pub mod aggregate;
pub mod bar;
pub mod channels;
pub mod levels;
pub mod params;

pub mod prelude {
    pub use crate::{
        // Aggregation
        aggregate::aggregate_bars,
        // Bars
        bar::{Bar, BarSeries, BarSeriesBuilder},
        // Channels
        channels::{
            directions, ChannelConfig, ChannelFitter, ChannelSegment, ChannelSegmenter, Direction,
            DirectionMachine, FittedChannel, TrendLine,
        },
        // Levels
        levels::{
            resistance_levels, strongest_resistance, strongest_support, support_and_resistance,
            support_levels, LevelConfig, LevelRole, ScoreEvent, ScoreEventKind, ScoredLevel,
        },
        // Parameters
        params::{ParamMeta, ParamType, ParameterizedConfig},
        // Parallel
        analyze_parallel,
        // Engine
        Analysis,
        AnalysisError,
        AnalysisResult,
        Analyzer,
        AnalyzerBuilder,
        AnalyzerConfig,
        OHLCVExt,
        Period,
        Ratio,
        Result,
        SymbolError,
        OHLCV,
    };
}

use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    channels::{ChannelConfig, ChannelSegment, ChannelSegmenter},
    levels::{LevelConfig, ScoredLevel},
};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while validating input or configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need}, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },
}

impl AnalysisError {
    /// True for rejected arguments, bounded values included.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::OutOfRange { .. })
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(AnalysisError::InvalidArgument(
                "ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length or group size (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidArgument("period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core bar data trait. Times are Unix epoch milliseconds.
pub trait OHLCV {
    fn open(&self) -> Decimal;
    fn high(&self) -> Decimal;
    fn low(&self) -> Decimal;
    fn close(&self) -> Decimal;
    fn volume(&self) -> Decimal;
    fn end_time(&self) -> i64;

    fn start_time(&self) -> i64 {
        self.end_time()
    }

    fn last_traded_price(&self) -> Decimal {
        self.close()
    }
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn open(&self) -> Decimal {
        (**self).open()
    }

    fn high(&self) -> Decimal {
        (**self).high()
    }

    fn low(&self) -> Decimal {
        (**self).low()
    }

    fn close(&self) -> Decimal {
        (**self).close()
    }

    fn volume(&self) -> Decimal {
        (**self).volume()
    }

    fn end_time(&self) -> i64 {
        (**self).end_time()
    }

    fn start_time(&self) -> i64 {
        (**self).start_time()
    }

    fn last_traded_price(&self) -> Decimal {
        (**self).last_traded_price()
    }
}

/// Extension trait with computed properties for bar data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body_top(&self) -> Decimal {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> Decimal {
        self.open().min(self.close())
    }

    #[inline]
    fn body(&self) -> Decimal {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> Decimal {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Reported index is 0; series validation rewrites it.
    fn validate(&self) -> Result<()> {
        let (low, high) = (self.low(), self.high());
        if high < low {
            return Err(AnalysisError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open() < low || self.open() > high {
            return Err(AnalysisError::InvalidBar {
                index: 0,
                reason: "open outside [low, high]",
            });
        }
        if self.close() < low || self.close() > high {
            return Err(AnalysisError::InvalidBar {
                index: 0,
                reason: "close outside [low, high]",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

// ============================================================
// ANALYZER
// ============================================================

/// Everything the analyzer needs to run one series
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalyzerConfig {
    /// Bars merged per level-scoring bar.
    pub group_size: Period,
    pub confirmations: Period,
    pub channel: ChannelConfig,
    pub levels: LevelConfig,
    pub trailing_segment: bool,
    pub validate_data: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            group_size: Period::new_const(1),
            confirmations: Period::new_const(3),
            channel: ChannelConfig::default(),
            levels: LevelConfig::default(),
            trailing_segment: false,
            validate_data: false,
        }
    }
}

/// Channels and levels found in one series
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Analysis {
    pub channels: Vec<ChannelSegment>,
    pub levels: Vec<ScoredLevel>,
}

/// Runs channel segmentation and level scoring over a bar series.
///
/// Channels are fitted on the bars as given; levels are scored on bars
/// aggregated by `group_size`.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    segmenter: ChannelSegmenter,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config
            .levels
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;
        if config.levels.max_levels == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_levels must be > 0".to_string(),
            ));
        }
        let segmenter = ChannelSegmenter::with_period(config.confirmations, config.channel)
            .with_trailing_segment(config.trailing_segment);
        Ok(Self { config, segmenter })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn segmenter(&self) -> &ChannelSegmenter {
        &self.segmenter
    }

    pub fn channels<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<ChannelSegment>> {
        self.check(bars)?;
        self.segmenter.segment(bars)
    }

    pub fn levels<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<ScoredLevel>> {
        self.check(bars)?;
        self.levels_unchecked(bars)
    }

    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> Result<Analysis> {
        self.check(bars)?;
        let channels = self.segmenter.segment(bars)?;
        let levels = self.levels_unchecked(bars)?;
        debug!(
            bars = bars.len(),
            channels = channels.len(),
            levels = levels.len(),
            "analyzed series"
        );
        Ok(Analysis { channels, levels })
    }

    fn levels_unchecked<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<ScoredLevel>> {
        let aggregated = aggregate::aggregate_with(bars, self.config.group_size);
        levels::levels_from_bars(&aggregated, &self.config.levels)
    }

    fn check<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        if !self.config.validate_data {
            return Ok(());
        }
        let mut previous: Option<i64> = None;
        for (index, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                AnalysisError::InvalidBar { reason, .. } => AnalysisError::InvalidBar { index, reason },
                other => other,
            })?;
            let time = bar.end_time();
            if previous.is_some_and(|p| time <= p) {
                return Err(AnalysisError::InvalidBar {
                    index,
                    reason: "end_time not after previous bar",
                });
            }
            previous = Some(time);
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating Analyzer instances
#[derive(Debug, Clone)]
pub struct AnalyzerBuilder {
    group_size: usize,
    confirmations: usize,
    config: AnalyzerConfig,
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        let config = AnalyzerConfig::default();
        Self {
            group_size: config.group_size.get(),
            confirmations: config.confirmations.get(),
            config,
        }
    }

    /// Bars merged into one before level scoring
    pub fn group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size;
        self
    }

    /// Trailing closes a reversal must beat
    pub fn confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.config.channel = config;
        self
    }

    pub fn level_config(mut self, config: LevelConfig) -> Self {
        self.config.levels = config;
        self
    }

    /// Also emit the span after the last reversal
    pub fn trailing_segment(mut self, enable: bool) -> Self {
        self.config.trailing_segment = enable;
        self
    }

    /// Enable/disable bar validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    pub fn build(mut self) -> Result<Analyzer> {
        self.config.group_size = Period::new(self.group_size)
            .map_err(|_| AnalysisError::InvalidConfig("group_size must be > 0".to_string()))?;
        self.config.confirmations = Period::new(self.confirmations)
            .map_err(|_| AnalysisError::InvalidConfig("confirmations must be > 0".to_string()))?;
        Analyzer::new(self.config)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analyzing a single instrument
#[derive(Debug)]
pub struct AnalysisResult {
    pub symbol: String,
    pub analysis: Analysis,
}

/// Error from analyzing a single instrument
#[derive(Debug)]
pub struct SymbolError {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Analyze many instruments in parallel; input order is preserved in both lists.
pub fn analyze_parallel<'a, T, I>(
    analyzer: &Analyzer,
    instruments: I,
) -> (Vec<AnalysisResult>, Vec<SymbolError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            analyzer
                .analyze(bars)
                .map(|analysis| AnalysisResult {
                    symbol: symbol.to_string(),
                    analysis,
                })
                .map_err(|error| SymbolError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
