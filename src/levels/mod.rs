//! Support and resistance levels ranked by how price interacted with them.
//!
//! [`support_and_resistance`] aggregates the bars, flags local extremes,
//! collects candidate prices, scores every candidate and keeps the strongest
//! distinct levels.

pub mod extrema;
pub mod filter;
pub mod scorer;

use rayon::prelude::*;
use rust_decimal::Decimal;

use crate::{aggregate::aggregate_bars, AnalysisError, Period, Result, OHLCV};

pub use extrema::{candidate_prices, find_high_low, series_max_high, series_min_low};
pub use filter::{is_similar, near_extreme, select_levels};
pub use scorer::{score_level, LevelRole, ScoreEvent, ScoreEventKind, ScoredLevel};

/// Scoring and selection tunables. Percentages are in percent (0.8 means 0.8%).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LevelConfig {
    /// Bars that must pass after a counted cut before another cut counts.
    pub cut_cooldown: usize,
    pub body_cut_score: Decimal,
    pub wick_cut_score: Decimal,
    /// Touch on a bar flagged as a local extreme.
    pub extreme_touch_score: Decimal,
    pub normal_touch_score: Decimal,
    /// Levels scoring below this are never reported.
    pub min_score: Decimal,
    pub level_similarity_pct: Decimal,
    pub extreme_exclusion_pct: Decimal,
    pub trend_confirmation_pct: Decimal,
    /// Touch proximity, as a share of the bar's last traded price.
    pub touch_tolerance_pct: Decimal,
    pub max_levels: usize,
    /// Neighbours on each side for the high/low flags.
    pub high_low_padding: usize,
    /// Window for candidate extremes: `window` bars back, `window - 1` ahead.
    pub candidate_window: Period,
    /// Score touch-down bars with the touch-up flag polarity.
    pub mirror_touch_down_weights: bool,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            cut_cooldown: 5,
            body_cut_score: Decimal::from(-2),
            wick_cut_score: Decimal::from(-1),
            extreme_touch_score: Decimal::ONE,
            normal_touch_score: Decimal::TWO,
            min_score: Decimal::from(5),
            level_similarity_pct: Decimal::new(8, 1),
            extreme_exclusion_pct: Decimal::new(3, 1),
            trend_confirmation_pct: Decimal::new(8, 1),
            touch_tolerance_pct: Decimal::new(8, 1),
            max_levels: 30,
            high_low_padding: 2,
            candidate_window: Period::new_const(5),
            mirror_touch_down_weights: false,
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<()> {
        let percentages = [
            self.level_similarity_pct,
            self.extreme_exclusion_pct,
            self.trend_confirmation_pct,
            self.touch_tolerance_pct,
        ];
        if percentages.iter().any(|p| *p < Decimal::ZERO) {
            return Err(AnalysisError::InvalidArgument("percentages must be >= 0"));
        }
        Ok(())
    }
}

/// `pct` percent of `value`.
#[inline]
pub(crate) fn pct_of(value: Decimal, pct: Decimal) -> Decimal {
    value * pct / Decimal::ONE_HUNDRED
}

/// Aggregate `bars` by `group_size` and return the strongest distinct levels.
///
/// An empty series yields no levels.
pub fn support_and_resistance<T: OHLCV>(
    bars: &[T],
    group_size: usize,
    config: &LevelConfig,
) -> Result<Vec<ScoredLevel>> {
    let aggregated = aggregate_bars(bars, group_size)?;
    levels_from_bars(&aggregated, config)
}

/// Same as [`support_and_resistance`] on bars that are already at the wanted
/// granularity.
pub fn levels_from_bars<T: OHLCV + Sync>(bars: &[T], config: &LevelConfig) -> Result<Vec<ScoredLevel>> {
    config.validate()?;
    let (Some(min), Some(max)) = (series_min_low(bars), series_max_high(bars)) else {
        return Ok(Vec::new());
    };

    let flags = find_high_low(bars, config.high_low_padding);
    let candidates = candidate_prices(bars, config.candidate_window);

    let scored = candidates
        .par_iter()
        .map(|&price| score_level(bars, &flags, price, config))
        .collect::<Result<Vec<_>>>()?;

    Ok(select_levels(scored, min, max, config))
}

pub fn resistance_levels(levels: &[ScoredLevel]) -> Vec<&ScoredLevel> {
    levels.iter().filter(|l| l.is_resistance()).collect()
}

pub fn support_levels(levels: &[ScoredLevel]) -> Vec<&ScoredLevel> {
    levels.iter().filter(|l| l.is_support()).collect()
}

/// Highest-scoring resistance; the first one wins a tie.
pub fn strongest_resistance(levels: &[ScoredLevel]) -> Option<&ScoredLevel> {
    strongest(levels.iter().filter(|l| l.is_resistance()))
}

/// Highest-scoring support; the first one wins a tie.
pub fn strongest_support(levels: &[ScoredLevel]) -> Option<&ScoredLevel> {
    strongest(levels.iter().filter(|l| l.is_support()))
}

fn strongest<'a>(levels: impl Iterator<Item = &'a ScoredLevel>) -> Option<&'a ScoredLevel> {
    levels.fold(None, |best: Option<&ScoredLevel>, level| match best {
        Some(b) if b.score >= level.score => Some(b),
        _ => Some(level),
    })
}
