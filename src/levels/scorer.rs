//! Scoring of one candidate price against the bar history.
//!
//! Each bar is tested against four rules in priority order and at most one
//! fires per bar:
//!
//! 1. body cut: price strictly inside the open/close body (cooldown applies)
//! 2. wick cut: price strictly inside high/low but outside the body (cooldown applies)
//! 3. touch up: high at or just below the price after an approach from below
//! 4. touch down: low at or just above the price after an approach from above

use rust_decimal::Decimal;

use super::{pct_of, LevelConfig};
use crate::{AnalysisError, OHLCVExt, Result, OHLCV};

/// What happened between a bar and the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreEventKind {
    BodyCut,
    WickCut,
    TouchUp,
    TouchUpExtreme,
    TouchDown,
    TouchDownExtreme,
}

impl ScoreEventKind {
    #[inline]
    pub fn is_cut(self) -> bool {
        matches!(self, ScoreEventKind::BodyCut | ScoreEventKind::WickCut)
    }

    #[inline]
    pub fn is_touch_up(self) -> bool {
        matches!(self, ScoreEventKind::TouchUp | ScoreEventKind::TouchUpExtreme)
    }

    #[inline]
    pub fn is_touch_down(self) -> bool {
        matches!(self, ScoreEventKind::TouchDown | ScoreEventKind::TouchDownExtreme)
    }
}

/// One scored interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScoreEvent {
    pub kind: ScoreEventKind,
    /// Index of the bar in the scored sequence.
    pub index: usize,
    /// End time of that bar.
    pub timestamp: i64,
    pub delta: Decimal,
}

/// Whether a level acts as a ceiling or a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LevelRole {
    Support,
    Resistance,
}

/// A price with its accumulated score and the events that produced it.
///
/// `score` is always the exact sum of the events' deltas.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScoredLevel {
    pub price: Decimal,
    pub score: Decimal,
    pub events: Vec<ScoreEvent>,
}

impl ScoredLevel {
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            score: Decimal::ZERO,
            events: Vec::new(),
        }
    }

    fn record(&mut self, kind: ScoreEventKind, index: usize, timestamp: i64, delta: Decimal) {
        self.score += delta;
        self.events.push(ScoreEvent {
            kind,
            index,
            timestamp,
            delta,
        });
    }

    pub fn touch_up_count(&self) -> usize {
        self.events.iter().filter(|e| e.kind.is_touch_up()).count()
    }

    pub fn touch_down_count(&self) -> usize {
        self.events.iter().filter(|e| e.kind.is_touch_down()).count()
    }

    /// More touches from below than from above, and at least one.
    pub fn is_resistance(&self) -> bool {
        let up = self.touch_up_count();
        up > 0 && up > self.touch_down_count()
    }

    /// Everything that is not resistance, including ties.
    pub fn is_support(&self) -> bool {
        !self.is_resistance()
    }

    pub fn role(&self) -> LevelRole {
        if self.is_resistance() {
            LevelRole::Resistance
        } else {
            LevelRole::Support
        }
    }
}

/// Score `price` against `bars`.
///
/// `high_low` must be index-aligned with `bars` (see
/// [`find_high_low`](super::extrema::find_high_low)).
pub fn score_level<T: OHLCV>(
    bars: &[T],
    high_low: &[bool],
    price: Decimal,
    config: &LevelConfig,
) -> Result<ScoredLevel> {
    if high_low.len() != bars.len() {
        return Err(AnalysisError::InvalidArgument(
            "high/low flags must align with bars",
        ));
    }

    let mut level = ScoredLevel::new(price);
    let mut last_cut: Option<usize> = None;

    for (pos, bar) in bars.iter().enumerate() {
        let cooled = last_cut.map_or(true, |cut| pos - cut > config.cut_cooldown);
        let time = bar.end_time();
        let flagged = high_low[pos];

        if cooled && cuts_body(price, bar) {
            level.record(ScoreEventKind::BodyCut, pos, time, config.body_cut_score);
            last_cut = Some(pos);
        } else if cooled && cuts_wick(price, bar) {
            level.record(ScoreEventKind::WickCut, pos, time, config.wick_cut_score);
            last_cut = Some(pos);
        } else if touches_high(price, bar, config) && in_up_trend(bars, price, pos, config) {
            if flagged {
                level.record(ScoreEventKind::TouchUpExtreme, pos, time, config.extreme_touch_score);
            } else {
                level.record(ScoreEventKind::TouchUp, pos, time, config.normal_touch_score);
            }
        } else if touches_low(price, bar, config) && in_down_trend(bars, price, pos, config) {
            match (flagged, config.mirror_touch_down_weights) {
                (true, true) => {
                    level.record(ScoreEventKind::TouchDownExtreme, pos, time, config.extreme_touch_score)
                }
                (false, true) => {
                    level.record(ScoreEventKind::TouchDown, pos, time, config.normal_touch_score)
                }
                // flag polarity inverted relative to touch up
                (false, false) => {
                    level.record(ScoreEventKind::TouchDown, pos, time, config.extreme_touch_score)
                }
                (true, false) => {
                    level.record(ScoreEventKind::TouchDownExtreme, pos, time, config.normal_touch_score)
                }
            }
        }
    }
    Ok(level)
}

#[inline]
fn cuts_body<T: OHLCV>(price: Decimal, bar: &T) -> bool {
    bar.body_bottom() < price && price < bar.body_top()
}

#[inline]
fn cuts_wick<T: OHLCV>(price: Decimal, bar: &T) -> bool {
    !cuts_body(price, bar) && bar.low() < price && price < bar.high()
}

#[inline]
fn touches_high<T: OHLCV>(price: Decimal, bar: &T, config: &LevelConfig) -> bool {
    let high = bar.high();
    high <= price && price - high < pct_of(bar.last_traded_price(), config.touch_tolerance_pct)
}

#[inline]
fn touches_low<T: OHLCV>(price: Decimal, bar: &T, config: &LevelConfig) -> bool {
    let low = bar.low();
    low >= price && low - price < pct_of(bar.last_traded_price(), config.touch_tolerance_pct)
}

/// Price was approached from below up to bar `at`: walking back from `at`, a
/// low at least `trend_confirmation_pct` under the price turns up before any
/// low above it.
pub(crate) fn in_up_trend<T: OHLCV>(bars: &[T], price: Decimal, at: usize, config: &LevelConfig) -> bool {
    let margin = pct_of(price, config.trend_confirmation_pct);
    for bar in bars[..=at].iter().rev() {
        let low = bar.low();
        if low > price {
            return false;
        }
        if price - low >= margin {
            return true;
        }
    }
    false
}

/// Mirror of [`in_up_trend`] on highs.
pub(crate) fn in_down_trend<T: OHLCV>(bars: &[T], price: Decimal, at: usize, config: &LevelConfig) -> bool {
    let margin = pct_of(price, config.trend_confirmation_pct);
    for bar in bars[..=at].iter().rev() {
        let high = bar.high();
        if high < price {
            return false;
        }
        if high - price >= margin {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::Bar;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn bar(t: i64, o: i64, h: i64, l: i64, c: i64) -> Bar {
        Bar::new(t, d(o), d(h), d(l), d(c), d(1))
    }

    fn cfg() -> LevelConfig {
        LevelConfig::default()
    }

    #[test]
    fn test_body_cut() {
        let bars = vec![bar(1, 90, 110, 85, 105)];
        let level = score_level(&bars, &[false], d(100), &cfg()).unwrap();
        assert_eq!(level.events.len(), 1);
        assert_eq!(level.events[0].kind, ScoreEventKind::BodyCut);
        assert_eq!(level.score, d(-2));
    }

    #[test]
    fn test_wick_cut() {
        let bars = vec![bar(1, 90, 110, 85, 95)];
        let level = score_level(&bars, &[false], d(100), &cfg()).unwrap();
        assert_eq!(level.events[0].kind, ScoreEventKind::WickCut);
        assert_eq!(level.score, d(-1));
    }

    #[test]
    fn test_cut_cooldown() {
        // cuts at 0, then 1..=5 are inside the cooldown, 6 is the next one counted
        let bars: Vec<Bar> = (0..8).map(|t| bar(t, 90, 110, 85, 105)).collect();
        let flags = vec![false; bars.len()];
        let level = score_level(&bars, &flags, d(100), &cfg()).unwrap();
        let indices: Vec<usize> = level.events.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 6]);
        assert_eq!(level.score, d(-4));
    }

    #[test]
    fn test_touch_up_extreme_on_flagged_bar() {
        // high == price, ltp 99 gives 0.792 tolerance; low is 5 under so the trend gate passes
        let bars = vec![bar(1, 96, 100, 95, 99)];
        let level = score_level(&bars, &[true], d(100), &cfg()).unwrap();
        assert_eq!(level.events.len(), 1);
        assert_eq!(level.events[0].kind, ScoreEventKind::TouchUpExtreme);
        assert_eq!(level.events[0].delta, d(1));
        assert_eq!(level.score, d(1));
    }

    #[test]
    fn test_touch_up_normal_on_plain_bar() {
        let bars = vec![bar(1, 96, 100, 95, 99)];
        let level = score_level(&bars, &[false], d(100), &cfg()).unwrap();
        assert_eq!(level.events[0].kind, ScoreEventKind::TouchUp);
        assert_eq!(level.score, d(2));
    }

    #[test]
    fn test_touch_outside_tolerance_ignored() {
        // 1 below the price with ltp 99: tolerance 0.792
        let bars = vec![bar(1, 96, 99, 95, 99)];
        let level = score_level(&bars, &[false], d(100), &cfg()).unwrap();
        assert!(level.events.is_empty());
    }

    #[test]
    fn test_touch_down_keeps_inverted_polarity() {
        let bars = vec![bar(1, 104, 105, 100, 101)];
        let plain = score_level(&bars, &[false], d(100), &cfg()).unwrap();
        assert_eq!(plain.events[0].kind, ScoreEventKind::TouchDown);
        assert_eq!(plain.score, d(1));

        let flagged = score_level(&bars, &[true], d(100), &cfg()).unwrap();
        assert_eq!(flagged.events[0].kind, ScoreEventKind::TouchDownExtreme);
        assert_eq!(flagged.score, d(2));
    }

    #[test]
    fn test_touch_down_mirrored_weights() {
        let config = LevelConfig {
            mirror_touch_down_weights: true,
            ..cfg()
        };
        let bars = vec![bar(1, 104, 105, 100, 101)];
        let flagged = score_level(&bars, &[true], d(100), &config).unwrap();
        assert_eq!(flagged.events[0].kind, ScoreEventKind::TouchDownExtreme);
        assert_eq!(flagged.score, d(1));
        let plain = score_level(&bars, &[false], d(100), &config).unwrap();
        assert_eq!(plain.events[0].kind, ScoreEventKind::TouchDown);
        assert_eq!(plain.score, d(2));
    }

    #[test]
    fn test_up_gate_fails_after_bar_above() {
        let bars = vec![bar(1, 102, 104, 101, 103), bar(2, 100, 100, 100, 100)];
        // bar 1 alone never gets 0.8% under; walking back hits a low above the price
        assert!(!in_up_trend(&bars, d(100), 1, &cfg()));
        let bars = vec![bar(1, 96, 99, 90, 98), bar(2, 100, 100, 100, 100)];
        assert!(in_up_trend(&bars, d(100), 1, &cfg()));
    }

    #[test]
    fn test_down_gate_mirrors_up_gate() {
        let bars = vec![bar(1, 98, 99, 96, 97), bar(2, 100, 100, 100, 100)];
        assert!(!in_down_trend(&bars, d(100), 1, &cfg()));
        let bars = vec![bar(1, 104, 110, 103, 105), bar(2, 100, 100, 100, 100)];
        assert!(in_down_trend(&bars, d(100), 1, &cfg()));
        // series start reached with neither condition met
        let bars = vec![bar(1, 100, 100, 100, 100)];
        assert!(!in_down_trend(&bars, d(100), 0, &cfg()));
    }

    #[test]
    fn test_score_is_sum_of_deltas() {
        let bars = vec![
            bar(1, 96, 100, 95, 99),
            bar(2, 90, 110, 85, 105),
            bar(3, 104, 105, 100, 101),
            bar(4, 96, 100, 95, 99),
        ];
        let flags = vec![true, false, false, false];
        let level = score_level(&bars, &flags, d(100), &cfg()).unwrap();
        let sum: Decimal = level.events.iter().map(|e| e.delta).sum();
        assert_eq!(level.score, sum);
        assert!(!level.events.is_empty());
    }

    #[test]
    fn test_misaligned_flags_rejected() {
        let bars = vec![bar(1, 96, 100, 95, 99)];
        assert!(score_level(&bars, &[], d(100), &cfg())
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_role_tie_is_support() {
        let mut level = ScoredLevel::new(d(100));
        assert_eq!(level.role(), LevelRole::Support);
        level.record(ScoreEventKind::TouchUp, 0, 0, d(2));
        assert_eq!(level.role(), LevelRole::Resistance);
        level.record(ScoreEventKind::TouchDown, 1, 1, d(1));
        assert!(level.is_support());
        assert_eq!(level.touch_up_count(), 1);
        assert_eq!(level.touch_down_count(), 1);
    }

    #[test]
    fn test_event_kind_serializes_screaming() {
        let json = serde_json::to_string(&ScoreEventKind::TouchUpExtreme).unwrap();
        assert_eq!(json, "\"TOUCH_UP_EXTREME\"");
    }
}
