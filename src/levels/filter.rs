//! Final selection of scored levels.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::scorer::ScoredLevel;
use super::{pct_of, LevelConfig};

/// Rank `scored` by score (descending, stable) and greedily accept up to
/// `max_levels` of them.
///
/// A level is accepted when it reaches `min_score`, is not within
/// `level_similarity_pct` of an already accepted level and is not within
/// `extreme_exclusion_pct` of the series' lowest low or highest high.
pub fn select_levels(
    mut scored: Vec<ScoredLevel>,
    series_min: Decimal,
    series_max: Decimal,
    config: &LevelConfig,
) -> Vec<ScoredLevel> {
    scored.sort_by(|a, b| b.score.cmp(&a.score));

    let mut accepted: Vec<ScoredLevel> = Vec::new();
    for level in scored {
        if accepted.len() >= config.max_levels {
            break;
        }
        if level.score < config.min_score {
            continue;
        }
        if is_similar(level.price, &accepted, config.level_similarity_pct) {
            trace!(price = %level.price, "level rejected: close to an accepted level");
            continue;
        }
        if near_extreme(level.price, series_min, series_max, config.extreme_exclusion_pct) {
            trace!(price = %level.price, "level rejected: close to series extreme");
            continue;
        }
        debug!(
            price = %level.price,
            score = %level.score,
            events = level.events.len(),
            "strong level accepted"
        );
        accepted.push(level);
    }
    accepted
}

/// Within `pct` percent (of the accepted price) of any accepted level.
pub fn is_similar(price: Decimal, accepted: &[ScoredLevel], pct: Decimal) -> bool {
    accepted
        .iter()
        .any(|level| (price - level.price).abs() <= pct_of(level.price, pct))
}

/// Strictly within `pct` percent of the series minimum or maximum.
pub fn near_extreme(price: Decimal, min: Decimal, max: Decimal, pct: Decimal) -> bool {
    (price - min).abs() < pct_of(min, pct) || (price - max).abs() < pct_of(max, pct)
}

#[cfg(test)]
mod tests {
    use rust_decimal::prelude::ToPrimitive;

    use super::*;

    fn level(price: i64, score: i64) -> ScoredLevel {
        ScoredLevel {
            price: Decimal::from(price),
            score: Decimal::from(score),
            events: Vec::new(),
        }
    }

    fn run(levels: Vec<ScoredLevel>) -> Vec<i64> {
        select_levels(levels, Decimal::from(50), Decimal::from(200), &LevelConfig::default())
            .iter()
            .map(|l| l.price.to_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_ranked_by_score() {
        assert_eq!(run(vec![level(100, 5), level(120, 9), level(140, 7)]), vec![120, 140, 100]);
    }

    #[test]
    fn test_min_score() {
        assert_eq!(run(vec![level(100, 4), level(120, 5)]), vec![120]);
    }

    #[test]
    fn test_similar_rejected() {
        // 0.8% of 1000 is 8
        let kept = select_levels(
            vec![level(1000, 9), level(1008, 8), level(1009, 7)],
            Decimal::from(500),
            Decimal::from(2000),
            &LevelConfig::default(),
        );
        let prices: Vec<Decimal> = kept.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![Decimal::from(1000), Decimal::from(1009)]);
    }

    #[test]
    fn test_extremes_rejected() {
        // 0.3% of 200 is 0.6, of 50 is 0.15
        assert_eq!(run(vec![level(200, 9), level(50, 9), level(150, 6)]), vec![150]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        assert_eq!(run(vec![level(100, 6), level(120, 6), level(80, 6)]), vec![100, 120, 80]);
    }

    #[test]
    fn test_max_levels() {
        let config = LevelConfig {
            max_levels: 2,
            ..LevelConfig::default()
        };
        let kept = select_levels(
            vec![level(100, 9), level(120, 8), level(140, 7)],
            Decimal::from(50),
            Decimal::from(200),
            &config,
        );
        assert_eq!(kept.len(), 2);
    }
}
