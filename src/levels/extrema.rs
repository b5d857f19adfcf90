//! Local extrema over a bar sequence.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::{Period, OHLCV};

/// Flag bars whose high tops, or whose low undercuts, every bar within
/// `padding` positions on either side.
///
/// Windows are clipped at the sequence boundaries; a bar with no neighbours at
/// all is never flagged. The output is index-aligned with `bars`.
pub fn find_high_low<T: OHLCV>(bars: &[T], padding: usize) -> Vec<bool> {
    (0..bars.len())
        .map(|i| {
            let before = &bars[i.saturating_sub(padding)..i];
            let after_end = i.saturating_add(padding).saturating_add(1).min(bars.len());
            let after = &bars[(i + 1).min(after_end)..after_end];

            let mut neighbours = before.iter().chain(after.iter());
            let Some(first) = neighbours.next() else {
                return false;
            };
            let (highest, lowest) = neighbours.fold((first.high(), first.low()), |(h, l), b| {
                (h.max(b.high()), l.min(b.low()))
            });

            let bar = &bars[i];
            bar.high() > highest || bar.low() < lowest
        })
        .collect()
}

/// Candidate support/resistance prices.
///
/// Bar `i` qualifies when its low equals the lowest low, or its high the
/// highest high, of the bars in `[i - window, i + window)` (clipped). Both the
/// high and the low of a qualifying bar become candidates. Duplicates are
/// dropped and first-seen order is kept, so downstream ranking is
/// deterministic.
pub fn candidate_prices<T: OHLCV>(bars: &[T], window: Period) -> Vec<Decimal> {
    let w = window.get();
    let mut seen = BTreeSet::new();
    let mut candidates = Vec::new();

    for (i, bar) in bars.iter().enumerate() {
        let slice = &bars[i.saturating_sub(w)..i.saturating_add(w).min(bars.len())];
        let lowest = slice.iter().map(|b| b.low()).min();
        let highest = slice.iter().map(|b| b.high()).max();

        if lowest == Some(bar.low()) || highest == Some(bar.high()) {
            for price in [bar.high(), bar.low()] {
                if seen.insert(price) {
                    candidates.push(price);
                }
            }
        }
    }
    candidates
}

/// Lowest low of the series.
pub fn series_min_low<T: OHLCV>(bars: &[T]) -> Option<Decimal> {
    bars.iter().map(|b| b.low()).min()
}

/// Highest high of the series.
pub fn series_max_high<T: OHLCV>(bars: &[T]) -> Option<Decimal> {
    bars.iter().map(|b| b.high()).max()
}
