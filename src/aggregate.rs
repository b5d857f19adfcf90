//! Re-sampling of fine bars into coarser ones.
//!
//! Group `i` covers source bars `[i * group_size, (i + 1) * group_size)`; the last
//! group may be shorter. Each output bar takes the first bar's open, start time
//! and last traded price, the last bar's close and end time, the extreme high
//! and low, and the largest volume of the group (a representative bar, not a
//! volume total).

use crate::{bar::Bar, AnalysisError, Period, Result, OHLCV};

/// Merge every `group_size` consecutive bars into one.
///
/// Fails with `InvalidArgument` when `group_size` is zero. An empty input
/// yields an empty output.
pub fn aggregate_bars<T: OHLCV>(bars: &[T], group_size: usize) -> Result<Vec<Bar>> {
    let group = Period::new(group_size)
        .map_err(|_| AnalysisError::InvalidArgument("group_size must be > 0"))?;
    Ok(aggregate_with(bars, group))
}

/// Same as [`aggregate_bars`] with an already validated group size.
pub fn aggregate_with<T: OHLCV>(bars: &[T], group_size: Period) -> Vec<Bar> {
    bars.chunks(group_size.get()).filter_map(merge_group).collect()
}

fn merge_group<T: OHLCV>(group: &[T]) -> Option<Bar> {
    let first = group.first()?;
    let last = group.last()?;

    let mut merged = Bar {
        start_time: first.start_time(),
        end_time: last.end_time(),
        open: first.open(),
        high: first.high(),
        low: first.low(),
        close: last.close(),
        last_traded_price: first.last_traded_price(),
        volume: first.volume(),
    };
    for bar in &group[1..] {
        merged.high = merged.high.max(bar.high());
        merged.low = merged.low.min(bar.low());
        merged.volume = merged.volume.max(bar.volume());
    }
    Some(merged)
}
