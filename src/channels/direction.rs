//! Direction-of-price state machine with confirmation hysteresis.
//!
//! A bar only extends or starts an up run when its close is strictly above
//! every close in the confirmation window (the previous `confirmations`
//! closes); symmetric for down runs. Anything else resets the run to zero, so
//! a single noisy bar can neutralize a run but cannot flip it.

use std::collections::VecDeque;
use std::ops::Range;

use rust_decimal::Decimal;

use crate::{AnalysisError, Period, Result, OHLCV};

/// Sign of a direction value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Up,
    Flat,
    Down,
}

impl Direction {
    #[inline]
    pub fn of(value: i64) -> Self {
        match value.signum() {
            1 => Direction::Up,
            -1 => Direction::Down,
            _ => Direction::Flat,
        }
    }

    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Direction::Up)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Direction::Down)
    }
}

/// Running state of the machine after some prefix of the series.
///
/// Transitions consume the state and return the successor, so the state can
/// be threaded through a fold without any hidden instance fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectionState {
    direction: i64,
    window: VecDeque<Decimal>,
    run_start: usize,
    seen: usize,
}

impl DirectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next close; returns the new state and the bar's direction value.
    pub fn next(mut self, close: Decimal, confirmations: Period) -> (Self, i64) {
        let index = self.seen;
        let previous = self.direction;

        if !self.window.is_empty() {
            let higher = self.window.iter().all(|c| close > *c);
            let lower = self.window.iter().all(|c| close < *c);

            self.direction = if higher {
                if previous > 0 {
                    previous.saturating_add(1)
                } else {
                    1
                }
            } else if lower {
                if previous < 0 {
                    previous.saturating_sub(1)
                } else {
                    -1
                }
            } else {
                0
            };
        }

        if self.direction.signum() != previous.signum() {
            self.run_start = index;
        }

        self.window.push_back(close);
        while self.window.len() > confirmations.get() {
            self.window.pop_front();
        }
        self.seen += 1;

        let value = self.direction;
        (self, value)
    }

    /// Signed run length: positive up, negative down, zero flat.
    #[inline]
    pub fn value(&self) -> i64 {
        self.direction
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        Direction::of(self.direction)
    }

    /// Indices of the bars seen since the sign last changed.
    pub fn run(&self) -> Range<usize> {
        self.run_start..self.seen
    }

    /// Closes currently held for confirmation, oldest first.
    pub fn confirmation_window(&self) -> impl Iterator<Item = &Decimal> {
        self.window.iter()
    }

    pub fn bars_seen(&self) -> usize {
        self.seen
    }
}

/// Bar-by-bar driver around [`DirectionState`] with a fixed window length.
#[derive(Debug, Clone)]
pub struct DirectionMachine {
    confirmations: Period,
    state: DirectionState,
}

impl DirectionMachine {
    /// Fails with `InvalidArgument` when `confirmations` is zero.
    pub fn new(confirmations: usize) -> Result<Self> {
        let confirmations = Period::new(confirmations)
            .map_err(|_| AnalysisError::InvalidArgument("confirmations must be > 0"))?;
        Ok(Self::with_period(confirmations))
    }

    pub fn with_period(confirmations: Period) -> Self {
        Self {
            confirmations,
            state: DirectionState::new(),
        }
    }

    pub fn confirmations(&self) -> Period {
        self.confirmations
    }

    pub fn step<T: OHLCV>(&mut self, bar: &T) -> i64 {
        let state = std::mem::take(&mut self.state);
        let (state, value) = state.next(bar.close(), self.confirmations);
        self.state = state;
        value
    }

    pub fn value(&self) -> i64 {
        self.state.value()
    }

    pub fn run(&self) -> Range<usize> {
        self.state.run()
    }

    pub fn state(&self) -> &DirectionState {
        &self.state
    }
}

/// Direction value for every bar, in one forward pass.
pub fn directions<T: OHLCV>(bars: &[T], confirmations: usize) -> Result<Vec<i64>> {
    let mut machine = DirectionMachine::new(confirmations)?;
    Ok(bars.iter().map(|bar| machine.step(bar)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::Bar;

    fn closes(values: &[i64]) -> Vec<Bar> {
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let c = Decimal::from(c);
                Bar::new(i as i64 * 60_000, c, c, c, c, Decimal::ONE)
            })
            .collect()
    }

    #[test]
    fn test_first_bar_is_flat() {
        let bars = closes(&[100]);
        assert_eq!(directions(&bars, 3).unwrap(), vec![0]);
    }

    #[test]
    fn test_strict_rise_counts_up() {
        let bars = closes(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(directions(&bars, 3).unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_single_dip_neutralizes_without_flipping() {
        // 3 sits between the buffered 2..=4
        let bars = closes(&[1, 2, 3, 4, 3, 5]);
        let values = directions(&bars, 3).unwrap();
        assert_eq!(values[3], 3);
        assert_eq!(values[4], 0);
        assert!(values.iter().all(|v| *v >= 0));
        // 5 beats 3, 4 and 3
        assert_eq!(values[5], 1);
    }

    #[test]
    fn test_equal_close_is_mixed() {
        let bars = closes(&[1, 2, 2]);
        assert_eq!(directions(&bars, 1).unwrap(), vec![0, 1, 0]);
    }

    #[test]
    fn test_reversal_restarts_at_minus_one() {
        let bars = closes(&[1, 2, 3, 0, -1]);
        assert_eq!(directions(&bars, 2).unwrap(), vec![0, 1, 2, -1, -2]);
    }

    #[test]
    fn test_run_tracks_sign_changes() {
        let bars = closes(&[1, 2, 3, 0, -1, -2]);
        let mut machine = DirectionMachine::new(2).unwrap();
        let mut runs = Vec::new();
        for bar in &bars {
            machine.step(bar);
            runs.push(machine.run());
        }
        assert_eq!(runs[0], 0..1);
        assert_eq!(runs[2], 1..3);
        // sign flipped at index 3
        assert_eq!(runs[5], 3..6);
    }

    #[test]
    fn test_window_keeps_last_confirmations() {
        let bars = closes(&[5, 6, 7, 8]);
        let mut machine = DirectionMachine::new(2).unwrap();
        for bar in &bars {
            machine.step(bar);
        }
        let window: Vec<_> = machine.state().confirmation_window().copied().collect();
        assert_eq!(window, vec![Decimal::from(7), Decimal::from(8)]);
        assert_eq!(machine.state().bars_seen(), 4);
    }

    #[test]
    fn test_state_is_a_pure_fold() {
        let period = Period::new(2).unwrap();
        let (state, v0) = DirectionState::new().next(Decimal::from(10), period);
        let (state, v1) = state.clone().next(Decimal::from(11), period);
        let (again, v1b) = DirectionState::new()
            .next(Decimal::from(10), period)
            .0
            .next(Decimal::from(11), period);
        assert_eq!((v0, v1), (0, 1));
        assert_eq!(v1, v1b);
        assert_eq!(state, again);
        assert_eq!(state.direction(), Direction::Up);
    }

    #[test]
    fn test_zero_confirmations_rejected() {
        assert!(DirectionMachine::new(0).unwrap_err().is_invalid_argument());
    }
}
