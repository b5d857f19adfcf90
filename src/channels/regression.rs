//! Incremental ordinary least squares over `(time, price)` samples.

use crate::{AnalysisError, Result};

/// Straight line `price(t) = a + b * t`.
///
/// The line is anchored at `origin` (the first sample's time) so evaluation
/// near the samples does not lose precision to large epoch offsets.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrendLine {
    origin: f64,
    intercept_at_origin: f64,
    slope: f64,
}

impl TrendLine {
    /// Line through `(0, intercept)` with the given slope.
    pub fn new(intercept: f64, slope: f64) -> Self {
        Self {
            origin: 0.0,
            intercept_at_origin: intercept,
            slope,
        }
    }

    /// `a` in `a + b * t`.
    #[inline]
    pub fn intercept(&self) -> f64 {
        self.intercept_at_origin - self.slope * self.origin
    }

    /// `b` in `a + b * t`, price units per millisecond.
    #[inline]
    pub fn slope(&self) -> f64 {
        self.slope
    }

    #[inline]
    pub fn y_at(&self, x: f64) -> f64 {
        self.intercept_at_origin + self.slope * (x - self.origin)
    }

    #[inline]
    pub fn price_at(&self, time_ms: i64) -> f64 {
        self.y_at(time_ms as f64)
    }
}

/// Running sums for OLS; each sample costs O(1) and the line is recomputed from
/// the sums without rescanning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearRegression {
    origin: Option<f64>,
    n: usize,
    sum_x: f64,
    sum_xx: f64,
    sum_y: f64,
    sum_xy: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sample(&mut self, x: f64, y: f64) {
        let origin = *self.origin.get_or_insert(x);
        let dx = x - origin;
        self.n += 1;
        self.sum_x += dx;
        self.sum_xx += dx * dx;
        self.sum_y += y;
        self.sum_xy += dx * y;
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Fit the line. Needs at least two samples at distinct times.
    pub fn regress(&self) -> Result<TrendLine> {
        if self.n < 2 {
            return Err(AnalysisError::InsufficientData {
                need: 2,
                got: self.n,
            });
        }
        let n = self.n as f64;
        let denominator = n * self.sum_xx - self.sum_x * self.sum_x;
        if denominator <= 0.0 || !denominator.is_finite() {
            return Err(AnalysisError::InvalidArgument(
                "regression samples share a single timestamp",
            ));
        }
        let slope = (n * self.sum_xy - self.sum_x * self.sum_y) / denominator;
        let intercept_at_origin = (self.sum_y - slope * self.sum_x) / n;

        Ok(TrendLine {
            origin: self.origin.unwrap_or(0.0),
            intercept_at_origin,
            slope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line_small_x() {
        let mut reg = LinearRegression::new();
        for x in 0..10 {
            reg.add_sample(x as f64, 3.0 + 0.5 * x as f64);
        }
        let line = reg.regress().unwrap();
        assert!((line.intercept() - 3.0).abs() < 1e-12);
        assert!((line.slope() - 0.5).abs() < 1e-12);
        assert!((line.y_at(20.0) - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_exact_line_epoch_millis() {
        let t0 = 1_700_000_000_000_i64;
        let a = -16_900.0;
        let b = 1e-8;
        let mut reg = LinearRegression::new();
        for k in 0..24 {
            let t = (t0 + k * 3_600_000) as f64;
            reg.add_sample(t, a + b * t);
        }
        let line = reg.regress().unwrap();
        assert!((line.slope() - b).abs() < 1e-15);
        assert!((line.intercept() - a).abs() < 1e-3);
        let t_mid = t0 + 12 * 3_600_000;
        assert!((line.price_at(t_mid) - (a + b * t_mid as f64)).abs() < 1e-9);
    }

    #[test]
    fn test_needs_two_samples() {
        let mut reg = LinearRegression::new();
        assert!(matches!(
            reg.regress(),
            Err(AnalysisError::InsufficientData { need: 2, got: 0 })
        ));
        reg.add_sample(1.0, 1.0);
        assert!(matches!(
            reg.regress(),
            Err(AnalysisError::InsufficientData { need: 2, got: 1 })
        ));
    }

    #[test]
    fn test_same_timestamp_rejected() {
        let mut reg = LinearRegression::new();
        reg.add_sample(5.0, 1.0);
        reg.add_sample(5.0, 2.0);
        assert!(reg.regress().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_noisy_fit_passes_through_means() {
        let mut reg = LinearRegression::new();
        let pts = [(0.0, 1.0), (1.0, 3.0), (2.0, 2.0), (3.0, 4.0)];
        for (x, y) in pts {
            reg.add_sample(x, y);
        }
        let line = reg.regress().unwrap();
        // OLS line passes through (mean x, mean y)
        assert!((line.y_at(1.5) - 2.5).abs() < 1e-12);
        assert!((line.slope() - 0.8).abs() < 1e-12);
    }
}
