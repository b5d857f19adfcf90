//! Parameter metadata for channel and level tunables
//!
//! This module provides metadata about configuration parameters, enabling:
//! - Grid search optimization
//! - Parameter documentation
//! - Building configs from flat key/value maps
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use trendsr::params::ParameterizedConfig;
//! use trendsr::prelude::*;
//!
//! for param in LevelConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("min_score", 7.0);
//! let config = LevelConfig::with_params(&params).unwrap();
//! assert_eq!(config.min_score, rust_decimal::Decimal::from(7));
//! ```

use std::collections::HashMap;

use rust_decimal::{prelude::FromPrimitive, Decimal};

use crate::{channels::ChannelConfig, levels::LevelConfig, AnalysisError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0
  Ratio,
  /// Positive integer
  Period,
  /// Non-negative integer
  Count,
  /// Exact decimal (scores, percentages)
  Decimal,
  /// Boolean switch encoded as 0.0 / 1.0
  Flag,
}

/// Metadata for a single tunable
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "cut_cooldown")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  pub const fn decimal(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Decimal, default, range, description }
  }

  pub const fn flag(name: &'static str, default: bool, description: &'static str) -> Self {
    let default = if default { 1.0 } else { 0.0 };
    Self { name, param_type: ParamType::Flag, default, range: (0.0, 1.0, 1.0), description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if !value.is_finite() {
      return Err(AnalysisError::InvalidArgument("parameter must be finite"));
    }
    if value < min || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio | ParamType::Decimal => Ok(()),
      ParamType::Period if value < 1.0 || value.fract() != 0.0 => {
        Err(AnalysisError::InvalidArgument("period must be a positive integer"))
      },
      ParamType::Count if value.fract() != 0.0 => {
        Err(AnalysisError::InvalidArgument("count must be an integer"))
      },
      ParamType::Flag if value != 0.0 && value != 1.0 => {
        Err(AnalysisError::InvalidArgument("flag must be 0 or 1"))
      },
      _ => Ok(()),
    }
  }
}

// ============================================================
// PARAMETERIZED CONFIG TRAIT
// ============================================================

/// Configs whose tunables can be enumerated and set from a flat map
pub trait ParameterizedConfig: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a config from a HashMap.
  ///
  /// Missing parameters use their default values; unknown keys are rejected.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

/// Reject keys that no parameter in `meta` declares.
pub fn check_known(params: &HashMap<&str, f64>, meta: &[ParamMeta]) -> Result<()> {
  match params.keys().find(|key| !meta.iter().any(|m| m.name == **key)) {
    Some(key) => Err(AnalysisError::InvalidConfig(format!("unknown parameter `{key}`"))),
    None => Ok(()),
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  Period::new(get_count(params, key, default)?)
}

pub fn get_count(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<usize> {
  match params.get(key) {
    None => Ok(default),
    Some(&v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(v as usize),
    Some(_) => Err(AnalysisError::InvalidArgument("count must be a non-negative integer")),
  }
}

/// Decimal from params; the default is used as-is, without passing through f64.
pub fn get_decimal(params: &HashMap<&str, f64>, key: &str, default: Decimal) -> Result<Decimal> {
  match params.get(key) {
    None => Ok(default),
    Some(&v) => {
      Decimal::from_f64(v).ok_or(AnalysisError::InvalidArgument("parameter is not representable"))
    },
  }
}

pub fn get_flag(params: &HashMap<&str, f64>, key: &str, default: bool) -> bool {
  params.get(key).map_or(default, |&v| v != 0.0)
}

// ============================================================
// IMPLEMENTATIONS
// ============================================================

static CHANNEL_PARAMS: [ParamMeta; 2] = [
  ParamMeta::ratio(
    "contained_ratio",
    0.95,
    (0.80, 1.0, 0.05),
    "Share of samples the channel radius must contain",
  ),
  ParamMeta::flag("consider_only_close", false, "Measure deviation with closes only"),
];

impl ParameterizedConfig for ChannelConfig {
  fn param_meta() -> &'static [ParamMeta] {
    &CHANNEL_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    check_known(params, Self::param_meta())?;
    let defaults = Self::default();
    Ok(Self {
      contained_ratio: get_ratio(params, "contained_ratio", defaults.contained_ratio.get())?,
      consider_only_close: get_flag(params, "consider_only_close", defaults.consider_only_close),
    })
  }
}

static LEVEL_PARAMS: [ParamMeta; 14] = [
  ParamMeta::count("cut_cooldown", 5.0, (0.0, 10.0, 1.0), "Bars between two counted cuts"),
  ParamMeta::decimal("body_cut_score", -2.0, (-4.0, 0.0, 1.0), "Score for a body crossing"),
  ParamMeta::decimal("wick_cut_score", -1.0, (-3.0, 0.0, 1.0), "Score for a wick crossing"),
  ParamMeta::decimal("extreme_touch_score", 1.0, (0.0, 3.0, 1.0), "Touch score, extreme-flag weight"),
  ParamMeta::decimal("normal_touch_score", 2.0, (0.0, 4.0, 1.0), "Touch score, normal weight"),
  ParamMeta::decimal("min_score", 5.0, (1.0, 10.0, 1.0), "Lowest score reported"),
  ParamMeta::decimal(
    "level_similarity_pct",
    0.8,
    (0.2, 2.0, 0.2),
    "Distance (%) under which two levels are the same",
  ),
  ParamMeta::decimal(
    "extreme_exclusion_pct",
    0.3,
    (0.1, 1.0, 0.1),
    "Distance (%) to the series extremes that disqualifies a level",
  ),
  ParamMeta::decimal(
    "trend_confirmation_pct",
    0.8,
    (0.2, 2.0, 0.2),
    "Move (%) that confirms the approach trend of a touch",
  ),
  ParamMeta::decimal(
    "touch_tolerance_pct",
    0.8,
    (0.2, 2.0, 0.2),
    "Distance (%) of last traded price counted as a touch",
  ),
  ParamMeta::period("max_levels", 30.0, (5.0, 50.0, 5.0), "Levels returned at most"),
  ParamMeta::count("high_low_padding", 2.0, (1.0, 5.0, 1.0), "Neighbours checked for local extremes"),
  ParamMeta::period("candidate_window", 5.0, (2.0, 10.0, 1.0), "Half-width of the candidate window"),
  ParamMeta::flag(
    "mirror_touch_down_weights",
    false,
    "Weight touch-downs like touch-ups",
  ),
];

impl ParameterizedConfig for LevelConfig {
  fn param_meta() -> &'static [ParamMeta] {
    &LEVEL_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    check_known(params, Self::param_meta())?;
    let d = Self::default();
    let config = Self {
      cut_cooldown: get_count(params, "cut_cooldown", d.cut_cooldown)?,
      body_cut_score: get_decimal(params, "body_cut_score", d.body_cut_score)?,
      wick_cut_score: get_decimal(params, "wick_cut_score", d.wick_cut_score)?,
      extreme_touch_score: get_decimal(params, "extreme_touch_score", d.extreme_touch_score)?,
      normal_touch_score: get_decimal(params, "normal_touch_score", d.normal_touch_score)?,
      min_score: get_decimal(params, "min_score", d.min_score)?,
      level_similarity_pct: get_decimal(params, "level_similarity_pct", d.level_similarity_pct)?,
      extreme_exclusion_pct: get_decimal(params, "extreme_exclusion_pct", d.extreme_exclusion_pct)?,
      trend_confirmation_pct: get_decimal(
        params,
        "trend_confirmation_pct",
        d.trend_confirmation_pct,
      )?,
      touch_tolerance_pct: get_decimal(params, "touch_tolerance_pct", d.touch_tolerance_pct)?,
      max_levels: get_count(params, "max_levels", d.max_levels)?,
      high_low_padding: get_count(params, "high_low_padding", d.high_low_padding)?,
      candidate_window: get_period(params, "candidate_window", d.candidate_window.get())?,
      mirror_touch_down_weights: get_flag(
        params,
        "mirror_touch_down_weights",
        d.mirror_touch_down_weights,
      ),
    };
    config.validate()?;
    Ok(config)
  }
}

// ============================================================
// TESTS
// ============================================================
