//! Trend channels: direction detection, segmentation at reversals, and
//! regression envelopes per segment.
//!
//! The pipeline is a forward chain: bars feed the [`DirectionMachine`], the
//! [`ChannelSegmenter`] cuts spans at confirmed reversals, and each span is
//! fitted by a [`ChannelFitter`].

pub mod direction;
pub mod fitter;
pub mod regression;
pub mod segmenter;

pub use direction::{directions, Direction, DirectionMachine, DirectionState};
pub use fitter::{ChannelConfig, ChannelFitter, ChannelSample, FittedChannel};
pub use regression::{LinearRegression, TrendLine};
pub use segmenter::{ChannelSegment, ChannelSegmenter};
