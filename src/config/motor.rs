//! Per-axis motor configuration from TOML.

use serde::Deserialize;

use super::units::{Amps, MmPerMinute};
use crate::motor::{Axis, Direction};

/// Allowed feed rate range for one axis and direction.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FeedRange {
    /// Slowest feed rate the axis is driven at.
    pub min: MmPerMinute,
    /// Fastest feed rate the axis is driven at.
    pub max: MmPerMinute,
}

impl FeedRange {
    /// Create a new feed range in mm/min.
    pub const fn new(min: f32, max: f32) -> Self {
        Self {
            min: MmPerMinute(min),
            max: MmPerMinute(max),
        }
    }

    /// Check if the range is positive and non-empty.
    pub fn is_valid(&self) -> bool {
        self.min.0 > 0.0 && self.min.0 <= self.max.0
    }

    /// Clamp a feed rate into the range.
    pub fn clamp(&self, feed_rate: f32) -> f32 {
        feed_rate.clamp(self.min.0, self.max.0)
    }
}

/// Motor configuration for one axis.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Current held while the axis is stationary.
    #[serde(rename = "idle_current_amps")]
    pub idle_current: Amps,

    /// Current driven while the axis is stepping.
    ///
    /// Ignored for the extruder, whose active current comes from calibration data.
    #[serde(rename = "active_current_amps")]
    pub active_current: Amps,

    /// Feed rate range (mm/min).
    pub feed: FeedRange,

    /// Feed rate range when moving in the negative direction, if it differs.
    #[serde(default)]
    pub reverse_feed: Option<FeedRange>,
}

impl AxisConfig {
    /// Feed rate range for a direction of travel.
    pub fn feed_range(&self, direction: Direction) -> FeedRange {
        match (direction, self.reverse_feed) {
            (Direction::Negative, Some(range)) => range,
            _ => self.feed,
        }
    }
}

/// Motor configuration for all four axes.
#[derive(Debug, Clone, Deserialize)]
pub struct AxesConfig {
    /// X axis.
    pub x: AxisConfig,
    /// Y axis.
    pub y: AxisConfig,
    /// Z axis.
    pub z: AxisConfig,
    /// Extruder.
    pub e: AxisConfig,
}

impl AxesConfig {
    /// Get the configuration of an axis.
    pub fn get(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
            Axis::E => &self.e,
        }
    }
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            x: AxisConfig {
                idle_current: Amps(0.692_018_8),
                active_current: Amps(0.723_004_7),
                feed: FeedRange::new(120.0, 4800.0),
                reverse_feed: None,
            },
            y: AxisConfig {
                idle_current: Amps(0.692_018_8),
                active_current: Amps(0.826_291_1),
                feed: FeedRange::new(120.0, 4800.0),
                reverse_feed: None,
            },
            z: AxisConfig {
                idle_current: Amps(0.196_244_13),
                active_current: Amps(0.650_704_2),
                feed: FeedRange::new(30.0, 60.0),
                reverse_feed: None,
            },
            e: AxisConfig {
                idle_current: Amps(0.299_530_5),
                active_current: Amps(0.6),
                feed: FeedRange::new(60.0, 600.0),
                reverse_feed: Some(FeedRange::new(60.0, 720.0)),
            },
        }
    }
}
