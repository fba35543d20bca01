//! Machine configuration - root configuration structure.

use serde::Deserialize;

use super::limits::BedEnvelope;
use super::motor::AxesConfig;
use super::units::{Millimeters, Microsteps, MmPerMinute};

/// Root configuration structure from TOML.
///
/// Every section has defaults matching the stock board, so an empty document
/// is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Timer clocks and periods.
    pub timer: TimerConfig,

    /// Microstep divisor the drivers are strapped to.
    pub microsteps: Microsteps,

    /// Bed geometry and reachable envelope.
    pub bed: BedConfig,

    /// Per-axis motor currents and feed rate ranges.
    pub axes: AxesConfig,

    /// Fixed feed rates and segmentation length.
    pub feeds: FeedsConfig,

    /// Extruder current-sense electrical constants.
    pub sensing: SensingConfig,

    /// Accelerometer detection thresholds for homing and Z-touch.
    pub detection: DetectionConfig,

    /// Calibration values written to blank storage.
    pub factory: FactoryConfig,
}

/// Timer clocks and periods.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// CPU clock feeding the step timer, in Hz.
    pub cpu_hz: u32,

    /// Step timer period in CPU cycles (one tick).
    pub step_period: u32,

    /// Rate of the autosave timer interrupt, in Hz.
    pub autosave_hz: u32,

    /// Interval between two autosave field writes, in milliseconds.
    pub autosave_interval_ms: u32,
}

impl TimerConfig {
    /// Number of autosave interrupts between two field saves (at least one).
    pub fn autosave_ticks(&self) -> u32 {
        (self.autosave_hz as u64 * self.autosave_interval_ms as u64 / 1000).max(1) as u32
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            cpu_hz: 32_000_000,
            step_period: 1024,
            autosave_hz: 1000,
            autosave_interval_ms: 200,
        }
    }
}

/// Bed geometry and reachable envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BedConfig {
    /// X coordinate of the bed center.
    pub center_x: Millimeters,

    /// Y coordinate of the bed center.
    pub center_y: Millimeters,

    /// Distance from the center to the calibration corners along X and Y.
    pub calibration_distance: Millimeters,

    /// X distance from the homing hard stop back to the bed center.
    pub home_to_center_x: Millimeters,

    /// Y distance from the homing hard stop back to the bed center.
    pub home_to_center_y: Millimeters,

    /// Extra travel beyond the envelope when driving into the hard stop.
    pub homing_overshoot: Millimeters,

    /// Z-dependent X/Y soft limits.
    pub envelope: BedEnvelope,
}

impl Default for BedConfig {
    fn default() -> Self {
        Self {
            center_x: Millimeters(54.0),
            center_y: Millimeters(50.0),
            calibration_distance: Millimeters(45.0),
            home_to_center_x: Millimeters(55.0),
            home_to_center_y: Millimeters(55.0),
            homing_overshoot: Millimeters(8.0),
            envelope: BedEnvelope::default(),
        }
    }
}

/// Fixed feed rates and segmentation length.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// Feed rate used while driving into the homing hard stops.
    pub homing: MmPerMinute,

    /// Feed rate used while lowering Z onto the bed.
    pub z_touch: MmPerMinute,

    /// Horizontal length of one sub-move.
    pub segment_length: Millimeters,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            homing: MmPerMinute(1500.0),
            z_touch: MmPerMinute(17.0),
            segment_length: Millimeters(2.0),
        }
    }
}

/// Extruder current-sense electrical constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensingConfig {
    /// Driver reference voltage per amp of phase current.
    pub volts_per_amp: f32,

    /// Supply voltage of the reference PWM outputs.
    pub mcu_voltage: f32,

    /// ADC reference voltage.
    pub adc_reference_voltage: f32,

    /// Full-scale ADC reading.
    pub adc_max: u16,

    /// Samples averaged per regulation step.
    pub sample_count: u16,

    /// Settling time after each current change, in microseconds.
    pub settle_us: u32,
}

impl Default for SensingConfig {
    fn default() -> Self {
        Self {
            volts_per_amp: 0.5,
            mcu_voltage: 3.3,
            adc_reference_voltage: 2.0625,
            adc_max: 4095,
            sample_count: 50,
            settle_us: 500,
        }
    }
}

/// Accelerometer detection thresholds for homing and Z-touch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Homing jerk threshold before the stored sensitivity is subtracted.
    pub jerk_max: u8,

    /// Lateral deviation from the still sample that signals bed contact.
    pub tilt_threshold: i16,

    /// Consecutive over-threshold samples required to stop an axis.
    pub consecutive_samples: u8,

    /// Two touch heights closer than this agree.
    pub z_agreement: Millimeters,

    /// Consecutive agreeing touches that end the search.
    pub z_agreements_required: u8,

    /// Lift between two touch attempts.
    pub z_retract: Millimeters,

    /// Settling time before the still sample, in milliseconds.
    pub still_settle_ms: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            jerk_max: 255,
            tilt_threshold: 40,
            consecutive_samples: 2,
            z_agreement: Millimeters(1.0),
            z_agreements_required: 2,
            z_retract: Millimeters(2.0),
            still_settle_ms: 100,
        }
    }
}

/// Calibration values written to blank storage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Steps per millimeter for X, Y, Z and E (full steps).
    pub steps_per_mm: [f32; 4],

    /// Speed limits for X, Y, Z, E extrude and E retract (mm/min).
    pub speed_limits: [f32; 5],

    /// Backlash along X.
    pub backlash_x: Millimeters,

    /// Backlash along Y.
    pub backlash_y: Millimeters,

    /// Feed rate of the backlash take-up move.
    pub backlash_speed: MmPerMinute,

    /// Extruder active current in milliamps.
    pub extruder_current_ma: u16,

    /// Homing jerk sensitivity for X and Y.
    pub jerk_sensitivity: [u8; 2],

    /// Offset between the detected touch height and the true bed surface.
    pub z0_correction: Millimeters,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            steps_per_mm: [19.306_787, 18.0, 646.3125, 128.451_37],
            speed_limits: [1500.0, 1500.0, 60.0, 102.0, 360.0],
            backlash_x: Millimeters(0.3),
            backlash_y: Millimeters(0.6),
            backlash_speed: MmPerMinute(1500.0),
            extruder_current_ma: 500,
            jerk_sensitivity: [195, 195],
            z0_correction: Millimeters(0.0),
        }
    }
}
