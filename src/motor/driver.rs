//! Motor driver outputs.
//!
//! Generic over embedded-hal 1.0 pin and PWM types. Owns the direction pins,
//! the per-axis current reference outputs and the shared enable pin. Step
//! pulses are issued by the step scheduler, not here.

use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal::pwm::SetDutyCycle;

use crate::config::units::Amps;
use crate::config::{AxesConfig, SensingConfig};
use crate::error::{MotorError, Result};

use super::axis::{Axis, Direction};

/// Direction, current reference and enable outputs of the four drivers.
///
/// Generic over:
/// - `DIR`: direction pin type (must implement `OutputPin`)
/// - `VREF`: current reference output (must implement `SetDutyCycle`)
/// - `EN`: shared enable pin, active low (must implement `OutputPin`)
pub struct MotorDriver<DIR, VREF, EN>
where
    DIR: OutputPin,
    VREF: SetDutyCycle,
    EN: OutputPin,
{
    /// Direction pins in axis order.
    dir_pins: [DIR; 4],

    /// Current reference outputs in axis order.
    vref: [VREF; 4],

    /// Shared enable pin.
    enable_pin: EN,

    /// Current direction per axis (cached to avoid unnecessary pin writes).
    current_directions: [Option<Direction>; 4],

    /// Last duty cycle written per axis.
    duties: [u16; 4],

    /// Whether the drivers are enabled.
    enabled: bool,

    /// Idle and active currents.
    axes: AxesConfig,

    /// Current-to-voltage scaling.
    sensing: SensingConfig,
}

impl<DIR, VREF, EN> MotorDriver<DIR, VREF, EN>
where
    DIR: OutputPin,
    VREF: SetDutyCycle,
    EN: OutputPin,
{
    /// Create a driver with unknown directions and zeroed references.
    pub fn new(
        dir_pins: [DIR; 4],
        vref: [VREF; 4],
        enable_pin: EN,
        axes: AxesConfig,
        sensing: SensingConfig,
    ) -> Self {
        Self {
            dir_pins,
            vref,
            enable_pin,
            current_directions: [None; 4],
            duties: [0; 4],
            enabled: false,
            axes,
            sensing,
        }
    }

    /// Get the motor configuration.
    #[inline]
    pub fn axes(&self) -> &AxesConfig {
        &self.axes
    }

    /// Direction the pin of an axis was last driven to.
    #[inline]
    pub fn direction(&self, axis: Axis) -> Option<Direction> {
        self.current_directions[axis.index()]
    }

    /// Drive the direction pin of an axis.
    pub fn set_direction(&mut self, axis: Axis, direction: Direction) -> Result<()> {
        let index = axis.index();
        if self.current_directions[index] == Some(direction) {
            return Ok(());
        }

        let pin = &mut self.dir_pins[index];
        match axis.descriptor().level(direction) {
            PinState::High => pin.set_high(),
            PinState::Low => pin.set_low(),
        }
        .map_err(|_| MotorError::PinError)?;

        self.current_directions[index] = Some(direction);
        Ok(())
    }

    /// Duty cycle that produces `volts` on the reference output of an axis.
    pub fn duty_for_voltage(&self, axis: Axis, volts: f32) -> u16 {
        let max = self.vref[axis.index()].max_duty_cycle();
        let duty = libm::roundf(volts / self.sensing.mcu_voltage * max as f32);
        duty.clamp(0.0, max as f32) as u16
    }

    /// Voltage currently driven on the reference output of an axis.
    pub fn voltage(&self, axis: Axis) -> f32 {
        let index = axis.index();
        let max = self.vref[index].max_duty_cycle();
        if max == 0 {
            return 0.0;
        }
        self.duties[index] as f32 / max as f32 * self.sensing.mcu_voltage
    }

    /// Write a raw duty cycle to the reference output of an axis.
    pub fn set_duty(&mut self, axis: Axis, duty: u16) -> Result<()> {
        let index = axis.index();
        self.vref[index]
            .set_duty_cycle(duty)
            .map_err(|_| MotorError::PwmError)?;
        self.duties[index] = duty;
        Ok(())
    }

    /// Drive the reference output of an axis to a voltage.
    pub fn set_voltage(&mut self, axis: Axis, volts: f32) -> Result<()> {
        let duty = self.duty_for_voltage(axis, volts);
        self.set_duty(axis, duty)
    }

    /// Voltage that makes the driver regulate to `current`.
    #[inline]
    pub fn voltage_for(&self, current: Amps) -> f32 {
        current.value() * self.sensing.volts_per_amp
    }

    /// Set the motor current of an axis.
    pub fn set_current(&mut self, axis: Axis, current: Amps) -> Result<()> {
        self.set_voltage(axis, self.voltage_for(current))
    }

    /// Set the configured stepping current of an axis.
    pub fn set_active_current(&mut self, axis: Axis) -> Result<()> {
        self.set_current(axis, self.axes.get(axis).active_current)
    }

    /// Set the configured holding current of every axis.
    pub fn set_idle_currents(&mut self) -> Result<()> {
        for axis in Axis::ALL {
            self.set_current(axis, self.axes.get(axis).idle_current)?;
        }
        Ok(())
    }

    /// Whether the drivers are enabled.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable the drivers (enable pin low).
    pub fn enable(&mut self) -> Result<()> {
        self.enable_pin.set_low().map_err(|_| MotorError::PinError)?;
        self.enabled = true;
        Ok(())
    }

    /// Disable the drivers (enable pin high).
    pub fn disable(&mut self) -> Result<()> {
        self.enable_pin.set_high().map_err(|_| MotorError::PinError)?;
        self.enabled = false;
        Ok(())
    }
}
