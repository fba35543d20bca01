//! Closed-loop extruder current regulation.
//!
//! The extruder driver's reference voltage is corrected against the measured
//! sense voltage while the extruder steps, so the phase current stays at its
//! target as the motor heats up.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::config::SensingConfig;
use crate::error::{MotorError, Result};
use crate::hal::{AdcInterlock, CurrentSense};
use crate::motor::{Axis, MotorDriver};

/// Extruder current regulator.
#[derive(Debug, Clone)]
pub struct CurrentRegulator {
    sample_count: u16,
    adc_reference_voltage: f32,
    adc_max: u16,
    settle_us: u32,
}

impl CurrentRegulator {
    /// Create a regulator from the sensing constants.
    pub fn new(sensing: &SensingConfig) -> Self {
        Self {
            sample_count: sensing.sample_count.max(1),
            adc_reference_voltage: sensing.adc_reference_voltage,
            adc_max: sensing.adc_max.max(1),
            settle_us: sensing.settle_us,
        }
    }

    /// Voltage measured for an averaged raw reading.
    #[inline]
    pub fn measured_voltage(&self, average: u16) -> f32 {
        self.adc_reference_voltage / self.adc_max as f32 * average as f32
    }

    /// Reference voltage that moves the measured voltage onto `target`.
    ///
    /// `ideal` is the voltage currently driven on the reference output.
    #[inline]
    pub fn corrected_voltage(&self, target: f32, ideal: f32, average: u16) -> f32 {
        target + ideal - self.measured_voltage(average)
    }

    /// Run one regulation step.
    ///
    /// Samples are taken with the temperature interrupt masked; it is
    /// unmasked again even when a conversion fails.
    pub fn regulate<DIR, VREF, EN, S, L, D>(
        &self,
        driver: &mut MotorDriver<DIR, VREF, EN>,
        sense: &mut S,
        interlock: &mut L,
        delay: &mut D,
        target: f32,
    ) -> Result<()>
    where
        DIR: OutputPin,
        VREF: SetDutyCycle,
        EN: OutputPin,
        S: CurrentSense,
        L: AdcInterlock,
        D: DelayNs,
    {
        interlock.lock();
        let sum = (0..self.sample_count).try_fold(0u32, |sum, _| {
            sense.read_sample().map(|sample| sum + sample as u32)
        });
        interlock.unlock();

        let sum = sum.map_err(|_| MotorError::SenseError)?;
        let average = (sum / self.sample_count as u32) as u16;

        let ideal = driver.voltage(Axis::E);
        driver.set_voltage(Axis::E, self.corrected_voltage(target, ideal, average))?;
        delay.delay_us(self.settle_us);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regulator() -> CurrentRegulator {
        CurrentRegulator::new(&SensingConfig {
            adc_reference_voltage: 2.0,
            adc_max: 4000,
            ..SensingConfig::default()
        })
    }

    #[test]
    fn test_on_target_keeps_voltage() {
        let regulator = regulator();
        // 0.3 V measured, 0.3 V driven, 0.3 V wanted
        let volts = regulator.corrected_voltage(0.3, 0.3, 600);
        assert!((volts - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_low_current_raises_reference() {
        let regulator = regulator();
        // 0.25 V measured against a 0.3 V target
        let volts = regulator.corrected_voltage(0.3, 0.3, 500);
        assert!((volts - 0.35).abs() < 1e-6);
    }
}
