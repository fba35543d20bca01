//! Step delay and skip derivation.
//!
//! A move lasts `K` step-timer ticks. Each axis counts `delay` ticks per step
//! and suppresses `skips` extra ticks spread over the move with an error
//! accumulator, so an axis with `n` steps takes exactly `n * delay + skips = K`
//! ticks and every axis of a move finishes on the same tick.

use crate::config::units::Microsteps;
use crate::config::TimerConfig;

/// CPU cycles a move of `steps` microsteps needs at `feed_rate` (mm/min).
///
/// Floored at one step-timer period per step, the fastest the scheduler can
/// pulse.
pub fn movement_cycles(
    steps: u32,
    steps_per_mm: f32,
    microsteps: Microsteps,
    feed_rate: f32,
    timer: &TimerConfig,
) -> f64 {
    let n = steps as f64;
    let at_feed = n / steps_per_mm as f64 / microsteps.factor() as f64 / feed_rate as f64
        * 60.0
        * timer.cpu_hz as f64;
    let floor = n * timer.step_period as f64;

    // A zero feed rate or steps/mm produces inf or NaN; fall back to the floor
    if at_feed.is_finite() {
        at_feed.max(floor)
    } else {
        floor
    }
}

/// Per-axis scheduler parameters for one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepTiming {
    /// Steps to issue.
    pub steps: u32,
    /// Counted ticks per step.
    pub delay: u32,
    /// Extra ticks to suppress over the move.
    pub skips: u64,
    /// Counted ticks the skips are spread over.
    pub span: u64,
}

impl StepTiming {
    /// Timing that spreads `steps` over `cycles` CPU cycles.
    ///
    /// `cycles` should be the longest [`movement_cycles`] of every axis in the
    /// move.
    pub fn derive(steps: u32, cycles: f64, period: u32) -> Self {
        let n = steps.max(1) as u64;
        let ticks = libm::round(cycles / period.max(1) as f64);
        let ticks = if ticks.is_finite() && ticks > 0.0 {
            if ticks >= u64::MAX as f64 {
                u64::MAX
            } else {
                ticks as u64
            }
        } else {
            0
        };
        // Never faster than one step per tick
        let ticks = ticks.max(n);

        let delay = (ticks / n).clamp(1, u32::MAX as u64);
        let counted = n * delay;

        Self {
            steps: n as u32,
            delay: delay as u32,
            skips: ticks.saturating_sub(counted),
            span: counted - 1,
        }
    }

    /// Ticks from the start of the move to the last step.
    #[inline]
    pub fn total_ticks(&self) -> u64 {
        self.steps as u64 * self.delay as u64 + self.skips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fifty_millimeter_move() {
        let timer = TimerConfig {
            step_period: 256,
            ..TimerConfig::default()
        };
        let steps = (50.0f32 * 200.0 * 8.0) as u32;
        assert_eq!(steps, 80_000);

        // 50 mm at 1500 mm/min takes 2 s, 64e6 cycles at 32 MHz
        let cycles = movement_cycles(steps, 200.0, Microsteps::EIGHTH, 1500.0, &timer);
        assert!((cycles - 64_000_000.0).abs() < 1.0);

        let timing = StepTiming::derive(steps, cycles, timer.step_period);
        assert_eq!(timing.delay, 3);
        assert_eq!(timing.skips, 10_000);
        assert_eq!(timing.span, 239_999);
        assert_eq!(timing.total_ticks(), 250_000);
    }

    #[test]
    fn test_floor_at_one_period_per_step() {
        let timer = TimerConfig::default();
        let cycles = movement_cycles(80_000, 200.0, Microsteps::EIGHTH, 1500.0, &timer);

        assert_eq!(cycles, 80_000.0 * 1024.0);
        let timing = StepTiming::derive(80_000, cycles, timer.step_period);
        assert_eq!((timing.delay, timing.skips), (1, 0));
    }

    #[test]
    fn test_single_step() {
        let timing = StepTiming::derive(1, 1024.0, 1024);
        assert_eq!(timing, StepTiming { steps: 1, delay: 1, skips: 0, span: 0 });
    }

    proptest! {
        #[test]
        fn prop_axes_finish_together(
            feed_rate in 1.0f32..6000.0,
            a in 1u32..200_000,
            b in 1u32..200_000,
            steps_per_mm in 5.0f32..700.0,
        ) {
            let timer = TimerConfig::default();
            let cycles = movement_cycles(a, steps_per_mm, Microsteps::EIGHTH, feed_rate, &timer)
                .max(movement_cycles(b, steps_per_mm, Microsteps::EIGHTH, feed_rate, &timer));
            let period = timer.step_period as f64;

            let first = StepTiming::derive(a, cycles, timer.step_period);
            let second = StepTiming::derive(b, cycles, timer.step_period);

            prop_assert_eq!(first.total_ticks(), second.total_ticks());
            prop_assert!((first.total_ticks() as f64 * period - cycles).abs() <= period);
            prop_assert!(first.skips <= first.span || first.skips == 0);
        }
    }
}
