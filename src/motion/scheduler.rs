//! Interrupt-driven step pulse generation.
//!
//! [`StepScheduler::tick`] runs from the step timer interrupt. Each stepping
//! axis counts ticks up to its delay and pulses; suppressed ticks stretch the
//! axis so every axis of a move ends on the same tick.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use super::timing::StepTiming;
use crate::hal::StepOutputs;
use crate::motor::Axis;

/// Counters of one axis.
#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    remaining: u32,
    delay: u32,
    counter: u32,
    skips: u64,
    span: u64,
    accumulator: u64,
    skip_pending: bool,
}

impl Channel {
    /// Advance one tick. Returns whether a pulse is due.
    fn advance(&mut self) -> bool {
        if self.skip_pending {
            self.skip_pending = false;
            return false;
        }

        let mut pulse = false;
        self.counter += 1;
        if self.counter >= self.delay {
            self.counter = 0;
            self.remaining -= 1;
            pulse = true;
        }

        if self.skips > 0 {
            self.accumulator += self.skips;
            if self.accumulator >= self.span {
                self.accumulator -= self.span;
                self.skip_pending = true;
            }
        }
        pulse
    }
}

/// Per-axis step generator shared with the step timer interrupt.
pub struct StepScheduler {
    channels: Mutex<RefCell<[Channel; 4]>>,
    moving: [AtomicBool; 4],
}

impl StepScheduler {
    /// Scheduler with every axis idle.
    pub const fn new() -> Self {
        const IDLE: Channel = Channel {
            remaining: 0,
            delay: 1,
            counter: 0,
            skips: 0,
            span: 0,
            accumulator: 0,
            skip_pending: false,
        };
        const STOPPED: AtomicBool = AtomicBool::new(false);

        Self {
            channels: Mutex::new(RefCell::new([IDLE; 4])),
            moving: [STOPPED; 4],
        }
    }

    /// Start stepping an axis.
    ///
    /// Returns `false` and leaves the axis idle when there is nothing to step.
    pub fn arm(&self, axis: Axis, timing: StepTiming) -> bool {
        if timing.steps == 0 {
            return false;
        }

        critical_section::with(|cs| {
            self.channels.borrow_ref_mut(cs)[axis.index()] = Channel {
                remaining: timing.steps,
                delay: timing.delay.max(1),
                counter: 0,
                skips: timing.skips,
                span: timing.span,
                accumulator: 0,
                skip_pending: false,
            };
            self.moving[axis.index()].store(true, Ordering::Release);
        });
        true
    }

    /// Step timer interrupt handler.
    pub fn tick<O: StepOutputs>(&self, outputs: &mut O) {
        outputs.clear_all();

        critical_section::with(|cs| {
            let mut channels = self.channels.borrow_ref_mut(cs);
            for axis in Axis::ALL {
                let moving = &self.moving[axis.index()];
                if !moving.load(Ordering::Acquire) {
                    continue;
                }

                let channel = &mut channels[axis.index()];
                if channel.advance() {
                    outputs.pulse(axis);
                    if channel.remaining == 0 {
                        moving.store(false, Ordering::Release);
                    }
                }
            }
        });
    }

    /// Stop one axis, keeping its remaining step count.
    pub fn halt(&self, axis: Axis) {
        self.moving[axis.index()].store(false, Ordering::Release);
    }

    /// Stop every axis.
    pub fn stop_all(&self) {
        for moving in &self.moving {
            moving.store(false, Ordering::Release);
        }
    }

    /// Steps an axis has not issued yet.
    pub fn remaining_steps(&self, axis: Axis) -> u32 {
        critical_section::with(|cs| self.channels.borrow_ref(cs)[axis.index()].remaining)
    }

    /// Check if an axis is stepping.
    #[inline]
    pub fn is_moving(&self, axis: Axis) -> bool {
        self.moving[axis.index()].load(Ordering::Acquire)
    }

    /// Check if any axis is stepping.
    #[inline]
    pub fn any_moving(&self) -> bool {
        Axis::ALL.iter().any(|axis| self.is_moving(*axis))
    }
}

impl Default for StepScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        pulses: [u32; 4],
        last_pulse: [u64; 4],
        tick: u64,
    }

    impl StepOutputs for Counter {
        fn clear_all(&mut self) {
            self.tick += 1;
        }

        fn pulse(&mut self, axis: Axis) {
            self.pulses[axis.index()] += 1;
            self.last_pulse[axis.index()] = self.tick;
        }
    }

    fn run(scheduler: &StepScheduler, outputs: &mut Counter) {
        while scheduler.any_moving() {
            scheduler.tick(outputs);
        }
    }

    #[test]
    fn test_axes_finish_on_same_tick() {
        let scheduler = StepScheduler::new();
        let mut outputs = Counter::default();
        let cycles = 250_000.0 * 256.0;

        scheduler.arm(Axis::X, StepTiming::derive(80_000, cycles, 256));
        scheduler.arm(Axis::Y, StepTiming::derive(33_333, cycles, 256));
        run(&scheduler, &mut outputs);

        assert_eq!(outputs.pulses[0], 80_000);
        assert_eq!(outputs.pulses[1], 33_333);
        assert_eq!(outputs.last_pulse[0], 250_000);
        assert_eq!(outputs.last_pulse[1], 250_000);
    }

    #[test]
    fn test_halt_keeps_remaining() {
        let scheduler = StepScheduler::new();
        let mut outputs = Counter::default();
        scheduler.arm(Axis::Z, StepTiming::derive(100, 100.0 * 1024.0, 1024));

        for _ in 0..40 {
            scheduler.tick(&mut outputs);
        }
        scheduler.halt(Axis::Z);
        scheduler.tick(&mut outputs);

        assert!(!scheduler.any_moving());
        assert_eq!(scheduler.remaining_steps(Axis::Z), 60);
        assert_eq!(outputs.pulses[2], 40);
    }

    #[test]
    fn test_zero_steps_not_armed() {
        let scheduler = StepScheduler::new();
        let timing = StepTiming {
            steps: 0,
            delay: 1,
            skips: 0,
            span: 0,
        };

        assert!(!scheduler.arm(Axis::E, timing));
        assert!(!scheduler.is_moving(Axis::E));
    }
}
