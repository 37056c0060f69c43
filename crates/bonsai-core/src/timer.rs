use crate::rng::{DeterministicRng, SplitMix64};

/// Restartable countdown advanced explicitly by the caller.
///
/// A fresh timer is done (no time left). `start` arms it with `interval` plus a uniform
/// offset in `[-deviation, deviation]`; `update` subtracts elapsed seconds and reports the
/// timeout edge. Each timer carries its own generator so deviations are reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub interval: f32,
    pub deviation: f32,
    pub auto_restart: bool,
    time_left: f32,
    rng: SplitMix64,
}

impl Timer {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            deviation: 0.0,
            auto_restart: false,
            time_left: 0.0,
            rng: SplitMix64::new(0),
        }
    }

    pub fn with_deviation(mut self, deviation: f32) -> Self {
        self.deviation = deviation.abs();
        self
    }

    pub fn with_auto_restart(mut self, auto_restart: bool) -> Self {
        self.auto_restart = auto_restart;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SplitMix64::new(seed);
        self
    }

    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn is_done(&self) -> bool {
        self.time_left <= 0.0
    }

    pub fn is_running(&self) -> bool {
        !self.is_done()
    }

    pub fn start(&mut self) {
        let offset = if self.deviation > 0.0 {
            self.deviation * self.rng.next_f32_signed()
        } else {
            0.0
        };
        self.time_left = (self.interval + offset).max(0.0);
    }

    pub fn stop(&mut self) {
        self.time_left = 0.0;
    }

    /// Advances the countdown. Returns `true` on the update that runs the timer out; with
    /// `auto_restart` the timer is re-armed in the same call.
    ///
    /// Updating a timer that is already done does nothing.
    pub fn update(&mut self, delta_seconds: f32) -> bool {
        if self.is_done() {
            return false;
        }

        self.time_left -= delta_seconds.max(0.0);
        if !self.is_done() {
            return false;
        }

        if self.auto_restart {
            self.start();
        }
        true
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_timer_is_done() {
        let timer = Timer::new(2.0);
        assert!(timer.is_done());
        assert!(!timer.is_running());
    }

    #[test]
    fn deviation_stays_within_bounds() {
        let mut timer = Timer::new(1.0).with_deviation(0.25).with_seed(11);
        for _ in 0..200 {
            timer.start();
            assert!((0.75..=1.25).contains(&timer.time_left()));
        }
    }
}
