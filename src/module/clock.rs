//! Real-time / simulated-time clock.
//!
//! Simulated time advances as `sim = sim_prev + throttle * (real_now -
//! real_prev)`. Throttle 0 freezes the clock; only an explicit manual set
//! moves it. The previous-time fields are committed at the end of a
//! completed cycle, never mid-cycle, so a skipped cycle simply widens the
//! next cycle's real-time delta.

/// Read-only snapshot of the clock state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeState {
    pub real_now: f64,
    pub real_prev: f64,
    pub sim_current: f64,
    pub sim_prev: f64,
    pub throttle: f64,
    pub manual: bool,
}

#[derive(Debug)]
pub struct TimeController {
    state: TimeState,
}

impl TimeController {
    /// Start the clock at `now` (daynum), real and simulated aligned.
    pub fn new(now: f64, throttle: f64) -> Self {
        Self {
            state: TimeState {
                real_now: now,
                real_prev: now,
                sim_current: now,
                sim_prev: now,
                throttle,
                manual: throttle == 0.0,
            },
        }
    }

    /// Sample the wall clock and advance simulated time per the throttle.
    pub fn advance(&mut self, real_now: f64) {
        self.state.real_now = real_now;
        if self.state.throttle != 0.0 {
            let delta = self.state.throttle * (real_now - self.state.real_prev);
            self.state.sim_current = self.state.sim_prev + delta;
        }
        // throttle 0: sim_current only moves via set_manual
    }

    /// Commit the cycle: previous samples catch up with the current ones.
    pub fn commit(&mut self) {
        self.state.real_prev = self.state.real_now;
        self.state.sim_prev = self.state.sim_current;
    }

    /// Direct simulated-time override; effective only while frozen.
    pub fn set_manual(&mut self, sim_time: f64) {
        if self.state.throttle == 0.0 {
            self.state.sim_current = sim_time;
        }
    }

    pub fn set_throttle(&mut self, throttle: f64) {
        self.state.throttle = throttle;
        self.state.manual = throttle == 0.0;
    }

    pub fn sim_current(&self) -> f64 {
        self.state.sim_current
    }

    pub fn current(&self) -> TimeState {
        self.state
    }
}
