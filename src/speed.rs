// Speed Module - Linear tick-delay ramp from a slow start to a fast steady state
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedRamp {
    initial: Duration,  // Delay at t = 0
    max: Duration,      // Delay once the ramp completes (the fastest speed)
    ramp: Duration,     // Time taken to go from initial to max
}

impl SpeedRamp {
    /// `max` is clamped to `initial` so the delay never grows over time
    pub fn new(initial: Duration, max: Duration, ramp: Duration) -> Self {
        SpeedRamp {
            initial,
            max: max.min(initial),
            ramp,
        }
    }

    pub fn from_millis(initial_ms: u64, max_ms: u64, ramp_ms: u64) -> Self {
        SpeedRamp::new(
            Duration::from_millis(initial_ms),
            Duration::from_millis(max_ms),
            Duration::from_millis(ramp_ms),
        )
    }

    #[cfg(test)]
    pub fn initial(&self) -> Duration {
        self.initial
    }

    #[cfg(test)]
    pub fn max(&self) -> Duration {
        self.max
    }

    #[cfg(test)]
    pub fn ramp(&self) -> Duration {
        self.ramp
    }

    /// Target tick delay after `elapsed` time in the round
    pub fn delay(&self, elapsed: Duration) -> Duration {
        if elapsed >= self.ramp {
            return self.max;
        }
        let progress = elapsed.as_secs_f64() / self.ramp.as_secs_f64();
        self.initial - (self.initial - self.max).mul_f64(progress)
    }

    /// Sleep left over once this tick's own work is accounted for
    pub fn sleep_budget(&self, elapsed: Duration, spent_this_tick: Duration) -> Duration {
        self.delay(elapsed).saturating_sub(spent_this_tick)
    }
}
