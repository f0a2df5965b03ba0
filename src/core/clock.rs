/// Physical-tick counter.
pub type Tick = u64;

/// Accumulates physical step time until a control interval has elapsed.
///
/// `advance` returns the accumulated time (which may overshoot the interval
/// by up to one physical step) when a control decision is due, and resets.
#[derive(Clone, Copy, Debug)]
pub struct ControlClock {
    interval: f64,
    elapsed: f64,
}

impl ControlClock {
    pub fn new(interval: f64) -> Self {
        Self {
            interval: interval.max(0.0),
            elapsed: 0.0,
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn advance(&mut self, dt: f64) -> Option<f64> {
        self.elapsed += dt.max(0.0);
        if self.elapsed >= self.interval {
            let due = self.elapsed;
            self.elapsed = 0.0;
            Some(due)
        } else {
            None
        }
    }
}
