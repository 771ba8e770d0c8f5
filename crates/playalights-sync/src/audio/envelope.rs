use embassy_time::{Duration, Instant};

/// Attack/decay envelope
///
/// Rises to a higher target at once and decays exponentially towards a
/// lower one with time constant `tau`, independent of the tick rate.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    value: f32,
    updated: Option<Instant>,
}

impl Envelope {
    pub const fn new(value: f32) -> Self {
        Self {
            value,
            updated: None,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Move towards `target` and return the new value
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, target: f32, now: Instant, tau: Duration) -> f32 {
        let elapsed = self
            .updated
            .map_or(Duration::from_ticks(0), |at| now.saturating_duration_since(at));
        self.updated = Some(now);

        if target >= self.value {
            self.value = target;
            return self.value;
        }

        let tau_us = tau.as_micros().max(1) as f32;
        let dt_us = elapsed.as_micros() as f32;
        let retain = libm::expf(-dt_us / tau_us);
        self.value = target + (self.value - target) * retain;
        self.value
    }

    /// Jump straight to `value`
    pub fn set(&mut self, value: f32, now: Instant) {
        self.value = value;
        self.updated = Some(now);
    }
}
