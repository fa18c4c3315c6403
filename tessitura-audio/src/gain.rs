/// A smoothed gain value following `setTargetAtTime` semantics: after a
/// target is set, the value approaches it exponentially with the given time
/// constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainParam {
    value: f32,
    target: f32,
    time_constant: f32,
}

impl GainParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            target: value,
            time_constant: 0.0,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn set_target_at_time(&mut self, target: f32, time_constant: f32) {
        self.target = target;
        self.time_constant = time_constant.max(0.0);
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.target = value;
    }

    /// Advance by `dt` seconds and return the new value.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.time_constant <= 0.0 {
            self.value = self.target;
        } else {
            let k = (-dt / self.time_constant).exp();
            self.value = self.target + (self.value - self.target) * k;
            if (self.value - self.target).abs() < 1e-6 {
                self.value = self.target;
            }
        }
        self.value
    }
}

impl Default for GainParam {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Fade envelope for a take of `total` seconds: linear ramp up over
/// `fade_in`, linear ramp down over the last `fade_out`, silent from `total`
/// on. Always within `[0, 1]`.
pub fn fade_factor(elapsed: f64, total: f64, fade_in: f64, fade_out: f64) -> f32 {
    if elapsed >= total {
        return 0.0;
    }
    let mut factor = 1.0_f64;
    if fade_in > 0.0 && elapsed < fade_in {
        factor = elapsed / fade_in;
    } else if fade_out > 0.0 && elapsed > total - fade_out {
        factor = (total - elapsed) / fade_out;
    }
    factor.clamp(0.0, 1.0) as f32
}
