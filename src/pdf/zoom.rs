//! Custom zoom factor stepping

/// User-set zoom factor, used only in `ZoomMode::Custom`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    pub factor: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl Zoom {
    /// Zoom in rate multiplier per step - 10%
    pub const ZOOM_IN_RATE: f32 = 1.1;
    /// Zoom out rate divisor per step - 5%
    pub const ZOOM_OUT_RATE: f32 = 1.05;
    pub const MIN_SCALE: f32 = 0.05;
    pub const MAX_SCALE: f32 = 8.0;

    #[must_use]
    pub fn new(factor: f32) -> Self {
        Self {
            factor: Self::clamp_factor(factor),
        }
    }

    pub fn step_in(&mut self) {
        self.factor = Self::clamp_factor(self.factor * Self::ZOOM_IN_RATE);
    }

    pub fn step_out(&mut self) {
        self.factor = Self::clamp_factor(self.factor / Self::ZOOM_OUT_RATE);
    }

    /// Clamp factor to valid range, handling NaN/Inf
    #[must_use]
    pub fn clamp_factor(factor: f32) -> f32 {
        if factor.is_finite() {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        } else {
            1.0
        }
    }
}
