//! Declared parameter ranges.
//!
//! Every scalar block parameter has a [`ParamRange`]. Setters clamp into the
//! range; callers that need to know whether a value was out of range use
//! [`ParamRange::clamp_checked`] and report it to [`Diagnostics`](crate::Diagnostics).

/// Inclusive range and default for a scalar parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamRange {
    /// Smallest accepted value.
    pub min: f32,
    /// Largest accepted value.
    pub max: f32,
    /// Value after construction or reset.
    pub default: f32,
}

impl ParamRange {
    /// Create a range. `min` must not exceed `max`.
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    /// Clamp `value` into the range. NaN maps to the default.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Clamp `value` and report whether it had to change.
    #[inline]
    pub fn clamp_checked(&self, value: f32) -> (f32, bool) {
        let clamped = self.clamp(value);
        (clamped, clamped != value)
    }

    /// Whether `value` lies inside the range.
    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}
