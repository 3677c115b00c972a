//! Voltage-controlled amplifier.
//!
//! `output = gain_eff · input`, with `gain_eff` derived from the base gain
//! and the control input according to [`AmpResponse`], then clamped to
//! `[0, gain_max]`.

use libm::{expf, logf};

use crate::param::ParamRange;

/// Exponent scale for [`AmpResponse::Exponential`]: one unit of CV spans 60 dB.
pub const EXPONENTIAL_K: f32 = 6.907_755;

/// How the control input shapes the gain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AmpResponse {
    /// `gain · cv · sens`
    #[default]
    Linear,
    /// `gain · exp(cv · sens · k)`
    Exponential,
    /// `gain · ln(1 + (e − 1) · cv · sens)`
    Logarithmic,
}

impl AmpResponse {
    /// Every response, in index order.
    pub const ALL: [AmpResponse; 3] = [
        AmpResponse::Linear,
        AmpResponse::Exponential,
        AmpResponse::Logarithmic,
    ];

    /// Numeric index used by preset files.
    pub fn index(self) -> u8 {
        match self {
            AmpResponse::Linear => 0,
            AmpResponse::Exponential => 1,
            AmpResponse::Logarithmic => 2,
        }
    }

    /// Response for a preset index, if known.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Gain stage driven by a control voltage.
///
/// ## Parameters
///
/// - `gain`: base gain (0 to 4, default 1)
/// - `cv_sensitivity`: scale of the control input (0 to 4, default 1)
/// - `gain_max`: upper bound on the effective gain (0 to 4, default 2)
#[derive(Debug, Clone)]
pub struct Amplifier {
    response: AmpResponse,
    gain: f32,
    cv_sensitivity: f32,
    gain_max: f32,
}

impl Default for Amplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Amplifier {
    /// Range of [`set_gain`](Self::set_gain).
    pub const GAIN: ParamRange = ParamRange::new(0.0, 4.0, 1.0);
    /// Range of [`set_cv_sensitivity`](Self::set_cv_sensitivity).
    pub const CV_SENSITIVITY: ParamRange = ParamRange::new(0.0, 4.0, 1.0);
    /// Range of [`set_gain_max`](Self::set_gain_max).
    pub const GAIN_MAX: ParamRange = ParamRange::new(0.0, 4.0, 2.0);

    /// Create a linear amplifier at unit gain.
    pub fn new() -> Self {
        Self {
            response: AmpResponse::Linear,
            gain: Self::GAIN.default,
            cv_sensitivity: Self::CV_SENSITIVITY.default,
            gain_max: Self::GAIN_MAX.default,
        }
    }

    /// Select the response curve.
    pub fn set_response(&mut self, response: AmpResponse) {
        self.response = response;
    }

    /// Current response curve.
    pub fn response(&self) -> AmpResponse {
        self.response
    }

    /// Set the base gain.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = Self::GAIN.clamp(gain);
    }

    /// Base gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Set the CV sensitivity.
    pub fn set_cv_sensitivity(&mut self, sensitivity: f32) {
        self.cv_sensitivity = Self::CV_SENSITIVITY.clamp(sensitivity);
    }

    /// CV sensitivity.
    pub fn cv_sensitivity(&self) -> f32 {
        self.cv_sensitivity
    }

    /// Set the maximum effective gain.
    pub fn set_gain_max(&mut self, gain_max: f32) {
        self.gain_max = Self::GAIN_MAX.clamp(gain_max);
    }

    /// Maximum effective gain.
    pub fn gain_max(&self) -> f32 {
        self.gain_max
    }

    /// Gain applied for control input `cv`, in [0, gain_max].
    #[inline]
    pub fn effective_gain(&self, cv: f32) -> f32 {
        let x = cv * self.cv_sensitivity;
        let g = match self.response {
            AmpResponse::Linear => self.gain * x,
            AmpResponse::Exponential => self.gain * expf(x * EXPONENTIAL_K),
            AmpResponse::Logarithmic => {
                self.gain * logf(1.0 + (core::f32::consts::E - 1.0) * x.max(0.0))
            }
        };
        if g.is_finite() {
            g.clamp(0.0, self.gain_max)
        } else {
            self.gain_max
        }
    }

    /// Amplify one sample.
    #[inline]
    pub fn tick(&mut self, input: f32, cv: f32) -> f32 {
        self.effective_gain(cv) * input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_follows_cv() {
        let amp = Amplifier::new();
        assert_eq!(amp.effective_gain(0.0), 0.0);
        assert!((amp.effective_gain(0.5) - 0.5).abs() < 1e-6);
        assert!((amp.effective_gain(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn exponential_unit_at_zero_cv() {
        let mut amp = Amplifier::new();
        amp.set_response(AmpResponse::Exponential);
        assert!((amp.effective_gain(0.0) - 1.0).abs() < 1e-6);
        // -1 unit of CV is -60 dB.
        assert!((amp.effective_gain(-1.0) - 0.001).abs() < 1e-5);
    }

    #[test]
    fn logarithmic_endpoints() {
        let mut amp = Amplifier::new();
        amp.set_response(AmpResponse::Logarithmic);
        assert_eq!(amp.effective_gain(0.0), 0.0);
        assert!((amp.effective_gain(1.0) - 1.0).abs() < 1e-5);
        assert_eq!(amp.effective_gain(-1.0), 0.0);
    }

    #[test]
    fn gain_is_clamped_to_max() {
        let mut amp = Amplifier::new();
        amp.set_gain(4.0);
        amp.set_gain_max(1.5);
        assert_eq!(amp.effective_gain(1.0), 1.5);
        amp.set_response(AmpResponse::Exponential);
        assert_eq!(amp.effective_gain(3.0), 1.5);
    }

    #[test]
    fn tick_scales_input() {
        let mut amp = Amplifier::new();
        amp.set_gain(0.5);
        assert!((amp.tick(0.8, 1.0) - 0.4).abs() < 1e-6);
    }
}
