//! Biquad filter cells
//!
//! Uses RBJ Audio EQ Cookbook formulas. Shelves use slope S = 1, pass
//! filters and the peaking filter take a linear Q.

use std::f64::consts::PI;

use super::automation::Automation;
use super::{AudioParamKind, FilterKind};

const DEFAULT_FREQUENCY: f64 = 350.0;
const DEFAULT_Q: f64 = 1.0;
const MIN_Q: f64 = 1.0e-4;

/// Normalized biquad coefficients (a0 = 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoeffs {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Design a cell; `frequency` is clamped to `[1 Hz, nyquist]`
    pub fn design(kind: FilterKind, frequency: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let nyquist = sample_rate * 0.5;
        let frequency = frequency.clamp(1.0, nyquist);
        let q = q.max(MIN_Q);

        let omega = 2.0 * PI * frequency / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();

        match kind {
            FilterKind::LowPass => {
                let alpha = sin_omega / (2.0 * q);
                Self::normalize(
                    (1.0 - cos_omega) / 2.0,
                    1.0 - cos_omega,
                    (1.0 - cos_omega) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_omega,
                    1.0 - alpha,
                )
            }
            FilterKind::HighPass => {
                let alpha = sin_omega / (2.0 * q);
                Self::normalize(
                    (1.0 + cos_omega) / 2.0,
                    -(1.0 + cos_omega),
                    (1.0 + cos_omega) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_omega,
                    1.0 - alpha,
                )
            }
            FilterKind::Peaking => {
                let a = 10.0f64.powf(gain_db / 40.0);
                let alpha = sin_omega / (2.0 * q);
                Self::normalize(
                    1.0 + alpha * a,
                    -2.0 * cos_omega,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_omega,
                    1.0 - alpha / a,
                )
            }
            FilterKind::LowShelf => {
                let a = 10.0f64.powf(gain_db / 40.0);
                let alpha = sin_omega / 2.0 * 2.0f64.sqrt(); // Slope = 1
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                Self::normalize(
                    a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                    a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                    (a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha,
                )
            }
            FilterKind::HighShelf => {
                let a = 10.0f64.powf(gain_db / 40.0);
                let alpha = sin_omega / 2.0 * 2.0f64.sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                Self::normalize(
                    a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                    a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                    (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
                )
            }
        }
    }

    fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Linear magnitude and phase (radians) at `frequency`
    ///
    /// Frequencies outside `[0, nyquist]` yield NaN.
    pub fn response(&self, frequency: f64, sample_rate: f64) -> (f64, f64) {
        if !(0.0..=sample_rate * 0.5).contains(&frequency) {
            return (f64::NAN, f64::NAN);
        }
        let omega = 2.0 * PI * frequency / sample_rate;
        // z^-1 and z^-2 on the unit circle
        let (s1, c1) = (-omega).sin_cos();
        let (s2, c2) = (-2.0 * omega).sin_cos();

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = self.b1 * s1 + self.b2 * s2;
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = self.a1 * s1 + self.a2 * s2;

        let den_norm = den_re * den_re + den_im * den_im;
        let re = (num_re * den_re + num_im * den_im) / den_norm;
        let im = (num_im * den_re - num_re * den_im) / den_norm;

        ((re * re + im * im).sqrt(), im.atan2(re))
    }
}

/// Biquad filter state for a single channel
#[derive(Debug, Default, Clone, Copy)]
pub struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    pub fn process(&mut self, input: f32, coeffs: &BiquadCoeffs) -> f32 {
        let input = f64::from(input);
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output as f32
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Automated settings of one filter cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub kind: FilterKind,
    pub frequency: Automation,
    pub q: Automation,
    pub gain: Automation,
}

impl FilterParams {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            frequency: Automation::new(DEFAULT_FREQUENCY),
            q: Automation::new(DEFAULT_Q),
            gain: Automation::new(0.0),
        }
    }

    pub fn automation_mut(&mut self, kind: AudioParamKind) -> Option<&mut Automation> {
        match kind {
            AudioParamKind::Frequency => Some(&mut self.frequency),
            AudioParamKind::Q => Some(&mut self.q),
            AudioParamKind::FilterGain => Some(&mut self.gain),
            AudioParamKind::Gain => None,
        }
    }

    /// Coefficients for the settings in effect at `time`
    pub fn design_at(&self, time: f64, sample_rate: f64) -> BiquadCoeffs {
        BiquadCoeffs::design(
            self.kind,
            self.frequency.value_at(time),
            self.q.value_at(time),
            self.gain.value_at(time),
            sample_rate,
        )
    }

    /// Coefficients for the most recently scheduled targets
    pub fn design_target(&self, sample_rate: f64) -> BiquadCoeffs {
        BiquadCoeffs::design(
            self.kind,
            self.frequency.target(),
            self.q.target(),
            self.gain.target(),
            sample_rate,
        )
    }

    pub fn is_settled(&self, time: f64) -> bool {
        self.frequency.is_settled(time) && self.q.is_settled(time) && self.gain.is_settled(time)
    }
}
