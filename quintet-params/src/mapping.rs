//! Value mappings between typed values and the normalized `[0, 1]` range
//!
//! Every mapping is a bijection on its domain: `to_normalized` and
//! `from_normalized` are inverses, and `clamp` pulls arbitrary input back
//! into the valid domain.

/// Bidirectional mapping between a typed value and `[0, 1]`
pub trait ValueMapping<T> {
    /// Map a value to the normalized range
    fn to_normalized(&self, value: T) -> f64;

    /// Map a normalized position back to a value
    fn from_normalized(&self, normalized: f64) -> T;

    /// Pull a value into the valid domain
    fn clamp(&self, value: T) -> T;
}

/// Straight line between two bounds
///
/// `min` may be larger than `max`, which flips the direction (used for
/// screen axes where y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linear {
    min: f64,
    max: f64,
}

impl Linear {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl ValueMapping<f64> for Linear {
    fn to_normalized(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    fn from_normalized(&self, normalized: f64) -> f64 {
        self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min)
    }

    fn clamp(&self, value: f64) -> f64 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if value.is_nan() {
            return lo;
        }
        value.clamp(lo, hi)
    }
}

/// Linear mapping onto whole numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerLinear {
    min: i32,
    max: i32,
}

impl IntegerLinear {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

impl ValueMapping<i32> for IntegerLinear {
    fn to_normalized(&self, value: i32) -> f64 {
        let range = f64::from(self.max - self.min);
        if range == 0.0 {
            return 0.0;
        }
        (f64::from(value - self.min) / range).clamp(0.0, 1.0)
    }

    fn from_normalized(&self, normalized: f64) -> i32 {
        let range = f64::from(self.max - self.min);
        self.min + (normalized.clamp(0.0, 1.0) * range).round() as i32
    }

    fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

/// Logarithmic mapping for strictly positive ranges (frequencies, Q)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exponential {
    min: f64,
    max: f64,
    range: f64,
}

impl Exponential {
    /// Both bounds must be strictly positive
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            range: (max / min).ln(),
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl ValueMapping<f64> for Exponential {
    fn to_normalized(&self, value: f64) -> f64 {
        ((value / self.min).ln() / self.range).clamp(0.0, 1.0)
    }

    fn from_normalized(&self, normalized: f64) -> f64 {
        self.min * (normalized.clamp(0.0, 1.0) * self.range).exp()
    }

    fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

/// Two-state mapping, `true` from 0.5 upwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BooleanMapping;

impl ValueMapping<bool> for BooleanMapping {
    fn to_normalized(&self, value: bool) -> f64 {
        if value {
            1.0
        } else {
            0.0
        }
    }

    fn from_normalized(&self, normalized: f64) -> bool {
        normalized >= 0.5
    }

    fn clamp(&self, value: bool) -> bool {
        value
    }
}

/// Decibel fader curve
///
/// A rational curve `y = a - b / (x + c)` solved so that normalized
/// 0.5 lands on `mid` and 1.0 on `max`. Normalized 0 is true silence
/// (`-inf`), not `min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    min: f64,
    mid: f64,
    max: f64,
    a: f64,
    b: f64,
    c: f64,
}

impl Volume {
    pub fn new(min: f64, mid: f64, max: f64) -> Self {
        let denominator = min + max - 2.0 * mid;
        if denominator.abs() < f64::EPSILON {
            // mid sits halfway: the curve degenerates to a straight line
            return Self {
                min,
                mid,
                max,
                a: 0.0,
                b: 0.0,
                c: 0.0,
            };
        }

        let upper = max - mid;
        let a = ((2.0 * max - mid) * min - mid * max) / denominator;
        let b = (upper * min * min + (mid * mid - max * max) * min + mid * max * max
            - mid * mid * max)
            / (min * min + (2.0 * max - 4.0 * mid) * min + max * max - 4.0 * mid * max
                + 4.0 * mid * mid);
        let c = -upper / denominator;

        Self { min, mid, max, a, b, c }
    }

    /// Default master fader: -72 dB floor, 0 dB at half travel, +6 dB top
    pub fn fader() -> Self {
        Self::new(-72.0, 0.0, 6.0)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn mid(&self) -> f64 {
        self.mid
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn is_linear(&self) -> bool {
        self.a == 0.0 && self.b == 0.0 && self.c == 0.0
    }
}

impl ValueMapping<f64> for Volume {
    fn to_normalized(&self, value: f64) -> f64 {
        if value.is_nan() || value <= self.min {
            return 0.0;
        }
        if value >= self.max {
            return 1.0;
        }
        // calibration points are exact
        if value == self.mid {
            return 0.5;
        }
        if self.is_linear() {
            return (value - self.min) / (self.max - self.min);
        }
        (-self.b / (value - self.a) - self.c).clamp(0.0, 1.0)
    }

    fn from_normalized(&self, normalized: f64) -> f64 {
        if normalized.is_nan() || normalized <= 0.0 {
            return f64::NEG_INFINITY;
        }
        if normalized >= 1.0 {
            return self.max;
        }
        if normalized == 0.5 {
            return self.mid;
        }
        if self.is_linear() {
            return self.min + normalized * (self.max - self.min);
        }
        self.a - self.b / (normalized + self.c)
    }

    fn clamp(&self, value: f64) -> f64 {
        if value == f64::NEG_INFINITY {
            return value;
        }
        if value.is_nan() {
            return f64::NEG_INFINITY;
        }
        value.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tolerance: f64) {
        assert!((a - b).abs() <= tolerance, "{a} != {b} (tolerance {tolerance})");
    }

    #[test]
    fn test_linear_inverse() {
        let mapping = Linear::new(-18.0, 18.0);
        for i in 0..=20 {
            let x = i as f64 / 20.0;
            assert_close(mapping.to_normalized(mapping.from_normalized(x)), x, 1e-12);
        }
        assert_close(mapping.from_normalized(0.5), 0.0, 1e-12);
    }

    #[test]
    fn test_linear_reversed_axis() {
        let axis = Linear::new(40.0, -40.0);
        assert_close(axis.to_normalized(40.0), 0.0, 1e-12);
        assert_close(axis.to_normalized(-40.0), 1.0, 1e-12);
        assert_close(axis.to_normalized(0.0), 0.5, 1e-12);
        assert_eq!(axis.clamp(100.0), 40.0);
        assert_eq!(axis.clamp(-100.0), -40.0);
    }

    #[test]
    fn test_integer_exact_for_every_value() {
        let mapping = IntegerLinear::new(1, 4);
        for value in 1..=4 {
            assert_eq!(mapping.from_normalized(mapping.to_normalized(value)), value);
        }
        assert_eq!(mapping.from_normalized(0.2), 2);
        assert_eq!(mapping.clamp(9), 4);
        assert_eq!(mapping.clamp(-3), 1);
    }

    #[test]
    fn test_exponential_endpoints_and_midpoint() {
        let mapping = Exponential::new(20.0, 20000.0);
        assert_close(mapping.from_normalized(0.0), 20.0, 1e-9);
        assert_close(mapping.from_normalized(1.0), 20000.0, 1e-6);
        // geometric mean sits in the middle
        assert_close(mapping.from_normalized(0.5), (20.0f64 * 20000.0).sqrt(), 1e-6);
        for i in 0..=10 {
            let x = i as f64 / 10.0;
            assert_close(mapping.to_normalized(mapping.from_normalized(x)), x, 1e-12);
        }
    }

    #[test]
    fn test_exponential_clamps() {
        let mapping = Exponential::new(0.01, 10.0);
        assert_eq!(mapping.clamp(0.0), 0.01);
        assert_eq!(mapping.clamp(50.0), 10.0);
        assert_eq!(mapping.clamp(f64::NAN), 0.01);
    }

    #[test]
    fn test_boolean_threshold() {
        let mapping = BooleanMapping;
        assert!(!mapping.from_normalized(0.49));
        assert!(mapping.from_normalized(0.5));
        assert_eq!(mapping.to_normalized(true), 1.0);
        assert_eq!(mapping.to_normalized(false), 0.0);
    }

    #[test]
    fn test_volume_calibration_points() {
        let volume = Volume::new(-72.0, -12.0, 12.0);
        assert_eq!(volume.from_normalized(0.0), f64::NEG_INFINITY);
        assert_eq!(volume.from_normalized(0.5), -12.0);
        assert_eq!(volume.from_normalized(1.0), 12.0);
        assert_eq!(volume.to_normalized(-12.0), 0.5);
        assert_eq!(volume.to_normalized(f64::NEG_INFINITY), 0.0);
        assert_eq!(volume.to_normalized(12.0), 1.0);
    }

    #[test]
    fn test_volume_curve_is_continuous_near_calibration() {
        let volume = Volume::new(-72.0, -12.0, 12.0);
        // the closed form agrees with the exact calibration values
        let lower = volume.a - volume.b / (0.5 + volume.c);
        assert_close(lower, -12.0, 1e-9);
        let top = volume.a - volume.b / (1.0 + volume.c);
        assert_close(top, 12.0, 1e-9);
        // just above zero the curve starts near the floor
        let floor = volume.a - volume.b / volume.c;
        assert_close(floor, -72.0, 1e-9);
    }

    #[test]
    fn test_volume_inverse() {
        let volume = Volume::new(-72.0, 0.0, 6.0);
        for i in 1..20 {
            let x = i as f64 / 20.0;
            assert_close(volume.to_normalized(volume.from_normalized(x)), x, 1e-9);
        }
    }

    #[test]
    fn test_volume_is_monotonic() {
        let volume = Volume::fader();
        let mut last = f64::NEG_INFINITY;
        for i in 1..=100 {
            let y = volume.from_normalized(i as f64 / 100.0);
            assert!(y > last);
            last = y;
        }
    }

    #[test]
    fn test_volume_clamp_keeps_silence() {
        let volume = Volume::fader();
        assert_eq!(volume.clamp(f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(volume.clamp(-200.0), -72.0);
        assert_eq!(volume.clamp(40.0), 6.0);
    }

    #[test]
    fn test_volume_degenerate_linear() {
        let volume = Volume::new(-60.0, -30.0, 0.0);
        assert_close(volume.from_normalized(0.25), -45.0, 1e-12);
        assert_close(volume.to_normalized(-15.0), 0.75, 1e-12);
    }
}
