//! Decibel conversions and gain constants

use std::f64::consts::LN_10;

/// Floor used instead of a hard zero for switched-off paths (-192 dB)
pub const SILENCE_GAIN: f64 = 2.511_886_431_509_578_4e-10;

/// Length of every click-free parameter ramp (seconds)
pub const DEFAULT_INTERPOLATION_TIME: f64 = 0.005;

/// Convert decibels to linear gain; `-inf` maps to 0
#[inline]
pub fn db_to_gain(db: f64) -> f64 {
    (db * LN_10 / 20.0).exp()
}

/// Convert linear gain to decibels; 0 maps to `-inf`
#[inline]
pub fn gain_to_db(gain: f64) -> f64 {
    gain.ln() * 20.0 / LN_10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_gain_matches_floor() {
        assert!((SILENCE_GAIN - db_to_gain(-192.0)).abs() < 1e-22);
        assert!((gain_to_db(SILENCE_GAIN) + 192.0).abs() < 1e-9);
    }

    #[test]
    fn test_conversions() {
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-12);
        assert!((db_to_gain(-6.0) - 0.501_187).abs() < 1e-6);
        assert!((gain_to_db(2.0) - 6.020_6).abs() < 1e-4);
        assert_eq!(db_to_gain(f64::NEG_INFINITY), 0.0);
        assert_eq!(gain_to_db(0.0), f64::NEG_INFINITY);
    }
}
