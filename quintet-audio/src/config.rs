//! Filter bank configuration

use quintet_analysis::SpectrumSettings;

use crate::gain::DEFAULT_INTERPOLATION_TIME;

/// Level meter timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterSettings {
    /// Sliding RMS window (seconds)
    pub rms_window: f64,
    /// Snapshots per second sent to the UI
    pub update_rate_hz: f64,
    /// Decay applied to the running maxima after each snapshot
    pub block_decay: f32,
    /// Decay applied per UI tick to displayed peaks and RMS
    pub release_decay: f32,
    /// How long a peak-hold marker stays up (ms)
    pub hold_ms: f64,
    /// Hold time after a clipping peak (ms)
    pub clip_hold_ms: f64,
}

impl Default for MeterSettings {
    fn default() -> Self {
        Self {
            rms_window: 0.050,
            update_rate_hz: 60.0,
            block_decay: 0.93,
            release_decay: 0.97,
            hold_ms: 1000.0,
            clip_hold_ms: 2000.0,
        }
    }
}

/// Everything a [`FilterBank`](crate::FilterBank) needs besides its backend
/// and preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BankConfig {
    /// Interleaved channel count of the processed signal
    pub channels: usize,
    /// Ramp length for every parameter change while running (seconds)
    pub interpolation_time: f64,
    pub analyser: SpectrumSettings,
    pub meter: MeterSettings,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            interpolation_time: DEFAULT_INTERPOLATION_TIME,
            analyser: SpectrumSettings::default(),
            meter: MeterSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BankConfig::default();
        assert_eq!(config.channels, 2);
        assert_eq!(config.interpolation_time, 0.005);
        assert_eq!(config.analyser.fft_size, 2048);
        assert_eq!(config.analyser.min_decibels, -72.0);
        assert_eq!(config.analyser.max_decibels, -9.0);
        assert_eq!(config.meter.update_rate_hz, 60.0);
        assert_eq!(config.meter.block_decay, 0.93);
    }
}
