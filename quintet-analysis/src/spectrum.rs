//! FFT-based spectrum analyzer for real-time visualization
//!
//! Keeps the most recent `fft_size` samples, windows them with a Blackman
//! window and reports `fft_size / 2` smoothed bins in dBFS.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;
use thiserror::Error;

/// Analyzer configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumSettings {
    /// FFT length, a power of two between 32 and 32768
    pub fft_size: usize,
    /// Floor of the reported range (dBFS)
    pub min_decibels: f32,
    /// Ceiling of the reported range (dBFS)
    pub max_decibels: f32,
    /// Averaging constant across frames (0 = none, towards 1 = slow)
    pub smoothing: f32,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            min_decibels: -72.0,
            max_decibels: -9.0,
            smoothing: 0.8,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpectrumError {
    #[error("FFT size {0} is not a power of two between 32 and 32768")]
    InvalidFftSize(usize),
}

/// Real-time FFT spectrum analyzer
pub struct SpectrumAnalyzer {
    sample_rate: f32,
    settings: SpectrumSettings,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    /// Circular sample history, `write_pos` is the oldest sample
    history: Vec<f32>,
    write_pos: usize,
    /// Pre-allocated FFT buffer to avoid allocation per frame
    fft_buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: f32, settings: SpectrumSettings) -> Result<Self, SpectrumError> {
        let fft_size = settings.fft_size;
        if !fft_size.is_power_of_two() || !(32..=32768).contains(&fft_size) {
            return Err(SpectrumError::InvalidFftSize(fft_size));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Blackman window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / fft_size as f32;
                0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
            })
            .collect();

        tracing::debug!(fft_size, sample_rate, "spectrum analyzer created");

        Ok(Self {
            sample_rate,
            settings,
            fft,
            window,
            history: vec![0.0; fft_size],
            write_pos: 0,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
        })
    }

    pub fn settings(&self) -> &SpectrumSettings {
        &self.settings
    }

    /// Number of bins reported by [`frequency_data`](Self::frequency_data)
    pub fn frequency_bin_count(&self) -> usize {
        self.settings.fft_size / 2
    }

    /// Width of one bin in Hz
    pub fn bin_width(&self) -> f32 {
        self.sample_rate / self.settings.fft_size as f32
    }

    /// Append mono samples to the history
    pub fn push(&mut self, samples: &[f32]) {
        let len = self.history.len();
        for &sample in samples {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % len;
        }
    }

    /// Analyze the current history into `spectrum` (dBFS per bin)
    ///
    /// Fills at most `frequency_bin_count()` values; each call advances the
    /// smoothing by one frame.
    pub fn frequency_data(&mut self, spectrum: &mut [f32]) {
        let len = self.history.len();
        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            let sample = self.history[(self.write_pos + i) % len];
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let scale = 1.0 / len as f32;
        let tau = self.settings.smoothing.clamp(0.0, 1.0);
        let (min_db, max_db) = (self.settings.min_decibels, self.settings.max_decibels);

        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.fft_buffer[k].norm() * scale;
            let mut value = tau * *smoothed + (1.0 - tau) * magnitude;
            if !value.is_finite() {
                value = 0.0;
            }
            *smoothed = value;

            if let Some(out) = spectrum.get_mut(k) {
                *out = (20.0 * value.log10()).clamp(min_db, max_db);
            }
        }
    }

    /// Clear history and smoothing state
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.smoothed.fill(0.0);
        self.write_pos = 0;
    }
}
