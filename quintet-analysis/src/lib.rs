//! Audio analysis for Quintet
//!
//! Provides the FFT spectrum analyzer behind the live spectrum display.

mod spectrum;

pub use spectrum::{SpectrumAnalyzer, SpectrumError, SpectrumSettings};
