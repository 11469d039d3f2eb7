//! Host settings persistence
//!
//! A plain `key=value` file with `#` comments.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const DEFAULT_SAMPLE_RATE: f32 = 48000.0;
const DEFAULT_FFT_SIZE: usize = 2048;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub sample_rate: f32,
    /// Analyser window, a power of two
    pub fft_size: usize,
    /// Preset JSON applied at startup
    pub preset: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fft_size: DEFAULT_FFT_SIZE,
            preset: None,
        }
    }
}

impl AppConfig {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be read.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path()).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn save(&self) -> io::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quintet")
            .join("config.txt")
    }

    /// Where presets live unless configured otherwise
    pub fn preset_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quintet")
            .join("presets")
    }

    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "sample_rate" => {
                    if let Ok(rate) = value.parse::<f32>() {
                        if rate.is_finite() && rate > 0.0 {
                            config.sample_rate = rate;
                        }
                    }
                }
                "fft_size" => {
                    if let Ok(size) = value.parse::<usize>() {
                        if size.is_power_of_two() && size >= 32 {
                            config.fft_size = size;
                        }
                    }
                }
                "preset" => {
                    if !value.is_empty() {
                        config.preset = Some(PathBuf::from(value));
                    }
                }
                _ => {} // Ignore unknown keys
            }
        }

        config
    }

    fn serialize(&self) -> String {
        let mut lines = vec![
            "# Quintet Configuration".to_string(),
            format!("sample_rate={}", self.sample_rate),
            format!("fft_size={}", self.fft_size),
        ];
        if let Some(ref preset) = self.preset {
            lines.push(format!("preset={}", preset.display()));
        }
        lines.join("\n")
    }
}
