//! Spectrum analyser tap
//!
//! The audio thread pushes a mono downmix into a lock-free queue; the UI
//! drains it into a [`SpectrumAnalyzer`] once per frame.

use quintet_analysis::{SpectrumAnalyzer, SpectrumError, SpectrumSettings};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Audio-thread side of the analyser
pub struct AnalyserTap {
    producer: HeapProd<f32>,
}

impl AnalyserTap {
    /// Push the mono downmix of one interleaved block
    pub fn process(&mut self, samples: &[f32], stride: usize) {
        if stride == 0 {
            return;
        }
        let scale = 1.0 / stride as f32;
        for frame in samples.chunks_exact(stride) {
            let mono = frame.iter().sum::<f32>() * scale;
            if self.producer.try_push(mono).is_err() {
                break;
            }
        }
    }
}

/// UI-thread spectrum source
pub struct Analyser {
    consumer: HeapCons<f32>,
    analyzer: SpectrumAnalyzer,
    scratch: Vec<f32>,
}

impl Analyser {
    /// Create a connected tap and analyser
    pub fn channel(
        sample_rate: f32,
        settings: SpectrumSettings,
    ) -> Result<(AnalyserTap, Analyser), SpectrumError> {
        let analyzer = SpectrumAnalyzer::new(sample_rate, settings)?;
        let (producer, consumer) = HeapRb::<f32>::new(settings.fft_size * 8).split();
        Ok((
            AnalyserTap { producer },
            Analyser {
                consumer,
                analyzer,
                scratch: vec![0.0; settings.fft_size],
            },
        ))
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.analyzer.frequency_bin_count()
    }

    pub fn bin_width(&self) -> f32 {
        self.analyzer.bin_width()
    }

    /// Fill `spectrum` with dBFS bins and return the bin width in Hz
    pub fn compute_spectrum(&mut self, spectrum: &mut [f32]) -> f32 {
        loop {
            let count = self.consumer.pop_slice(&mut self.scratch);
            if count == 0 {
                break;
            }
            self.analyzer.push(&self.scratch[..count]);
        }
        self.analyzer.frequency_data(spectrum);
        self.analyzer.bin_width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_feeds_analyser() {
        let settings = SpectrumSettings {
            smoothing: 0.0,
            ..Default::default()
        };
        let (mut tap, mut analyser) = Analyser::channel(48000.0, settings).unwrap();

        // stereo 1500 Hz sine, exactly bin 64
        let block: Vec<f32> = (0..2048)
            .flat_map(|i| {
                let s = (2.0 * std::f32::consts::PI * 1500.0 * i as f32 / 48000.0).sin();
                [s, s]
            })
            .collect();
        tap.process(&block, 2);

        let mut spectrum = vec![0.0; analyser.frequency_bin_count()];
        let bin_width = analyser.compute_spectrum(&mut spectrum);
        assert!((bin_width - 23.4375).abs() < 1e-6);
        assert!(spectrum[64] > spectrum[32]);
        assert!(spectrum[64] > -20.0);
    }

    #[test]
    fn test_silent_tap() {
        let (_tap, mut analyser) = Analyser::channel(48000.0, SpectrumSettings::default()).unwrap();
        let mut spectrum = vec![0.0; 1024];
        analyser.compute_spectrum(&mut spectrum);
        assert!(spectrum.iter().all(|&db| db == -72.0));
    }
}
