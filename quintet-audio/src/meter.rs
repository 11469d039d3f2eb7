//! Level metering
//!
//! [`MeterTap`] runs on the audio thread and pushes [`MeterSnapshot`]s into a
//! lock-free queue; [`PeakMeter`] drains them on the UI side and adds peak
//! hold and release.

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::config::MeterSettings;

/// Upper bound on metered channels
pub const MAX_METER_CHANNELS: usize = 8;

/// Snapshots buffered between UI frames
const SNAPSHOT_QUEUE: usize = 32;

/// Peak and RMS maxima per channel since the previous snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    pub channels: usize,
    pub peak: [f32; MAX_METER_CHANNELS],
    pub rms: [f32; MAX_METER_CHANNELS],
}

impl MeterSnapshot {
    pub fn peaks(&self) -> &[f32] {
        &self.peak[..self.channels]
    }

    pub fn rms_values(&self) -> &[f32] {
        &self.rms[..self.channels]
    }
}

/// Sliding mean of squares over a fixed window
struct RmsWindow {
    squares: Vec<f32>,
    sum: f64,
    index: usize,
    scale: f64,
}

impl RmsWindow {
    fn new(len: usize) -> Self {
        let len = len.max(1);
        Self {
            squares: vec![0.0; len],
            sum: 0.0,
            index: 0,
            scale: 1.0 / len as f64,
        }
    }

    #[inline]
    fn push_pop(&mut self, square: f32) -> f32 {
        self.sum += f64::from(square) - f64::from(self.squares[self.index]);
        self.squares[self.index] = square;
        self.index = (self.index + 1) % self.squares.len();
        (self.sum.max(0.0) * self.scale).sqrt() as f32
    }

    fn reset(&mut self) {
        self.squares.fill(0.0);
        self.sum = 0.0;
        self.index = 0;
    }
}

/// Audio-thread side of the meter
pub struct MeterTap {
    channels: usize,
    windows: Vec<RmsWindow>,
    max_peak: [f32; MAX_METER_CHANNELS],
    max_rms: [f32; MAX_METER_CHANNELS],
    update_every: usize,
    counter: usize,
    decay: f32,
    producer: HeapProd<MeterSnapshot>,
}

impl MeterTap {
    /// Create a connected tap and receiver
    pub fn channel(
        sample_rate: f32,
        channels: usize,
        settings: &MeterSettings,
    ) -> (MeterTap, MeterReceiver) {
        let channels = channels.clamp(1, MAX_METER_CHANNELS);
        let (producer, consumer) = HeapRb::<MeterSnapshot>::new(SNAPSHOT_QUEUE).split();
        let window = (f64::from(sample_rate) * settings.rms_window).round() as usize;
        let update_every = (f64::from(sample_rate) / settings.update_rate_hz).round().max(1.0) as usize;

        let tap = MeterTap {
            channels,
            windows: (0..channels).map(|_| RmsWindow::new(window)).collect(),
            max_peak: [0.0; MAX_METER_CHANNELS],
            max_rms: [0.0; MAX_METER_CHANNELS],
            update_every,
            counter: 0,
            decay: settings.block_decay,
            producer,
        };
        (tap, MeterReceiver { consumer, channels })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Measure one interleaved block
    ///
    /// `stride` is the channel count of the block; channels beyond the
    /// metered count are ignored.
    pub fn process(&mut self, samples: &[f32], stride: usize) {
        if stride == 0 {
            return;
        }
        let metered = self.channels.min(stride);
        let mut frames = 0;
        for frame in samples.chunks_exact(stride) {
            for (ch, &sample) in frame.iter().take(metered).enumerate() {
                let peak = sample.abs();
                if peak > self.max_peak[ch] {
                    self.max_peak[ch] = peak;
                }
                let rms = self.windows[ch].push_pop(sample * sample);
                if rms > self.max_rms[ch] {
                    self.max_rms[ch] = rms;
                }
            }
            frames += 1;
        }

        self.counter += frames;
        if self.counter >= self.update_every {
            self.counter -= self.update_every;
            let snapshot = MeterSnapshot {
                channels: self.channels,
                peak: self.max_peak,
                rms: self.max_rms,
            };
            // A full queue means the UI is behind; it only needs the latest.
            let _ = self.producer.try_push(snapshot);
            for ch in 0..self.channels {
                self.max_peak[ch] *= self.decay;
                self.max_rms[ch] *= self.decay;
            }
        }
    }

    pub fn reset(&mut self) {
        self.max_peak = [0.0; MAX_METER_CHANNELS];
        self.max_rms = [0.0; MAX_METER_CHANNELS];
        self.counter = 0;
        for window in &mut self.windows {
            window.reset();
        }
    }
}

/// UI-thread end of the snapshot queue
pub struct MeterReceiver {
    consumer: HeapCons<MeterSnapshot>,
    channels: usize,
}

impl MeterReceiver {
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Drain the queue, returning the most recent snapshot
    pub fn latest(&mut self) -> Option<MeterSnapshot> {
        let mut latest = None;
        while let Some(snapshot) = self.consumer.try_pop() {
            latest = Some(snapshot);
        }
        latest
    }
}

/// Displayed meter state with peak hold
pub struct PeakMeter {
    receiver: MeterReceiver,
    settings: MeterSettings,
    peaks: Vec<f32>,
    rms: Vec<f32>,
    holds: Vec<f32>,
    release_at: Vec<f64>,
}

impl PeakMeter {
    pub fn new(receiver: MeterReceiver, settings: MeterSettings) -> Self {
        let channels = receiver.channels();
        Self {
            receiver,
            settings,
            peaks: vec![0.0; channels],
            rms: vec![0.0; channels],
            holds: vec![0.0; channels],
            release_at: vec![0.0; channels],
        }
    }

    /// Take the latest snapshot, if any; returns whether one arrived
    pub fn poll(&mut self, now_ms: f64) -> bool {
        let Some(snapshot) = self.receiver.latest() else {
            return false;
        };
        for ch in 0..self.peaks.len() {
            let peak = snapshot.peak[ch];
            self.peaks[ch] = peak;
            self.rms[ch] = snapshot.rms[ch];
            if self.holds[ch] <= peak {
                self.holds[ch] = peak;
                let hold = if peak > 1.0 {
                    self.settings.clip_hold_ms
                } else {
                    self.settings.hold_ms
                };
                self.release_at[ch] = now_ms + hold;
            }
        }
        true
    }

    /// Advance one display frame: decay levels and release expired holds
    pub fn tick(&mut self, now_ms: f64) {
        let decay = self.settings.release_decay;
        for ch in 0..self.peaks.len() {
            self.peaks[ch] *= decay;
            self.rms[ch] *= decay;
            if now_ms >= self.release_at[ch] {
                self.holds[ch] = 0.0;
            }
        }
    }

    /// One UI frame: take the latest snapshot, then decay and release
    pub fn update(&mut self, now_ms: f64) {
        self.poll(now_ms);
        self.tick(now_ms);
    }

    pub fn channels(&self) -> usize {
        self.peaks.len()
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn rms(&self) -> &[f32] {
        &self.rms
    }

    pub fn holds(&self) -> &[f32] {
        &self.holds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MeterSettings {
        MeterSettings::default()
    }

    #[test]
    fn test_rms_of_constant_signal() {
        let mut window = RmsWindow::new(4);
        let mut rms = 0.0;
        for _ in 0..4 {
            rms = window.push_pop(0.25);
        }
        assert!((rms - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_every_update_interval() {
        // 6000 Hz / 60 = one snapshot per 100 frames
        let (mut tap, mut receiver) = MeterTap::channel(6000.0, 2, &settings());
        let block = vec![0.5f32; 2 * 64];

        tap.process(&block, 2);
        assert!(receiver.latest().is_none());
        tap.process(&block, 2);
        let snapshot = receiver.latest().unwrap();
        assert_eq!(snapshot.channels, 2);
        assert!((snapshot.peaks()[0] - 0.5).abs() < 1e-6);
        assert!(snapshot.rms_values()[1] > 0.0);
    }

    #[test]
    fn test_maxima_decay_after_snapshot() {
        let (mut tap, mut receiver) = MeterTap::channel(6000.0, 1, &settings());
        tap.process(&vec![1.0f32; 100], 1);
        assert!((receiver.latest().unwrap().peak[0] - 1.0).abs() < 1e-6);

        tap.process(&vec![0.0f32; 100], 1);
        let decayed = receiver.latest().unwrap().peak[0];
        assert!((decayed - 0.93).abs() < 1e-6);
    }

    #[test]
    fn test_peak_hold_and_release() {
        let (mut tap, receiver) = MeterTap::channel(6000.0, 1, &settings());
        let mut meter = PeakMeter::new(receiver, settings());

        tap.process(&vec![0.8f32; 100], 1);
        assert!(meter.poll(0.0));
        assert!((meter.holds()[0] - 0.8).abs() < 1e-6);

        meter.tick(16.0);
        assert!((meter.peaks()[0] - 0.8 * 0.97).abs() < 1e-6);
        assert!((meter.holds()[0] - 0.8).abs() < 1e-6);

        meter.tick(1000.0);
        assert_eq!(meter.holds()[0], 0.0);
    }

    #[test]
    fn test_clipping_holds_longer() {
        let (mut tap, receiver) = MeterTap::channel(6000.0, 1, &settings());
        let mut meter = PeakMeter::new(receiver, settings());

        tap.process(&vec![1.5f32; 100], 1);
        meter.poll(0.0);
        meter.tick(1500.0);
        assert!((meter.holds()[0] - 1.5).abs() < 1e-6);
        meter.tick(2000.0);
        assert_eq!(meter.holds()[0], 0.0);
    }

    #[test]
    fn test_update_releases_hold_while_snapshots_keep_arriving() {
        let (mut tap, receiver) = MeterTap::channel(6000.0, 1, &settings());
        let mut meter = PeakMeter::new(receiver, settings());

        tap.process(&vec![0.8f32; 100], 1);
        meter.update(0.0);
        assert!((meter.peaks()[0] - 0.8 * 0.97).abs() < 1e-6);
        assert!((meter.holds()[0] - 0.8).abs() < 1e-6);

        // one snapshot per frame, every 100 ms
        let silence = vec![0.0f32; 100];
        for frame in 1..10 {
            tap.process(&silence, 1);
            meter.update(frame as f64 * 100.0);
            assert!((meter.holds()[0] - 0.8).abs() < 1e-6, "frame {frame}");
        }
        tap.process(&silence, 1);
        meter.update(1000.0);
        assert_eq!(meter.holds()[0], 0.0);
        assert!(meter.peaks()[0] < 0.8 * 0.93f32.powi(10));
    }

    #[test]
    fn test_poll_without_snapshot() {
        let (_tap, receiver) = MeterTap::channel(48000.0, 2, &settings());
        let mut meter = PeakMeter::new(receiver, settings());
        assert!(!meter.poll(0.0));
        assert_eq!(meter.peaks(), &[0.0, 0.0]);
    }
}
