//! Quintet - five-band filter bank
//!
//! Demo host: runs the bank over a synthetic signal on an audio thread and
//! drives the response, spectrum and meter views from a frame loop.

mod config;

use std::cell::{Cell, RefCell};
use std::f32::consts::TAU;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use quintet_audio::{
    gain_to_db, AudioBackend, AudioGraph, BankConfig, Effect, EngineConfig, FilterBank, Preset,
    SharedBackend, SoftwareBackend,
};
use quintet_params::Terminable;
use quintet_view::{MeterView, PathRecorder, ResponseRenderer, Screen, SpectrumRenderer, Theme};

use crate::config::AppConfig;

/// Frame rate for UI updates
const FPS: u64 = 30;
/// How long the demo runs
const RUN_TIME: Duration = Duration::from_secs(6);
/// Frames rendered per audio thread wakeup
const AUDIO_CHUNK: usize = 480;
/// Seconds for one sweep of the peaking stage across the band
const SWEEP_PERIOD: f64 = 3.0;

const WIDTH: f64 = 640.0;
const RESPONSE_HEIGHT: f64 = 240.0;
const SPECTRUM_HEIGHT: f64 = 160.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load();
    tracing::info!(?config, "configuration loaded");

    let preset = Preset::new();
    if let Some(path) = preset_path(&config) {
        preset
            .load(&path)
            .with_context(|| format!("loading preset {}", path.display()))?;
    }

    let software = Rc::new(RefCell::new(SoftwareBackend::new(EngineConfig {
        sample_rate: config.sample_rate,
        ..Default::default()
    })));
    let backend: SharedBackend = software.clone();
    let mut bank_config = BankConfig::default();
    bank_config.analyser.fft_size = config.fft_size;
    let mut bank = FilterBank::new(backend, &preset, &bank_config)?;

    let (graph, channels) = {
        let mut software = software.borrow_mut();
        let (source, destination) = (software.source(), software.destination());
        software.connect(source, bank.input())?;
        software.connect(bank.output(), destination)?;
        (software.start()?, software.config().channels)
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_audio = shutdown.clone();
    let sample_rate = config.sample_rate;
    let audio_handle = thread::spawn(move || {
        run_audio_thread(graph, sample_rate, channels, shutdown_audio);
    });

    let result = run_frames(&mut bank, &preset);

    bank.terminate();
    shutdown.store(true, Ordering::SeqCst);
    if audio_handle.join().is_err() {
        tracing::warn!("audio thread panicked");
    }
    software.borrow().suspend();

    result
}

/// Relative preset paths are looked up in the preset directory
fn preset_path(config: &AppConfig) -> Option<PathBuf> {
    let path = config.preset.as_ref()?;
    if path.is_absolute() {
        Some(path.clone())
    } else {
        Some(AppConfig::preset_dir().join(path))
    }
}

/// Three tones spread across the band
struct Signal {
    phases: [f32; 3],
    steps: [f32; 3],
}

impl Signal {
    const FREQUENCIES: [f32; 3] = [110.0, 1000.0, 6000.0];
    const AMPLITUDE: f32 = 0.2;

    fn new(sample_rate: f32) -> Self {
        Self {
            phases: [0.0; 3],
            steps: Self::FREQUENCIES.map(|frequency| TAU * frequency / sample_rate),
        }
    }

    fn fill(&mut self, buffer: &mut [f32], channels: usize) {
        for frame in buffer.chunks_exact_mut(channels) {
            let mut value = 0.0;
            for (phase, step) in self.phases.iter_mut().zip(self.steps) {
                value += phase.sin();
                *phase = (*phase + step) % TAU;
            }
            frame.fill(value * Self::AMPLITUDE);
        }
    }
}

fn run_audio_thread(
    mut graph: AudioGraph,
    sample_rate: f32,
    channels: usize,
    shutdown: Arc<AtomicBool>,
) {
    let mut signal = Signal::new(sample_rate);
    let mut buffer = vec![0.0f32; AUDIO_CHUNK * channels];
    let chunk = Duration::from_secs_f64(AUDIO_CHUNK as f64 / f64::from(sample_rate));
    let mut next = Instant::now();

    while !shutdown.load(Ordering::Relaxed) {
        signal.fill(&mut buffer, channels);
        graph.process(&mut buffer);

        next += chunk;
        if let Some(wait) = next.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }
    tracing::debug!(frames = graph.current_frame(), "audio thread finished");
}

fn run_frames(bank: &mut FilterBank, preset: &Preset) -> anyhow::Result<()> {
    let theme = Theme::default();
    let mut response = ResponseRenderer::new(Screen::response(WIDTH, RESPONSE_HEIGHT));
    let spectrum_view = SpectrumRenderer::new(Screen::spectrum(WIDTH, SPECTRUM_HEIGHT));
    let meter_view = MeterView::new(24.0, SPECTRUM_HEIGHT);
    let mut response_canvas = PathRecorder::new();
    let mut spectrum_canvas = PathRecorder::new();
    let mut meter_canvas = PathRecorder::new();
    let mut spectrum = vec![0.0f32; bank.frequency_bin_count()];

    let changed = Rc::new(Cell::new(true));
    let mut subscription = bank.subscribe({
        let changed = changed.clone();
        move |_| changed.set(true)
    });

    let frame_time = Duration::from_millis(1000 / FPS);
    let start = Instant::now();
    let mut frames = 0u64;

    while start.elapsed() < RUN_TIME {
        let frame_start = Instant::now();
        let now_ms = start.elapsed().as_secs_f64() * 1000.0;

        let sweep = (start.elapsed().as_secs_f64() / SWEEP_PERIOD).fract();
        preset.peaking.frequency.set_normalized(sweep);

        bank.meter_mut().update(now_ms);

        if changed.replace(false) {
            response_canvas.take_ops();
            response.render(&mut response_canvas, bank.stages(), &theme);
        }

        spectrum_canvas.take_ops();
        let bin_width = bank.compute_spectrum(&mut spectrum);
        spectrum_view.render(&mut spectrum_canvas, &spectrum, bin_width, &theme);

        meter_canvas.take_ops();
        meter_view.render_meter(&mut meter_canvas, bank.meter(), &theme);

        if frames % FPS == 0 {
            let levels: Vec<String> = bank
                .peaks()
                .iter()
                .map(|&peak| format!("{:.1}", gain_to_db(f64::from(peak))))
                .collect();
            tracing::info!(
                peaking = %preset.peaking.frequency.print_with_units(),
                levels = %levels.join(" / "),
                response_ops = response_canvas.ops().len(),
                spectrum_ops = spectrum_canvas.ops().len(),
                "frame {frames}"
            );
        }
        frames += 1;

        if let Some(remaining) = frame_time.checked_sub(frame_start.elapsed()) {
            thread::sleep(remaining);
        }
    }

    subscription.terminate();
    tracing::info!(frames, "frame loop finished");
    Ok(())
}
