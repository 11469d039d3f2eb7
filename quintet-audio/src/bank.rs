//! The five-stage filter bank
//!
//! Signal flow:
//!
//! ```text
//! input -> high-pass -> low-shelf -> peaking -> high-shelf -> low-pass
//!       -> meter -> analyser -> master gain -> output
//! ```
//!
//! The bank owns the stages and the master gain, and fans every parameter
//! change out as a [`BankChange`].

use std::rc::Rc;

use quintet_params::{Observable, Parameter, Subscription, Terminable, Terminator};

use crate::analyser::Analyser;
use crate::backend::{NodeId, ParamId, ParamRamp, SharedBackend};
use crate::config::BankConfig;
use crate::error::{BackendError, BankError};
use crate::gain::{db_to_gain, SILENCE_GAIN};
use crate::meter::PeakMeter;
use crate::preset::Preset;
use crate::stage::{FilterStage, PassStage, PeakingStage, ShelfStage, StageContext, StageKind};

/// Something in the bank changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankChange {
    /// The stage whose parameter changed, `None` for the master section
    pub stage: Option<StageKind>,
}

/// Ramp the master output whenever `parameter` changes
fn drive_master<T: Copy + PartialEq + 'static>(
    context: &StageContext,
    output: NodeId,
    parameter: &Parameter<T>,
    level: impl Fn(T) -> f64 + 'static,
) -> Subscription {
    let backend = Rc::clone(&context.backend);
    let ramp = context.ramp;
    let changes = context.changes.clone();
    parameter.subscribe(
        move |parameter| {
            let gain = level(parameter.get());
            ramp.apply(&mut *backend.borrow_mut(), ParamId::gain(output), gain);
            changes.notify(&BankChange { stage: None });
        },
        false,
    )
}

/// Linear output gain for the master section
fn master_gain(gain_db: f64, bypassed: bool) -> f64 {
    if bypassed {
        SILENCE_GAIN
    } else {
        db_to_gain(gain_db).max(SILENCE_GAIN)
    }
}

/// Build the five stages in series after `input`
///
/// On failure the stages built so far are terminated.
fn connect_stages(
    context: &StageContext,
    preset: &Preset,
    input: NodeId,
) -> Result<Vec<FilterStage>, BackendError> {
    let mut stages: Vec<FilterStage> = Vec::with_capacity(StageKind::ALL.len());
    let mut previous = input;
    for kind in StageKind::ALL {
        let connected = match kind {
            StageKind::HighPass => {
                PassStage::connect(kind, context, &preset.high_pass, previous).map(FilterStage::Pass)
            }
            StageKind::LowShelf => {
                ShelfStage::connect(kind, context, &preset.low_shelf, previous).map(FilterStage::Shelf)
            }
            StageKind::Peaking => {
                PeakingStage::connect(context, &preset.peaking, previous).map(FilterStage::Peaking)
            }
            StageKind::HighShelf => ShelfStage::connect(kind, context, &preset.high_shelf, previous)
                .map(FilterStage::Shelf),
            StageKind::LowPass => {
                PassStage::connect(kind, context, &preset.low_pass, previous).map(FilterStage::Pass)
            }
        };
        match connected {
            Ok(stage) => {
                previous = stage.output();
                stages.push(stage);
            }
            Err(error) => {
                tracing::warn!(stage = kind.name(), %error, "stage connection failed");
                for stage in stages.iter_mut().rev() {
                    stage.terminate();
                }
                return Err(error);
            }
        }
    }
    Ok(stages)
}

pub struct FilterBank {
    backend: SharedBackend,
    preset: Preset,
    changes: Observable<BankChange>,
    input: NodeId,
    output: NodeId,
    meter_node: NodeId,
    analyser_node: NodeId,
    stages: Vec<FilterStage>,
    meter: PeakMeter,
    analyser: Analyser,
    subscriptions: Terminator,
    terminated: bool,
}

impl FilterBank {
    /// Build the chain on `backend` and bind it to `preset`
    ///
    /// Fails before touching any parameter if the backend cannot provide a
    /// meter or an analyser.
    pub fn new(
        backend: SharedBackend,
        preset: &Preset,
        config: &BankConfig,
    ) -> Result<Self, BankError> {
        let ramp = ParamRamp::new(config.interpolation_time);
        let master = &preset.main;

        let (input, output, meter_node, receiver, analyser_node, analyser) = {
            let mut backend = backend.borrow_mut();
            let (meter_node, receiver) = backend.create_meter(config.channels, &config.meter)?;
            let (analyser_node, analyser) = backend.create_analyser(&config.analyser)?;
            let input = backend.create_gain(1.0)?;
            let output = backend.create_gain(master_gain(master.gain.get(), master.bypass.get()))?;
            (input, output, meter_node, receiver, analyser_node, analyser)
        };

        let changes = Observable::new();
        let context = StageContext {
            backend: Rc::clone(&backend),
            ramp,
            changes: changes.clone(),
        };

        let stages = match connect_stages(&context, preset, input) {
            Ok(stages) => stages,
            Err(error) => {
                let mut backend = backend.borrow_mut();
                for node in [input, meter_node, analyser_node, output] {
                    backend.release(node);
                }
                return Err(error.into());
            }
        };
        let previous = stages.last().map_or(input, FilterStage::output);

        // from here on a failure is cleaned up by `Drop`
        let mut bank = Self {
            backend,
            preset: preset.clone(),
            changes,
            input,
            output,
            meter_node,
            analyser_node,
            stages,
            meter: PeakMeter::new(receiver, config.meter),
            analyser,
            subscriptions: Terminator::new(),
            terminated: false,
        };

        {
            let mut backend = bank.backend.borrow_mut();
            backend.connect(previous, meter_node)?;
            backend.connect(meter_node, analyser_node)?;
            backend.connect(analyser_node, output)?;
        }

        let bypass = Rc::downgrade(&master.bypass);
        bank.subscriptions
            .with(drive_master(&context, output, &master.gain, move |gain_db| {
                master_gain(gain_db, bypass.upgrade().is_some_and(|bypass| bypass.get()))
            }));
        let gain = Rc::downgrade(&master.gain);
        bank.subscriptions
            .with(drive_master(&context, output, &master.bypass, move |bypassed| {
                master_gain(gain.upgrade().map_or(0.0, |gain| gain.get()), bypassed)
            }));

        tracing::info!(
            stages = bank.stages.len(),
            channels = config.channels,
            fft_size = config.analyser.fft_size,
            "filter bank connected"
        );
        Ok(bank)
    }

    /// Where upstream audio connects
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// Where downstream audio connects
    pub fn output(&self) -> NodeId {
        self.output
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    /// Stages in signal order
    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn stage(&self, kind: StageKind) -> &FilterStage {
        &self.stages[kind.index()]
    }

    /// Observe every parameter change of the bank
    pub fn subscribe(&self, observer: impl Fn(&BankChange) + 'static) -> Subscription {
        self.changes.subscribe(observer)
    }

    pub fn meter(&self) -> &PeakMeter {
        &self.meter
    }

    pub fn meter_mut(&mut self) -> &mut PeakMeter {
        &mut self.meter
    }

    /// Displayed peak per channel, as of the last poll
    pub fn peaks(&self) -> &[f32] {
        self.meter.peaks()
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.analyser.frequency_bin_count()
    }

    /// Fill `spectrum` with dBFS bins of the bank output, returns the bin
    /// width in Hz
    pub fn compute_spectrum(&mut self, spectrum: &mut [f32]) -> f32 {
        self.analyser.compute_spectrum(spectrum)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl Terminable for FilterBank {
    /// Release all subscriptions and backend nodes; idempotent
    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.subscriptions.terminate();
        for stage in self.stages.iter_mut().rev() {
            stage.terminate();
        }
        self.changes.clear();
        {
            let mut backend = self.backend.borrow_mut();
            for node in [self.input, self.meter_node, self.analyser_node, self.output] {
                backend.release(node);
            }
        }
        tracing::debug!("filter bank terminated");
    }
}

impl Drop for FilterBank {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use crate::backend::recording::{Call, RecordingBackend};
    use crate::stage::Stage;

    fn bank(recording: RecordingBackend) -> (Rc<RefCell<RecordingBackend>>, Preset, FilterBank) {
        let recording = Rc::new(RefCell::new(recording));
        let backend: SharedBackend = recording.clone();
        let preset = Preset::new();
        let bank = FilterBank::new(backend, &preset, &BankConfig::default()).unwrap();
        (recording, preset, bank)
    }

    #[test]
    fn test_stages_in_signal_order() {
        let (_, _, bank) = bank(RecordingBackend::new());
        let kinds: Vec<_> = bank.stages().iter().map(Stage::kind).collect();
        assert_eq!(kinds, StageKind::ALL);
        assert_eq!(bank.stage(StageKind::HighShelf).kind(), StageKind::HighShelf);
    }

    #[test]
    fn test_chain_ends_in_taps_and_master() {
        let (recording, _, bank) = bank(RecordingBackend::new());
        let backend = recording.borrow();
        let low_pass = bank.stage(StageKind::LowPass).output();
        assert!(backend.is_connected(low_pass, bank.meter_node));
        assert!(backend.is_connected(bank.meter_node, bank.analyser_node));
        assert!(backend.is_connected(bank.analyser_node, bank.output()));
        assert_eq!(backend.target(ParamId::gain(bank.output())), Some(1.0));
    }

    #[test]
    fn test_master_gain_and_bypass() {
        let (recording, preset, bank) = bank(RecordingBackend::new());
        let output = ParamId::gain(bank.output());

        preset.main.gain.set(-6.0);
        let gain = recording.borrow().target(output).unwrap();
        assert!((gain - db_to_gain(-6.0)).abs() < 1e-12);

        preset.main.bypass.set(true);
        assert_eq!(recording.borrow().target(output), Some(SILENCE_GAIN));
        preset.main.gain.set(3.0);
        assert_eq!(recording.borrow().target(output), Some(SILENCE_GAIN));

        preset.main.bypass.set(false);
        let gain = recording.borrow().target(output).unwrap();
        assert!((gain - db_to_gain(3.0)).abs() < 1e-12);

        preset.main.gain.set(f64::NEG_INFINITY);
        assert_eq!(recording.borrow().target(output), Some(SILENCE_GAIN));
    }

    #[test]
    fn test_toggle_storm_only_ramps() {
        let (recording, preset, _bank) = bank(RecordingBackend::new());
        {
            let mut backend = recording.borrow_mut();
            backend.set_running(true);
            backend.set_time(1.0);
            backend.clear_calls();
        }

        for i in 0..50 {
            preset.low_pass.enabled.set(i % 2 == 0);
            preset.peaking.enabled.set(i % 3 == 0);
            preset.high_pass.order.set(1 + i % 4);
            preset.main.bypass.set(i % 5 == 0);
        }

        let backend = recording.borrow();
        assert!(!backend.calls().is_empty());
        for call in backend.calls() {
            match *call {
                Call::Set(..) => panic!("unramped change while running: {call:?}"),
                Call::Ramp(param, value, end_time) => {
                    assert!(value > 0.0, "{param:?} ramped to zero");
                    assert!((end_time - 1.005).abs() < 1e-9);
                }
                Call::Cancel(..) => {}
            }
        }
    }

    #[test]
    fn test_high_pass_enable_toggles_ramp_every_cell() {
        let (recording, preset, bank) = bank(RecordingBackend::new());
        preset.high_pass.order.set(4);
        preset.high_pass.frequency.set(100.0);
        preset.high_pass.enabled.set(true);
        {
            let mut backend = recording.borrow_mut();
            backend.set_running(true);
            backend.set_time(2.0);
            backend.clear_calls();
        }

        for _ in 0..10 {
            preset.high_pass.enabled.set(false);
            preset.high_pass.enabled.set(true);
        }

        let backend = recording.borrow();
        let mut ramps = 0;
        for call in backend.calls() {
            match *call {
                Call::Set(..) => panic!("unramped change while running: {call:?}"),
                Call::Ramp(param, value, end_time) => {
                    assert!(value > 0.0, "{param:?} ramped to zero");
                    assert!((end_time - 2.005).abs() < 1e-9);
                    ramps += 1;
                }
                Call::Cancel(..) => {}
            }
        }
        // 20 toggles, a dry and a wet gain on each of the 4 cells
        assert_eq!(ramps, 20 * 4 * 2);
        assert!(matches!(
            bank.stage(StageKind::HighPass),
            FilterStage::Pass(stage) if stage.order() == 4
        ));
    }

    #[test]
    fn test_missing_meter_fails() {
        let recording = Rc::new(RefCell::new(RecordingBackend::without_meter()));
        let backend: SharedBackend = recording.clone();
        let preset = Preset::new();
        let result = FilterBank::new(backend, &preset, &BankConfig::default());
        assert!(matches!(
            result,
            Err(BankError::Backend(BackendError::MissingResource("meter")))
        ));
        assert_eq!(preset.peaking.frequency.observer_count(), 0);
    }

    #[test]
    fn test_failed_stage_leaves_nothing_behind() {
        // high-pass and low-shelf fit, the peaking cell does not
        let recording = Rc::new(RefCell::new(RecordingBackend::with_filter_limit(5)));
        let backend: SharedBackend = recording.clone();
        let preset = Preset::new();
        let result = FilterBank::new(backend, &preset, &BankConfig::default());

        assert!(matches!(
            result,
            Err(BankError::Backend(BackendError::MissingResource("filter")))
        ));
        assert_eq!(preset.high_pass.frequency.observer_count(), 0);
        assert_eq!(preset.high_pass.order.observer_count(), 0);
        assert_eq!(preset.low_shelf.gain.observer_count(), 0);
        assert_eq!(preset.main.gain.observer_count(), 0);
        let backend = recording.borrow();
        let mut released = backend.released().to_vec();
        released.sort_by_key(|node| node.index());
        released.dedup();
        assert_eq!(released.len(), backend.node_count());
    }

    #[test]
    fn test_every_change_is_announced() {
        let (_, preset, bank) = bank(RecordingBackend::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let _subscription = bank.subscribe(move |change| log.borrow_mut().push(change.stage));

        preset.peaking.frequency.set(2000.0);
        preset.low_shelf.gain.set(2.0);
        preset.low_shelf.gain.set(2.0);
        preset.high_pass.order.set(2);
        preset.main.gain.set(-3.0);
        preset.main.bypass.set(true);

        assert_eq!(
            *seen.borrow(),
            [
                Some(StageKind::Peaking),
                Some(StageKind::LowShelf),
                Some(StageKind::HighPass),
                None,
                None,
            ]
        );
    }

    #[test]
    fn test_observer_may_read_responses() {
        let (_, preset, bank) = bank(RecordingBackend::new());
        let bank = Rc::new(bank);
        let reads = Rc::new(Cell::new(0));
        let weak = Rc::downgrade(&bank);
        let counter = Rc::clone(&reads);
        let _subscription = bank.subscribe(move |_| {
            if let Some(bank) = weak.upgrade() {
                let mut magnitude = [0.0; 1];
                let mut phase = [0.0; 1];
                bank.stage(StageKind::Peaking)
                    .frequency_response(&[1000.0], &mut magnitude, &mut phase);
                counter.set(counter.get() + 1);
            }
        });

        preset.peaking.gain.set(4.0);
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn test_terminate_releases_everything() {
        let (recording, preset, mut bank) = bank(RecordingBackend::new());
        bank.terminate();
        assert!(bank.is_terminated());

        assert_eq!(preset.main.gain.observer_count(), 0);
        assert_eq!(preset.main.bypass.observer_count(), 0);
        assert_eq!(preset.high_pass.order.observer_count(), 0);
        assert_eq!(preset.high_shelf.gain.observer_count(), 0);
        let backend = recording.borrow();
        assert_eq!(backend.released().len(), backend.node_count());

        drop(backend);
        bank.terminate();
        assert_eq!(recording.borrow().released().len(), recording.borrow().node_count());
    }
}
