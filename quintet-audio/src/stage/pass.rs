//! High-pass and low-pass stages
//!
//! Four cells always sit in series; the order parameter decides how many of
//! them are in the signal path.

use std::rc::Rc;

use quintet_params::{Terminable, Terminator};

use super::{follow, watch, Stage, StageContext, StageCore, StageKind};
use crate::backend::{AudioParamKind, NodeId};
use crate::error::BackendError;
use crate::gain::gain_to_db;
use crate::preset::PassParameters;

/// Cells allocated per pass stage, i.e. the highest order
const PASS_CELLS: usize = 4;

fn active_cells(order: i32) -> usize {
    order.clamp(1, PASS_CELLS as i32) as usize
}

pub struct PassStage {
    kind: StageKind,
    params: PassParameters,
    core: Rc<StageCore>,
    subscriptions: Terminator,
}

impl PassStage {
    pub(crate) fn connect(
        kind: StageKind,
        context: &StageContext,
        params: &PassParameters,
        input: NodeId,
    ) -> Result<Self, BackendError> {
        let core = StageCore::build(
            kind,
            context,
            input,
            PASS_CELLS,
            params.enabled.get(),
            active_cells(params.order.get()),
        )?;

        let mut subscriptions = Terminator::new();
        subscriptions.with(follow(&core, &params.frequency, |core, frequency| {
            core.set_param(AudioParamKind::Frequency, frequency)
        }));
        subscriptions.with(follow(&core, &params.q, |core, q| {
            core.set_param(AudioParamKind::Q, q)
        }));
        subscriptions.with(watch(&core, &params.enabled, |core, enabled| {
            core.set_enabled(enabled)
        }));
        subscriptions.with(watch(&core, &params.order, |core, order| {
            core.set_active_cells(active_cells(order))
        }));

        Ok(Self {
            kind,
            params: params.clone(),
            core,
            subscriptions,
        })
    }

    pub fn output(&self) -> NodeId {
        self.core.output()
    }

    pub fn order(&self) -> i32 {
        self.params.order.get()
    }

    pub fn params(&self) -> &PassParameters {
        &self.params
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &StageCore {
        &self.core
    }
}

impl Stage for PassStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn enabled(&self) -> bool {
        self.params.enabled.get()
    }

    fn frequency(&self) -> f64 {
        self.params.frequency.get()
    }

    /// A single section peaks at Q (linear) on its cutoff
    fn apex_decibel(&self) -> f64 {
        f64::from(self.order()) * gain_to_db(self.params.q.get())
    }

    fn frequency_response(&self, frequency_hz: &[f32], magnitude_db: &mut [f32], phase: &mut [f32]) {
        self.core
            .response(frequency_hz, magnitude_db, phase, self.order() as f32);
    }
}

impl Terminable for PassStage {
    fn terminate(&mut self) {
        self.subscriptions.terminate();
        self.core.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{gain_params, Call};
    use crate::backend::ParamId;
    use crate::bypass::BypassState;
    use crate::stage::testing::{context, input};
    use std::cell::Cell;

    fn states(stage: &PassStage) -> Vec<BypassState> {
        stage.core().switches().iter().map(|s| s.state()).collect()
    }

    #[test]
    fn test_order_selects_active_cells() {
        let (recording, context) = context();
        let params = PassParameters::new(1000.0);
        let source = input(&recording);
        let stage = PassStage::connect(StageKind::HighPass, &context, &params, source).unwrap();

        use BypassState::{Active, Bypassed};
        assert_eq!(states(&stage), [Active, Active, Active, Active]);

        params.order.set(2);
        assert_eq!(states(&stage), [Active, Active, Bypassed, Bypassed]);

        params.enabled.set(false);
        assert_eq!(states(&stage), [Bypassed; 4]);

        params.order.set(3);
        assert_eq!(states(&stage), [Bypassed; 4]);

        params.enabled.set(true);
        assert_eq!(states(&stage), [Active, Active, Active, Bypassed]);
    }

    #[test]
    fn test_frequency_reaches_every_cell() {
        let (recording, context) = context();
        let params = PassParameters::new(1000.0);
        let source = input(&recording);
        let stage = PassStage::connect(StageKind::LowPass, &context, &params, source).unwrap();
        params.order.set(1);

        params.frequency.set(2500.0);
        params.q.set(2.0);
        let backend = recording.borrow();
        for &filter in stage.core().filters() {
            assert_eq!(
                backend.target(ParamId::new(filter, AudioParamKind::Frequency)),
                Some(2500.0)
            );
            assert_eq!(backend.target(ParamId::new(filter, AudioParamKind::Q)), Some(2.0));
        }
    }

    #[test]
    fn test_changes_ramp_while_running() {
        let (recording, context) = context();
        let params = PassParameters::new(1000.0);
        let source = input(&recording);
        let _stage = PassStage::connect(StageKind::HighPass, &context, &params, source).unwrap();
        recording.borrow_mut().set_running(true);
        recording.borrow_mut().clear_calls();

        params.order.set(1);
        params.frequency.set(300.0);
        let backend = recording.borrow();
        assert!(!backend.calls().is_empty());
        assert!(backend.calls().iter().all(|call| !matches!(call, Call::Set(..))));
        // three cells crossfade, four frequencies move
        assert_eq!(gain_params(backend.calls()).len(), 6);
    }

    #[test]
    fn test_response_scales_with_order() {
        let (recording, context) = context();
        let params = PassParameters::new(1000.0);
        let source = input(&recording);
        let stage = PassStage::connect(StageKind::LowPass, &context, &params, source).unwrap();

        let frequencies = [1000.0f32, 4000.0];
        let mut fourth = [0.0; 2];
        let mut phase = [0.0; 2];
        stage.frequency_response(&frequencies, &mut fourth, &mut phase);

        params.order.set(1);
        let mut first = [0.0; 2];
        stage.frequency_response(&frequencies, &mut first, &mut phase);

        for (a, b) in fourth.iter().zip(&first) {
            assert!((a - 4.0 * b).abs() < 1e-3);
        }
        // Q of 1/sqrt(2) puts a single section 3 dB down at cutoff
        assert!((first[0] + 3.0103).abs() < 1e-2);
        assert!((stage.apex_decibel() - first[0] as f64).abs() < 1e-2);
    }

    #[test]
    fn test_changes_are_announced_with_stage() {
        let (recording, context) = context();
        let params = PassParameters::new(1000.0);
        let source = input(&recording);
        let _stage = PassStage::connect(StageKind::HighPass, &context, &params, source).unwrap();

        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let _subscription = context.changes.subscribe(move |change| {
            assert_eq!(change.stage, Some(StageKind::HighPass));
            counter.set(counter.get() + 1);
        });

        params.frequency.set(55.0);
        params.frequency.set(55.0);
        params.order.set(2);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_terminate_stops_following() {
        let (recording, context) = context();
        let params = PassParameters::new(1000.0);
        let source = input(&recording);
        let mut stage = PassStage::connect(StageKind::HighPass, &context, &params, source).unwrap();
        assert_eq!(params.frequency.observer_count(), 1);

        stage.terminate();
        assert_eq!(params.frequency.observer_count(), 0);
        assert_eq!(params.order.observer_count(), 0);
        let nodes = recording.borrow().node_count();
        // everything but the upstream input
        assert_eq!(recording.borrow().released().len(), nodes - 1);

        recording.borrow_mut().clear_calls();
        params.frequency.set(80.0);
        assert!(recording.borrow().calls().is_empty());
    }
}
