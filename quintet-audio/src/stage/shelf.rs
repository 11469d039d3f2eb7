//! Low-shelf and high-shelf stages

use std::rc::Rc;

use quintet_params::{Terminable, Terminator};

use super::{follow, watch, Stage, StageContext, StageCore, StageKind};
use crate::backend::{AudioParamKind, NodeId};
use crate::error::BackendError;
use crate::preset::ShelfParameters;

pub struct ShelfStage {
    kind: StageKind,
    params: ShelfParameters,
    core: Rc<StageCore>,
    subscriptions: Terminator,
}

impl ShelfStage {
    pub(crate) fn connect(
        kind: StageKind,
        context: &StageContext,
        params: &ShelfParameters,
        input: NodeId,
    ) -> Result<Self, BackendError> {
        let core = StageCore::build(kind, context, input, 1, params.enabled.get(), 1)?;

        let mut subscriptions = Terminator::new();
        subscriptions.with(follow(&core, &params.frequency, |core, frequency| {
            core.set_param(AudioParamKind::Frequency, frequency)
        }));
        subscriptions.with(follow(&core, &params.gain, |core, gain| {
            core.set_param(AudioParamKind::FilterGain, gain)
        }));
        subscriptions.with(watch(&core, &params.enabled, |core, enabled| {
            core.set_enabled(enabled)
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

    pub fn params(&self) -> &ShelfParameters {
        &self.params
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &StageCore {
        &self.core
    }
}

impl Stage for ShelfStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn enabled(&self) -> bool {
        self.params.enabled.get()
    }

    fn frequency(&self) -> f64 {
        self.params.frequency.get()
    }

    /// Half the shelf gain, drawn at the corner
    fn apex_decibel(&self) -> f64 {
        self.params.gain.get() * 0.5
    }

    fn frequency_response(&self, frequency_hz: &[f32], magnitude_db: &mut [f32], phase: &mut [f32]) {
        self.core.response(frequency_hz, magnitude_db, phase, 1.0);
    }
}

impl Terminable for ShelfStage {
    fn terminate(&mut self) {
        self.subscriptions.terminate();
        self.core.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ParamId;
    use crate::bypass::BypassState;
    use crate::stage::testing::{context, input};

    #[test]
    fn test_initially_disabled_shelf_is_bypassed() {
        let (recording, context) = context();
        let params = ShelfParameters::new(200.0);
        params.enabled.set(false);
        let source = input(&recording);
        let stage = ShelfStage::connect(StageKind::LowShelf, &context, &params, source).unwrap();

        assert_eq!(stage.core().switches()[0].state(), BypassState::Bypassed);
        params.enabled.set(true);
        assert_eq!(stage.core().switches()[0].state(), BypassState::Active);
    }

    #[test]
    fn test_gain_drives_filter_gain() {
        let (recording, context) = context();
        let params = ShelfParameters::new(8000.0);
        let source = input(&recording);
        let stage = ShelfStage::connect(StageKind::HighShelf, &context, &params, source).unwrap();

        params.gain.set(-12.0);
        let filter = stage.core().filters()[0];
        assert_eq!(
            recording.borrow().target(ParamId::new(filter, AudioParamKind::FilterGain)),
            Some(-12.0)
        );
        assert_eq!(stage.apex_decibel(), -6.0);
    }

    #[test]
    fn test_response_approaches_shelf_gain() {
        let (recording, context) = context();
        let params = ShelfParameters::new(200.0);
        params.gain.set(9.0);
        let source = input(&recording);
        let stage = ShelfStage::connect(StageKind::LowShelf, &context, &params, source).unwrap();

        let mut magnitude = [0.0; 3];
        let mut phase = [0.0; 3];
        stage.frequency_response(&[20.0, 200.0, 15000.0], &mut magnitude, &mut phase);
        assert!((magnitude[0] - 9.0).abs() < 0.5);
        assert!((magnitude[1] - 4.5).abs() < 0.5);
        assert!(magnitude[2].abs() < 0.1);
    }
}
