//! Peaking stage

use std::rc::Rc;

use quintet_params::{Terminable, Terminator};

use super::{follow, watch, Stage, StageContext, StageCore, StageKind};
use crate::backend::{AudioParamKind, NodeId};
use crate::error::BackendError;
use crate::preset::PeakingParameters;

pub struct PeakingStage {
    params: PeakingParameters,
    core: Rc<StageCore>,
    subscriptions: Terminator,
}

impl PeakingStage {
    pub(crate) fn connect(
        context: &StageContext,
        params: &PeakingParameters,
        input: NodeId,
    ) -> Result<Self, BackendError> {
        let core = StageCore::build(
            StageKind::Peaking,
            context,
            input,
            1,
            params.enabled.get(),
            1,
        )?;

        let mut subscriptions = Terminator::new();
        subscriptions.with(follow(&core, &params.frequency, |core, frequency| {
            core.set_param(AudioParamKind::Frequency, frequency)
        }));
        subscriptions.with(follow(&core, &params.gain, |core, gain| {
            core.set_param(AudioParamKind::FilterGain, gain)
        }));
        subscriptions.with(follow(&core, &params.q, |core, q| {
            core.set_param(AudioParamKind::Q, q)
        }));
        subscriptions.with(watch(&core, &params.enabled, |core, enabled| {
            core.set_enabled(enabled)
        }));

        Ok(Self {
            params: params.clone(),
            core,
            subscriptions,
        })
    }

    pub fn output(&self) -> NodeId {
        self.core.output()
    }

    pub fn params(&self) -> &PeakingParameters {
        &self.params
    }
}

impl Stage for PeakingStage {
    fn kind(&self) -> StageKind {
        StageKind::Peaking
    }

    fn enabled(&self) -> bool {
        self.params.enabled.get()
    }

    fn frequency(&self) -> f64 {
        self.params.frequency.get()
    }

    fn apex_decibel(&self) -> f64 {
        self.params.gain.get()
    }

    fn frequency_response(&self, frequency_hz: &[f32], magnitude_db: &mut [f32], phase: &mut [f32]) {
        self.core.response(frequency_hz, magnitude_db, phase, 1.0);
    }
}

impl Terminable for PeakingStage {
    fn terminate(&mut self) {
        self.subscriptions.terminate();
        self.core.release();
    }
}
