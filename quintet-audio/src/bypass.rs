//! Click-free bypass switching
//!
//! Every filter cell sits between a dry and a wet gain. Switching ramps one
//! gain up and the other down to [`SILENCE_GAIN`], never to a hard zero.

use std::cell::Cell;

use crate::backend::{AudioBackend, NodeId, ParamId, ParamRamp};
use crate::error::BackendError;
use crate::gain::SILENCE_GAIN;

/// Whether a cell is in the signal path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BypassState {
    /// Wet path open, processor audible
    #[default]
    Active,
    /// Dry path open, processor skipped
    Bypassed,
}

/// Dry/wet gain pair around one processor
#[derive(Debug)]
pub struct BypassSwitch {
    dry: NodeId,
    wet: NodeId,
    state: Cell<BypassState>,
}

impl BypassSwitch {
    /// Wire `input -> dry -> output` and `input -> wet -> processor -> output`
    ///
    /// The switch starts active: dry at the silence floor, wet at unity.
    pub fn connect(
        backend: &mut dyn AudioBackend,
        input: NodeId,
        processor: NodeId,
        output: NodeId,
    ) -> Result<Self, BackendError> {
        let dry = backend.create_gain(SILENCE_GAIN)?;
        let wet = backend.create_gain(1.0)?;
        backend.connect(input, dry)?;
        backend.connect(dry, output)?;
        backend.connect(input, wet)?;
        backend.connect(wet, processor)?;
        backend.connect(processor, output)?;
        Ok(Self {
            dry,
            wet,
            state: Cell::new(BypassState::Active),
        })
    }

    pub fn state(&self) -> BypassState {
        self.state.get()
    }

    pub fn dry(&self) -> NodeId {
        self.dry
    }

    pub fn wet(&self) -> NodeId {
        self.wet
    }

    /// Crossfade to the requested state; returns `false` if already there
    pub fn set_state(
        &self,
        backend: &mut dyn AudioBackend,
        ramp: &ParamRamp,
        state: BypassState,
    ) -> bool {
        if self.state.get() == state {
            return false;
        }
        self.state.set(state);
        let (dry, wet) = match state {
            BypassState::Bypassed => (1.0, SILENCE_GAIN),
            BypassState::Active => (SILENCE_GAIN, 1.0),
        };
        ramp.apply(backend, ParamId::gain(self.dry), dry);
        ramp.apply(backend, ParamId::gain(self.wet), wet);
        true
    }

    pub fn set_bypassed(&self, backend: &mut dyn AudioBackend, ramp: &ParamRamp, bypassed: bool) -> bool {
        let state = if bypassed {
            BypassState::Bypassed
        } else {
            BypassState::Active
        };
        self.set_state(backend, ramp, state)
    }

    pub fn release(&self, backend: &mut dyn AudioBackend) {
        backend.release(self.dry);
        backend.release(self.wet);
    }
}
