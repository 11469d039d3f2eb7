//! Audio graph seam
//!
//! Stages and the bank only talk to an [`AudioBackend`]: they create nodes,
//! wire them, schedule parameter automation and query frequency responses.
//! [`SoftwareBackend`] is the in-crate implementation; its [`AudioGraph`]
//! renders the wired graph on the audio thread.

mod automation;
mod biquad;
mod graph;
#[cfg(test)]
pub(crate) mod recording;
mod software;

use std::cell::RefCell;
use std::rc::Rc;

use quintet_analysis::SpectrumSettings;

use crate::analyser::Analyser;
use crate::config::MeterSettings;
use crate::error::BackendError;
use crate::meter::MeterReceiver;

pub use automation::Automation;
pub use biquad::{BiquadCoeffs, BiquadState, FilterParams};
pub use graph::{AudioGraph, GraphCommand};
pub use software::{EngineConfig, SoftwareBackend};

/// Handle to a node created by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Biquad response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    HighPass,
    LowPass,
    LowShelf,
    HighShelf,
    Peaking,
}

/// Automatable parameter of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioParamKind {
    /// Linear gain of a gain node
    Gain,
    /// Filter frequency (Hz)
    Frequency,
    /// Filter quality factor
    Q,
    /// Filter gain (dB), shelves and peaking only
    FilterGain,
}

/// One automatable parameter on one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId {
    pub node: NodeId,
    pub kind: AudioParamKind,
}

impl ParamId {
    pub fn new(node: NodeId, kind: AudioParamKind) -> Self {
        Self { node, kind }
    }

    pub fn gain(node: NodeId) -> Self {
        Self::new(node, AudioParamKind::Gain)
    }
}

/// Audio graph host
///
/// Times are in seconds on the backend clock. Creating nodes may fail once
/// the backend has frozen its topology.
pub trait AudioBackend {
    fn sample_rate(&self) -> f32;

    /// Whether the graph is rendering, i.e. whether changes must be ramped
    fn is_running(&self) -> bool;

    fn current_time(&self) -> f64;

    fn create_gain(&mut self, gain: f64) -> Result<NodeId, BackendError>;

    fn create_filter(&mut self, kind: FilterKind) -> Result<NodeId, BackendError>;

    /// Create a metering tap; backends without metering return
    /// [`BackendError::MissingResource`]
    fn create_meter(
        &mut self,
        channels: usize,
        settings: &MeterSettings,
    ) -> Result<(NodeId, MeterReceiver), BackendError>;

    fn create_analyser(
        &mut self,
        settings: &SpectrumSettings,
    ) -> Result<(NodeId, Analyser), BackendError>;

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), BackendError>;

    /// Silence a node and stop processing it
    fn release(&mut self, node: NodeId);

    fn set_value(&mut self, param: ParamId, value: f64);

    fn cancel_scheduled_values(&mut self, param: ParamId, time: f64);

    fn linear_ramp_to_value_at_time(&mut self, param: ParamId, value: f64, end_time: f64);

    /// Linear magnitude and phase of a filter node for each frequency
    ///
    /// Uses the most recently scheduled settings. Unknown nodes and
    /// frequencies outside `[0, nyquist]` produce NaN.
    fn frequency_response(
        &self,
        filter: NodeId,
        frequency_hz: &[f32],
        magnitude: &mut [f32],
        phase: &mut [f32],
    );
}

/// Backend shared by a bank and its stages on the control thread
pub type SharedBackend = Rc<RefCell<dyn AudioBackend>>;

/// Click-free parameter change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRamp {
    time: f64,
}

impl ParamRamp {
    pub fn new(time: f64) -> Self {
        Self { time }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Move `param` to `value`
    ///
    /// While the backend runs this cancels pending automation and ramps over
    /// the interpolation time; otherwise the value is set directly.
    pub fn apply(&self, backend: &mut dyn AudioBackend, param: ParamId, value: f64) {
        if backend.is_running() {
            let now = backend.current_time();
            backend.cancel_scheduled_values(param, now);
            backend.linear_ramp_to_value_at_time(param, value, now + self.time);
        } else {
            backend.set_value(param, value);
        }
    }
}
