//! Call-recording backend for tests

use std::collections::HashMap;

use quintet_analysis::SpectrumSettings;

use super::{AudioBackend, AudioParamKind, FilterKind, FilterParams, NodeId, ParamId};
use crate::analyser::Analyser;
use crate::config::MeterSettings;
use crate::error::BackendError;
use crate::meter::{MeterReceiver, MeterTap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Call {
    Set(ParamId, f64),
    Cancel(ParamId, f64),
    Ramp(ParamId, f64, f64),
}

impl Call {
    pub(crate) fn param(&self) -> ParamId {
        match *self {
            Call::Set(param, _) | Call::Cancel(param, _) | Call::Ramp(param, _, _) => param,
        }
    }
}

pub(crate) struct RecordingBackend {
    running: bool,
    time: f64,
    sample_rate: f32,
    metering: bool,
    filter_limit: Option<usize>,
    next_node: usize,
    filters: HashMap<NodeId, FilterParams>,
    targets: HashMap<ParamId, f64>,
    connections: Vec<(NodeId, NodeId)>,
    released: Vec<NodeId>,
    calls: Vec<Call>,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self {
            running: false,
            time: 0.0,
            sample_rate: 48000.0,
            metering: true,
            filter_limit: None,
            next_node: 0,
            filters: HashMap::new(),
            targets: HashMap::new(),
            connections: Vec::new(),
            released: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub(crate) fn without_meter() -> Self {
        Self {
            metering: false,
            ..Self::new()
        }
    }

    /// Fails every filter creation after the first `limit`
    pub(crate) fn with_filter_limit(limit: usize) -> Self {
        Self {
            filter_limit: Some(limit),
            ..Self::new()
        }
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub(crate) fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub(crate) fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub(crate) fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Last value set or ramped to
    pub(crate) fn target(&self, param: ParamId) -> Option<f64> {
        self.targets.get(&param).copied()
    }

    pub(crate) fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.connections.contains(&(from, to))
    }

    pub(crate) fn filter_kind(&self, node: NodeId) -> Option<FilterKind> {
        self.filters.get(&node).map(|params| params.kind)
    }

    pub(crate) fn released(&self) -> &[NodeId] {
        &self.released
    }

    pub(crate) fn node_count(&self) -> usize {
        self.next_node
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }
}

impl AudioBackend for RecordingBackend {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn create_gain(&mut self, gain: f64) -> Result<NodeId, BackendError> {
        let id = self.allocate();
        self.targets.insert(ParamId::gain(id), gain);
        Ok(id)
    }

    fn create_filter(&mut self, kind: FilterKind) -> Result<NodeId, BackendError> {
        if self.filter_limit.is_some_and(|limit| self.filters.len() >= limit) {
            return Err(BackendError::MissingResource("filter"));
        }
        let id = self.allocate();
        self.filters.insert(id, FilterParams::new(kind));
        Ok(id)
    }

    fn create_meter(
        &mut self,
        channels: usize,
        settings: &MeterSettings,
    ) -> Result<(NodeId, MeterReceiver), BackendError> {
        if !self.metering {
            return Err(BackendError::MissingResource("meter"));
        }
        let (_tap, receiver) = MeterTap::channel(self.sample_rate, channels, settings);
        Ok((self.allocate(), receiver))
    }

    fn create_analyser(
        &mut self,
        settings: &SpectrumSettings,
    ) -> Result<(NodeId, Analyser), BackendError> {
        let (_tap, analyser) = Analyser::channel(self.sample_rate, *settings)?;
        Ok((self.allocate(), analyser))
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), BackendError> {
        for node in [from, to] {
            if node.index() >= self.next_node {
                return Err(BackendError::UnknownNode(node.index()));
            }
        }
        self.connections.push((from, to));
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        self.released.push(node);
    }

    fn set_value(&mut self, param: ParamId, value: f64) {
        self.calls.push(Call::Set(param, value));
        self.targets.insert(param, value);
        if let Some(automation) = self
            .filters
            .get_mut(&param.node)
            .and_then(|params| params.automation_mut(param.kind))
        {
            automation.set_value(value, self.time);
        }
    }

    fn cancel_scheduled_values(&mut self, param: ParamId, time: f64) {
        self.calls.push(Call::Cancel(param, time));
    }

    fn linear_ramp_to_value_at_time(&mut self, param: ParamId, value: f64, end_time: f64) {
        self.calls.push(Call::Ramp(param, value, end_time));
        self.targets.insert(param, value);
        if let Some(automation) = self
            .filters
            .get_mut(&param.node)
            .and_then(|params| params.automation_mut(param.kind))
        {
            automation.linear_ramp_to_value_at_time(value, end_time);
        }
    }

    fn frequency_response(
        &self,
        filter: NodeId,
        frequency_hz: &[f32],
        magnitude: &mut [f32],
        phase: &mut [f32],
    ) {
        let coeffs = self
            .filters
            .get(&filter)
            .map(|params| params.design_target(f64::from(self.sample_rate)));
        for (i, &frequency) in frequency_hz.iter().enumerate() {
            let (mag, ph) = match coeffs {
                Some(coeffs) => coeffs.response(f64::from(frequency), f64::from(self.sample_rate)),
                None => (f64::NAN, f64::NAN),
            };
            if let Some(out) = magnitude.get_mut(i) {
                *out = mag as f32;
            }
            if let Some(out) = phase.get_mut(i) {
                *out = ph as f32;
            }
        }
    }
}

/// Gain params touched by a call list, in order, without duplicates
pub(crate) fn gain_params(calls: &[Call]) -> Vec<ParamId> {
    let mut params = Vec::new();
    for call in calls {
        let param = call.param();
        if param.kind == AudioParamKind::Gain && !params.contains(&param) {
            params.push(param);
        }
    }
    params
}
