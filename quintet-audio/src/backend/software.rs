//! Software audio backend
//!
//! The control-thread half keeps a mirror of every node (for frequency
//! responses and for building the graph) and forwards automation to the
//! [`AudioGraph`] over a bounded channel once the graph has started.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use quintet_analysis::SpectrumSettings;

use super::automation::Automation;
use super::biquad::FilterParams;
use super::graph::{AudioGraph, FilterCell, GraphCommand, GraphNode, NodeKind};
use super::{AudioBackend, AudioParamKind, FilterKind, NodeId, ParamId};
use crate::analyser::{Analyser, AnalyserTap};
use crate::config::MeterSettings;
use crate::error::BackendError;
use crate::meter::{MeterReceiver, MeterTap};

/// Software engine settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Interleaved channels rendered by the graph
    pub channels: usize,
    /// Frames per render quantum
    pub block_size: usize,
    /// Pending commands the audio thread may lag behind by
    pub command_capacity: usize,
    /// Whether meter taps can be created
    pub metering: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            channels: 2,
            block_size: 128,
            command_capacity: 1024,
            metering: true,
        }
    }
}

enum MirrorKind {
    Source,
    Destination,
    Gain(Automation),
    Filter(FilterParams),
    Meter(Option<MeterTap>),
    Analyser(Option<AnalyserTap>),
}

struct MirrorNode {
    kind: MirrorKind,
    inputs: Vec<NodeId>,
    released: bool,
}

/// Control-thread half of the software engine
pub struct SoftwareBackend {
    config: EngineConfig,
    nodes: Vec<MirrorNode>,
    commands: Sender<GraphCommand>,
    pending_receiver: Option<Receiver<GraphCommand>>,
    clock: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
}

impl SoftwareBackend {
    const SOURCE: NodeId = NodeId(0);
    const DESTINATION: NodeId = NodeId(1);

    pub fn new(config: EngineConfig) -> Self {
        let (commands, receiver) = bounded(config.command_capacity.max(1));
        let nodes = vec![
            MirrorNode {
                kind: MirrorKind::Source,
                inputs: Vec::new(),
                released: false,
            },
            MirrorNode {
                kind: MirrorKind::Destination,
                inputs: Vec::new(),
                released: false,
            },
        ];
        Self {
            config,
            nodes,
            commands,
            pending_receiver: Some(receiver),
            clock: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Node fed with the graph input
    pub fn source(&self) -> NodeId {
        Self::SOURCE
    }

    /// Node whose inputs form the graph output
    pub fn destination(&self) -> NodeId {
        Self::DESTINATION
    }

    pub fn is_started(&self) -> bool {
        self.pending_receiver.is_none()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Freeze the topology and hand out the audio-thread graph
    ///
    /// The graph starts running immediately.
    pub fn start(&mut self) -> Result<AudioGraph, BackendError> {
        let receiver = self.pending_receiver.take().ok_or(BackendError::GraphStarted)?;

        let order = self.render_order();
        let mut positions = vec![None; self.nodes.len()];
        for (position, &index) in order.iter().enumerate() {
            positions[index] = Some(position);
        }

        let frames = self.config.block_size.max(1);
        let channels = self.config.channels;
        let mut graph_nodes = Vec::with_capacity(order.len());
        for &index in &order {
            let mirror = &mut self.nodes[index];
            let kind = match &mut mirror.kind {
                MirrorKind::Source => NodeKind::Source,
                MirrorKind::Destination => NodeKind::Destination,
                MirrorKind::Gain(automation) => NodeKind::Gain(*automation),
                MirrorKind::Filter(params) => NodeKind::Filter(FilterCell::new(*params, channels)),
                MirrorKind::Meter(tap) => tap.take().map_or(NodeKind::Junction, NodeKind::Meter),
                MirrorKind::Analyser(tap) => {
                    tap.take().map_or(NodeKind::Junction, NodeKind::Analyser)
                }
            };
            let inputs = mirror
                .inputs
                .iter()
                .filter_map(|input| positions[input.index()])
                .collect();
            graph_nodes.push(GraphNode {
                id: NodeId(index),
                kind,
                inputs,
                buffer: vec![0.0; frames * channels],
                released: mirror.released,
            });
        }

        self.running.store(true, Ordering::Release);
        tracing::info!(
            nodes = graph_nodes.len(),
            sample_rate = self.config.sample_rate,
            channels,
            "audio graph started"
        );

        Ok(AudioGraph::new(
            graph_nodes,
            self.nodes.len(),
            receiver,
            Arc::clone(&self.clock),
            Arc::clone(&self.running),
            f64::from(self.config.sample_rate),
            channels,
            frames,
        ))
    }

    /// Stop rendering; parameter changes are applied directly while stopped
    pub fn suspend(&self) {
        self.running.store(false, Ordering::Release);
        tracing::info!("audio graph suspended");
    }

    pub fn resume(&self) {
        if self.is_started() {
            self.running.store(true, Ordering::Release);
            tracing::info!("audio graph resumed");
        }
    }

    /// Topological order of the mirror; nodes caught in cycles are left out
    fn render_order(&self) -> Vec<usize> {
        let count = self.nodes.len();
        let mut pending: Vec<usize> = self.nodes.iter().map(|node| node.inputs.len()).collect();
        let mut outputs: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                outputs[input.index()].push(index);
            }
        }

        let mut ready: VecDeque<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(count);
        while let Some(index) = ready.pop_front() {
            order.push(index);
            for &next in &outputs[index] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() < count {
            tracing::warn!(dropped = count - order.len(), "cycle in audio graph, nodes dropped");
        }
        order
    }

    fn add_node(&mut self, kind: MirrorKind) -> Result<NodeId, BackendError> {
        if self.is_started() {
            return Err(BackendError::GraphStarted);
        }
        self.nodes.push(MirrorNode {
            kind,
            inputs: Vec::new(),
            released: false,
        });
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn automation_mut(&mut self, param: ParamId) -> Option<&mut Automation> {
        let node = self.nodes.get_mut(param.node.index())?;
        match (&mut node.kind, param.kind) {
            (MirrorKind::Gain(automation), AudioParamKind::Gain) => Some(automation),
            (MirrorKind::Filter(params), kind) => params.automation_mut(kind),
            _ => None,
        }
    }

    fn send(&self, command: GraphCommand) {
        if !self.is_started() {
            return;
        }
        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                tracing::warn!(?command, "audio command queue full, command dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("audio graph gone, command ignored");
            }
        }
    }
}

impl AudioBackend for SoftwareBackend {
    fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / f64::from(self.config.sample_rate)
    }

    fn create_gain(&mut self, gain: f64) -> Result<NodeId, BackendError> {
        self.add_node(MirrorKind::Gain(Automation::new(gain)))
    }

    fn create_filter(&mut self, kind: FilterKind) -> Result<NodeId, BackendError> {
        self.add_node(MirrorKind::Filter(FilterParams::new(kind)))
    }

    fn create_meter(
        &mut self,
        channels: usize,
        settings: &MeterSettings,
    ) -> Result<(NodeId, MeterReceiver), BackendError> {
        if !self.config.metering {
            return Err(BackendError::MissingResource("meter"));
        }
        let (tap, receiver) = MeterTap::channel(self.config.sample_rate, channels, settings);
        let id = self.add_node(MirrorKind::Meter(Some(tap)))?;
        Ok((id, receiver))
    }

    fn create_analyser(
        &mut self,
        settings: &SpectrumSettings,
    ) -> Result<(NodeId, Analyser), BackendError> {
        let (tap, analyser) = Analyser::channel(self.config.sample_rate, *settings)?;
        let id = self.add_node(MirrorKind::Analyser(Some(tap)))?;
        Ok((id, analyser))
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), BackendError> {
        if self.is_started() {
            return Err(BackendError::GraphStarted);
        }
        if from.index() >= self.nodes.len() {
            return Err(BackendError::UnknownNode(from.index()));
        }
        let target = self
            .nodes
            .get_mut(to.index())
            .ok_or(BackendError::UnknownNode(to.index()))?;
        if !target.inputs.contains(&from) {
            target.inputs.push(from);
        }
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        if let Some(mirror) = self.nodes.get_mut(node.index()) {
            mirror.released = true;
            self.send(GraphCommand::Release(node));
        }
    }

    fn set_value(&mut self, param: ParamId, value: f64) {
        let time = self.current_time();
        if let Some(automation) = self.automation_mut(param) {
            automation.set_value(value, time);
        }
        self.send(GraphCommand::SetValue { param, value, time });
    }

    fn cancel_scheduled_values(&mut self, param: ParamId, time: f64) {
        if let Some(automation) = self.automation_mut(param) {
            automation.cancel_scheduled_values(time);
        }
        self.send(GraphCommand::CancelScheduledValues { param, time });
    }

    fn linear_ramp_to_value_at_time(&mut self, param: ParamId, value: f64, end_time: f64) {
        if let Some(automation) = self.automation_mut(param) {
            automation.linear_ramp_to_value_at_time(value, end_time);
        }
        self.send(GraphCommand::LinearRamp {
            param,
            value,
            end_time,
        });
    }

    fn frequency_response(
        &self,
        filter: NodeId,
        frequency_hz: &[f32],
        magnitude: &mut [f32],
        phase: &mut [f32],
    ) {
        let sample_rate = f64::from(self.config.sample_rate);
        let coeffs = match self.nodes.get(filter.index()).map(|node| &node.kind) {
            Some(MirrorKind::Filter(params)) => Some(params.design_target(sample_rate)),
            _ => None,
        };
        for (i, &frequency) in frequency_hz.iter().enumerate() {
            let (mag, ph) = coeffs.map_or((f64::NAN, f64::NAN), |c| {
                c.response(f64::from(frequency), sample_rate)
            });
            if let Some(out) = magnitude.get_mut(i) {
                *out = mag as f32;
            }
            if let Some(out) = phase.get_mut(i) {
                *out = ph as f32;
            }
        }
    }
}
