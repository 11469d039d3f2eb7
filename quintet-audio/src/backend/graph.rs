//! Real-time audio graph
//!
//! Owned by the audio thread. Commands arrive over a bounded channel and are
//! drained at the start of every `process` call; nodes are rendered in
//! topological order into pre-allocated buffers, so the processing path
//! never allocates, locks or logs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::automation::Automation;
use super::biquad::{BiquadCoeffs, BiquadState, FilterParams};
use super::{AudioParamKind, NodeId, ParamId};
use crate::analyser::AnalyserTap;
use crate::effect::Effect;
use crate::meter::MeterTap;

/// Filter coefficients are refreshed this often (frames) while automating
const CONTROL_INTERVAL: usize = 32;

/// Control-thread to audio-thread messages
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphCommand {
    SetValue { param: ParamId, value: f64, time: f64 },
    CancelScheduledValues { param: ParamId, time: f64 },
    LinearRamp { param: ParamId, value: f64, end_time: f64 },
    Release(NodeId),
}

/// Biquad cell with per-channel state
pub(crate) struct FilterCell {
    params: FilterParams,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
    dirty: bool,
}

impl FilterCell {
    pub(crate) fn new(params: FilterParams, channels: usize) -> Self {
        Self {
            params,
            coeffs: BiquadCoeffs::IDENTITY,
            states: vec![BiquadState::default(); channels],
            dirty: true,
        }
    }

    fn process(&mut self, buffer: &mut [f32], channels: usize, start: f64, sample_rate: f64) {
        let segment_len = CONTROL_INTERVAL * channels;
        for (segment, samples) in buffer.chunks_mut(segment_len).enumerate() {
            let time = start + (segment * CONTROL_INTERVAL) as f64 / sample_rate;
            let settled = self.params.is_settled(time);
            if self.dirty || !settled {
                self.coeffs = self.params.design_at(time, sample_rate);
                self.dirty = !settled;
            }
            for frame in samples.chunks_exact_mut(channels) {
                for (sample, state) in frame.iter_mut().zip(self.states.iter_mut()) {
                    *sample = state.process(*sample, &self.coeffs);
                }
            }
        }
    }

    fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
        self.dirty = true;
    }
}

pub(crate) enum NodeKind {
    /// Copies the graph input
    Source,
    /// Sums into the graph output
    Destination,
    /// Sums its inputs and passes them on
    Junction,
    Gain(Automation),
    Filter(FilterCell),
    Meter(MeterTap),
    Analyser(AnalyserTap),
}

pub(crate) struct GraphNode {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    /// Positions of input nodes, all earlier in render order
    pub(crate) inputs: Vec<usize>,
    pub(crate) buffer: Vec<f32>,
    pub(crate) released: bool,
}

/// The audio-thread half of a [`SoftwareBackend`](super::SoftwareBackend)
pub struct AudioGraph {
    nodes: Vec<GraphNode>,
    /// Node index to render position
    positions: Vec<Option<usize>>,
    commands: Receiver<GraphCommand>,
    clock: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    sample_rate: f64,
    channels: usize,
    block_size: usize,
}

impl AudioGraph {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        nodes: Vec<GraphNode>,
        node_count: usize,
        commands: Receiver<GraphCommand>,
        clock: Arc<AtomicU64>,
        running: Arc<AtomicBool>,
        sample_rate: f64,
        channels: usize,
        block_size: usize,
    ) -> Self {
        let mut positions = vec![None; node_count];
        for (position, node) in nodes.iter().enumerate() {
            if let Some(slot) = positions.get_mut(node.id.index()) {
                *slot = Some(position);
            }
        }
        Self {
            nodes,
            positions,
            commands,
            clock,
            running,
            sample_rate,
            channels,
            block_size,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames rendered so far
    pub fn current_frame(&self) -> u64 {
        self.clock.load(Ordering::Acquire)
    }

    /// Apply every pending command
    pub fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: GraphCommand) {
        match command {
            GraphCommand::SetValue { param, value, time } => {
                if let Some(automation) = self.automation_mut(param) {
                    automation.set_value(value, time);
                }
            }
            GraphCommand::CancelScheduledValues { param, time } => {
                if let Some(automation) = self.automation_mut(param) {
                    automation.cancel_scheduled_values(time);
                }
            }
            GraphCommand::LinearRamp {
                param,
                value,
                end_time,
            } => {
                if let Some(automation) = self.automation_mut(param) {
                    automation.linear_ramp_to_value_at_time(value, end_time);
                }
            }
            GraphCommand::Release(node) => {
                if let Some(position) = self.position(node) {
                    self.nodes[position].released = true;
                }
            }
        }
    }

    fn position(&self, node: NodeId) -> Option<usize> {
        self.positions.get(node.index()).copied().flatten()
    }

    fn automation_mut(&mut self, param: ParamId) -> Option<&mut Automation> {
        let position = self.position(param.node)?;
        match (&mut self.nodes[position].kind, param.kind) {
            (NodeKind::Gain(automation), AudioParamKind::Gain) => Some(automation),
            (NodeKind::Filter(cell), kind) => {
                cell.dirty = true;
                cell.params.automation_mut(kind)
            }
            _ => None,
        }
    }

    /// Render one block of at most `block_size` frames in place
    fn render_block(&mut self, block: &mut [f32]) {
        let channels = self.channels;
        let frames = block.len() / channels;
        let len = frames * channels;
        let sample_rate = self.sample_rate;
        let start = self.clock.load(Ordering::Acquire) as f64 / sample_rate;

        for i in 0..self.nodes.len() {
            let (done, rest) = self.nodes.split_at_mut(i);
            let node = &mut rest[0];
            let buffer = &mut node.buffer[..len];
            buffer.fill(0.0);
            if node.released {
                continue;
            }

            if let NodeKind::Source = node.kind {
                buffer.copy_from_slice(&block[..len]);
            } else {
                for &input in &node.inputs {
                    for (out, &sample) in buffer.iter_mut().zip(&done[input].buffer[..len]) {
                        *out += sample;
                    }
                }
            }

            match &mut node.kind {
                NodeKind::Gain(automation) => {
                    if automation.is_settled(start) {
                        let gain = automation.target() as f32;
                        for sample in buffer.iter_mut() {
                            *sample *= gain;
                        }
                    } else {
                        for (f, frame) in buffer.chunks_exact_mut(channels).enumerate() {
                            let gain = automation.value_at(start + f as f64 / sample_rate) as f32;
                            for sample in frame {
                                *sample *= gain;
                            }
                        }
                    }
                }
                NodeKind::Filter(cell) => cell.process(buffer, channels, start, sample_rate),
                NodeKind::Meter(tap) => tap.process(buffer, channels),
                NodeKind::Analyser(tap) => tap.process(buffer, channels),
                NodeKind::Source | NodeKind::Destination | NodeKind::Junction => {}
            }
        }

        block.fill(0.0);
        for node in &self.nodes {
            if matches!(node.kind, NodeKind::Destination) && !node.released {
                for (out, &sample) in block.iter_mut().zip(&node.buffer[..len]) {
                    *out += sample;
                }
            }
        }

        self.clock.fetch_add(frames as u64, Ordering::Release);
    }
}

impl Effect for AudioGraph {
    fn process(&mut self, samples: &mut [f32]) {
        self.drain_commands();

        if !self.running.load(Ordering::Acquire) || self.channels == 0 {
            samples.fill(0.0);
            return;
        }

        let block_len = self.block_size * self.channels;
        for block in samples.chunks_mut(block_len) {
            self.render_block(block);
        }
    }

    fn reset(&mut self) {
        for node in &mut self.nodes {
            node.buffer.fill(0.0);
            match &mut node.kind {
                NodeKind::Filter(cell) => cell.reset(),
                NodeKind::Meter(tap) => tap.reset(),
                _ => {}
            }
        }
    }

    fn is_enabled(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.running.store(enabled, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "AudioGraph"
    }
}
