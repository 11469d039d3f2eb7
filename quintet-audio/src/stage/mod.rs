//! Filter stages
//!
//! A stage binds one parameter group to a chain of filter cells. Each cell
//! sits inside a [`BypassSwitch`]; parameter changes are pushed to the
//! backend as ramps and announced on the bank's change observable.

mod pass;
mod peaking;
mod shelf;

use std::cell::Cell;
use std::rc::{Rc, Weak};

use quintet_params::{Observable, Parameter, Subscription, Terminable};

use crate::backend::{
    AudioBackend, AudioParamKind, FilterKind, NodeId, ParamId, ParamRamp, SharedBackend,
};
use crate::bank::BankChange;
use crate::bypass::BypassSwitch;
use crate::error::BackendError;
use crate::gain::gain_to_db;

pub use pass::PassStage;
pub use peaking::PeakingStage;
pub use shelf::ShelfStage;

/// Stage slot in the bank, in signal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    HighPass,
    LowShelf,
    Peaking,
    HighShelf,
    LowPass,
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        StageKind::HighPass,
        StageKind::LowShelf,
        StageKind::Peaking,
        StageKind::HighShelf,
        StageKind::LowPass,
    ];

    /// Position in the chain
    pub fn index(self) -> usize {
        match self {
            StageKind::HighPass => 0,
            StageKind::LowShelf => 1,
            StageKind::Peaking => 2,
            StageKind::HighShelf => 3,
            StageKind::LowPass => 4,
        }
    }

    pub fn filter_kind(self) -> FilterKind {
        match self {
            StageKind::HighPass => FilterKind::HighPass,
            StageKind::LowShelf => FilterKind::LowShelf,
            StageKind::Peaking => FilterKind::Peaking,
            StageKind::HighShelf => FilterKind::HighShelf,
            StageKind::LowPass => FilterKind::LowPass,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StageKind::HighPass => "High Pass",
            StageKind::LowShelf => "Low Shelf",
            StageKind::Peaking => "Peaking",
            StageKind::HighShelf => "High Shelf",
            StageKind::LowPass => "Low Pass",
        }
    }
}

/// What renderers need from a stage
pub trait Stage {
    fn kind(&self) -> StageKind;

    fn enabled(&self) -> bool;

    /// Center or corner frequency in Hz
    fn frequency(&self) -> f64;

    /// Response in dB at [`Stage::frequency`], NaN if undefined
    fn apex_decibel(&self) -> f64;

    /// Response in dB and phase in radians for each frequency
    fn frequency_response(&self, frequency_hz: &[f32], magnitude_db: &mut [f32], phase: &mut [f32]);
}

/// Shared by a stage and the parameter callbacks that drive it
pub(crate) struct StageContext {
    pub(crate) backend: SharedBackend,
    pub(crate) ramp: ParamRamp,
    pub(crate) changes: Observable<BankChange>,
}

/// Backend side of a stage: filter cells, their switches and the stage output
pub(crate) struct StageCore {
    kind: StageKind,
    backend: SharedBackend,
    ramp: ParamRamp,
    changes: Observable<BankChange>,
    filters: Vec<NodeId>,
    switches: Vec<BypassSwitch>,
    joints: Vec<NodeId>,
    output: NodeId,
    enabled: Cell<bool>,
    active_cells: Cell<usize>,
    released: Cell<bool>,
}

impl StageCore {
    /// Create `cells` filters in series after `input`
    ///
    /// Cells are joined by unity gains; the last one feeds the stage output.
    pub(crate) fn build(
        kind: StageKind,
        context: &StageContext,
        input: NodeId,
        cells: usize,
        enabled: bool,
        active_cells: usize,
    ) -> Result<Rc<Self>, BackendError> {
        let mut filters = Vec::with_capacity(cells);
        let mut switches = Vec::with_capacity(cells);
        let mut joints = Vec::with_capacity(cells);
        let output = {
            let mut backend = context.backend.borrow_mut();
            let output = backend.create_gain(1.0)?;
            let mut previous = input;
            for cell in 0..cells {
                let last = cell + 1 == cells;
                match connect_cell(&mut *backend, kind, previous, output, last) {
                    Ok((filter, joint, switch)) => {
                        filters.push(filter);
                        switches.push(switch);
                        joints.extend(joint);
                        previous = joint.unwrap_or(output);
                    }
                    Err(error) => {
                        for switch in &switches {
                            switch.release(&mut *backend);
                        }
                        for &node in filters.iter().chain(&joints) {
                            backend.release(node);
                        }
                        backend.release(output);
                        return Err(error);
                    }
                }
            }
            output
        };

        let core = Rc::new(Self {
            kind,
            backend: Rc::clone(&context.backend),
            ramp: context.ramp,
            changes: context.changes.clone(),
            filters,
            switches,
            joints,
            output,
            enabled: Cell::new(enabled),
            active_cells: Cell::new(active_cells),
            released: Cell::new(false),
        });
        core.update_bypass();
        Ok(core)
    }

    pub(crate) fn output(&self) -> NodeId {
        self.output
    }

    #[cfg(test)]
    pub(crate) fn filters(&self) -> &[NodeId] {
        &self.filters
    }

    #[cfg(test)]
    pub(crate) fn switches(&self) -> &[BypassSwitch] {
        &self.switches
    }

    /// Ramp one filter parameter on every cell, bypassed or not
    pub(crate) fn set_param(&self, kind: AudioParamKind, value: f64) {
        let mut backend = self.backend.borrow_mut();
        for &filter in &self.filters {
            self.ramp.apply(&mut *backend, ParamId::new(filter, kind), value);
        }
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
        self.update_bypass();
    }

    pub(crate) fn set_active_cells(&self, active_cells: usize) {
        self.active_cells.set(active_cells);
        self.update_bypass();
    }

    /// Cell `i` is active iff the stage is enabled and `i < active_cells`
    pub(crate) fn update_bypass(&self) {
        let enabled = self.enabled.get();
        let active_cells = self.active_cells.get();
        let mut backend = self.backend.borrow_mut();
        for (cell, switch) in self.switches.iter().enumerate() {
            switch.set_bypassed(&mut *backend, &self.ramp, !enabled || cell >= active_cells);
        }
    }

    /// Response of the first cell in dB, scaled by `cascade`
    pub(crate) fn response(
        &self,
        frequency_hz: &[f32],
        magnitude_db: &mut [f32],
        phase: &mut [f32],
        cascade: f32,
    ) {
        let Some(&filter) = self.filters.first() else {
            magnitude_db.fill(f32::NAN);
            phase.fill(f32::NAN);
            return;
        };
        self.backend
            .borrow()
            .frequency_response(filter, frequency_hz, magnitude_db, phase);
        for value in magnitude_db.iter_mut() {
            *value = gain_to_db(f64::from(*value)) as f32 * cascade;
        }
    }

    pub(crate) fn notify(&self) {
        self.changes.notify(&BankChange {
            stage: Some(self.kind),
        });
    }

    /// Release every node this stage created; later calls are no-ops
    pub(crate) fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        let mut backend = self.backend.borrow_mut();
        for switch in &self.switches {
            switch.release(&mut *backend);
        }
        for &node in self.filters.iter().chain(&self.joints) {
            backend.release(node);
        }
        backend.release(self.output);
    }
}

/// One filter behind a bypass switch, followed by a unity joint unless it
/// is the `last` cell
fn connect_cell(
    backend: &mut dyn AudioBackend,
    kind: StageKind,
    input: NodeId,
    output: NodeId,
    last: bool,
) -> Result<(NodeId, Option<NodeId>, BypassSwitch), BackendError> {
    let filter = backend.create_filter(kind.filter_kind())?;
    let joint = if last {
        None
    } else {
        match backend.create_gain(1.0) {
            Ok(joint) => Some(joint),
            Err(error) => {
                backend.release(filter);
                return Err(error);
            }
        }
    };
    match BypassSwitch::connect(backend, input, filter, joint.unwrap_or(output)) {
        Ok(switch) => Ok((filter, joint, switch)),
        Err(error) => {
            for node in std::iter::once(filter).chain(joint) {
                backend.release(node);
            }
            Err(error)
        }
    }
}

/// Apply the current value now, then follow every change
///
/// The callback holds the core weakly so a dropped stage silences it. Every
/// followed change is announced on the bank's change observable.
pub(crate) fn follow<T: Copy + PartialEq + 'static>(
    core: &Rc<StageCore>,
    parameter: &Parameter<T>,
    apply: impl Fn(&StageCore, T) + 'static,
) -> Subscription {
    apply(core, parameter.get());
    watch(core, parameter, apply)
}

/// Follow changes without applying the current value
pub(crate) fn watch<T: Copy + PartialEq + 'static>(
    core: &Rc<StageCore>,
    parameter: &Parameter<T>,
    apply: impl Fn(&StageCore, T) + 'static,
) -> Subscription {
    let core: Weak<StageCore> = Rc::downgrade(core);
    parameter.subscribe(
        move |parameter| {
            if let Some(core) = core.upgrade() {
                apply(&core, parameter.get());
                core.notify();
            }
        },
        false,
    )
}

/// One of the five stages
pub enum FilterStage {
    Pass(PassStage),
    Shelf(ShelfStage),
    Peaking(PeakingStage),
}

impl FilterStage {
    /// Node the next stage connects to
    pub fn output(&self) -> NodeId {
        match self {
            FilterStage::Pass(stage) => stage.output(),
            FilterStage::Shelf(stage) => stage.output(),
            FilterStage::Peaking(stage) => stage.output(),
        }
    }

    fn as_stage(&self) -> &dyn Stage {
        match self {
            FilterStage::Pass(stage) => stage,
            FilterStage::Shelf(stage) => stage,
            FilterStage::Peaking(stage) => stage,
        }
    }
}

impl Stage for FilterStage {
    fn kind(&self) -> StageKind {
        self.as_stage().kind()
    }

    fn enabled(&self) -> bool {
        self.as_stage().enabled()
    }

    fn frequency(&self) -> f64 {
        self.as_stage().frequency()
    }

    fn apex_decibel(&self) -> f64 {
        self.as_stage().apex_decibel()
    }

    fn frequency_response(&self, frequency_hz: &[f32], magnitude_db: &mut [f32], phase: &mut [f32]) {
        self.as_stage()
            .frequency_response(frequency_hz, magnitude_db, phase)
    }
}

impl Terminable for FilterStage {
    fn terminate(&mut self) {
        match self {
            FilterStage::Pass(stage) => stage.terminate(),
            FilterStage::Shelf(stage) => stage.terminate(),
            FilterStage::Peaking(stage) => stage.terminate(),
        }
    }
}
