//! Audio engine for Quintet - a five-band filter bank
//!
//! This module provides the processing chain and its control surface:
//! - Backend: the audio graph seam, plus a software graph that renders offline or on an audio thread
//! - Bypass: click-free dry/wet crossfades around every filter cell
//! - Stages: high-pass, low-shelf, peaking, high-shelf and low-pass
//! - Bank: the fixed stage chain with master gain, meter and analyser taps
//! - Preset: the parameter set and its JSON form

pub mod backend;
mod analyser;
mod bank;
mod bypass;
mod config;
mod effect;
mod error;
mod gain;
mod meter;
mod preset;
mod stage;

pub use analyser::{Analyser, AnalyserTap};
pub use backend::{
    AudioBackend, AudioGraph, AudioParamKind, EngineConfig, FilterKind, GraphCommand, NodeId,
    ParamId, ParamRamp, SharedBackend, SoftwareBackend,
};
pub use bank::{BankChange, FilterBank};
pub use bypass::{BypassState, BypassSwitch};
pub use config::{BankConfig, MeterSettings};
pub use effect::Effect;
pub use error::{BackendError, BankError, PresetError};
pub use gain::{db_to_gain, gain_to_db, DEFAULT_INTERPOLATION_TIME, SILENCE_GAIN};
pub use meter::{MeterReceiver, MeterSnapshot, MeterTap, PeakMeter, MAX_METER_CHANNELS};
pub use preset::{
    MainParameters, PassParameters, PeakingParameters, Preset, PresetData, ShelfParameters,
};
pub use stage::{FilterStage, PassStage, PeakingStage, ShelfStage, Stage, StageKind};
