//! Filter bank parameter set
//!
//! A [`Preset`] owns every parameter of the bank, grouped per stage. Groups
//! are cheap to clone: clones share the same parameters.

use std::f64::consts::FRAC_1_SQRT_2;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use quintet_params::{
    BoolParameter, BooleanMapping, Exponential, FloatParameter, IntParameter, IntegerLinear,
    Linear, Parameter, PrintMapping, ValueMapping, Volume,
};
use serde::{Deserialize, Serialize};

use crate::error::PresetError;

const MIN_FREQUENCY: f64 = 20.0;
const MAX_FREQUENCY: f64 = 20000.0;
const MAX_ORDER: i32 = 4;

fn enabled_parameter(value: bool) -> Rc<BoolParameter> {
    Rc::new(Parameter::new(BooleanMapping, PrintMapping::boolean("On", "Off"), value))
}

fn frequency_parameter(value: f64) -> Rc<FloatParameter> {
    Rc::new(Parameter::new(
        Exponential::new(MIN_FREQUENCY, MAX_FREQUENCY),
        PrintMapping::small_float(1, "Hz"),
        value,
    ))
}

fn q_parameter() -> Rc<FloatParameter> {
    Rc::new(Parameter::new(
        Exponential::new(0.01, 10.0),
        PrintMapping::float(2, "", ""),
        FRAC_1_SQRT_2,
    ))
}

fn stage_gain_parameter() -> Rc<FloatParameter> {
    Rc::new(Parameter::new(Linear::new(-40.0, 40.0), PrintMapping::float(1, "", "dB"), 0.0))
}

fn default_frequency(normalized: f64) -> f64 {
    Exponential::new(MIN_FREQUENCY, MAX_FREQUENCY).from_normalized(normalized)
}

/// Master gain and bypass
#[derive(Clone, Debug)]
pub struct MainParameters {
    pub gain: Rc<FloatParameter>,
    pub bypass: Rc<BoolParameter>,
}

impl Default for MainParameters {
    fn default() -> Self {
        Self {
            gain: Rc::new(Parameter::new(Volume::fader(), PrintMapping::float(1, "", "dB"), 0.0)),
            bypass: Rc::new(Parameter::new(
                BooleanMapping,
                PrintMapping::boolean("Bypass", "On"),
                false,
            )),
        }
    }
}

/// High-pass / low-pass group
#[derive(Clone, Debug)]
pub struct PassParameters {
    pub enabled: Rc<BoolParameter>,
    pub frequency: Rc<FloatParameter>,
    pub order: Rc<IntParameter>,
    pub q: Rc<FloatParameter>,
}

impl PassParameters {
    pub fn new(frequency: f64) -> Self {
        Self {
            enabled: enabled_parameter(true),
            frequency: frequency_parameter(frequency),
            order: Rc::new(Parameter::new(
                IntegerLinear::new(1, MAX_ORDER),
                PrintMapping::integer(""),
                MAX_ORDER,
            )),
            q: q_parameter(),
        }
    }
}

/// Low-shelf / high-shelf group
#[derive(Clone, Debug)]
pub struct ShelfParameters {
    pub enabled: Rc<BoolParameter>,
    pub frequency: Rc<FloatParameter>,
    pub gain: Rc<FloatParameter>,
}

impl ShelfParameters {
    pub fn new(frequency: f64) -> Self {
        Self {
            enabled: enabled_parameter(true),
            frequency: frequency_parameter(frequency),
            gain: stage_gain_parameter(),
        }
    }
}

/// Peaking group
#[derive(Clone, Debug)]
pub struct PeakingParameters {
    pub enabled: Rc<BoolParameter>,
    pub frequency: Rc<FloatParameter>,
    pub gain: Rc<FloatParameter>,
    pub q: Rc<FloatParameter>,
}

impl PeakingParameters {
    pub fn new(frequency: f64) -> Self {
        Self {
            enabled: enabled_parameter(true),
            frequency: frequency_parameter(frequency),
            gain: stage_gain_parameter(),
            q: q_parameter(),
        }
    }
}

/// Every parameter of a filter bank
#[derive(Clone, Debug)]
pub struct Preset {
    pub main: MainParameters,
    pub high_pass: PassParameters,
    pub low_shelf: ShelfParameters,
    pub peaking: PeakingParameters,
    pub high_shelf: ShelfParameters,
    pub low_pass: PassParameters,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            main: MainParameters::default(),
            high_pass: PassParameters::new(MIN_FREQUENCY),
            low_shelf: ShelfParameters::new(default_frequency(0.25)),
            peaking: PeakingParameters::new(default_frequency(0.5)),
            high_shelf: ShelfParameters::new(default_frequency(0.75)),
            low_pass: PassParameters::new(MAX_FREQUENCY),
        }
    }
}

impl Preset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the raw domain values
    pub fn serialize(&self) -> PresetData {
        PresetData {
            main: MainData {
                gain: self.main.gain.get(),
                bypass: self.main.bypass.get(),
            },
            high_pass: PassData::read(&self.high_pass),
            low_shelf: ShelfData::read(&self.low_shelf),
            peaking: PeakingData {
                enabled: self.peaking.enabled.get(),
                frequency: self.peaking.frequency.get(),
                gain: self.peaking.gain.get(),
                q: self.peaking.q.get(),
            },
            high_shelf: ShelfData::read(&self.high_shelf),
            low_pass: PassData::read(&self.low_pass),
        }
    }

    /// Apply a snapshot; values already in place cause no notifications
    pub fn deserialize(&self, data: &PresetData) {
        self.main.gain.set(data.main.gain);
        self.main.bypass.set(data.main.bypass);
        data.high_pass.write(&self.high_pass);
        data.low_shelf.write(&self.low_shelf);
        self.peaking.enabled.set(data.peaking.enabled);
        self.peaking.frequency.set(data.peaking.frequency);
        self.peaking.gain.set(data.peaking.gain);
        self.peaking.q.set(data.peaking.q);
        data.high_shelf.write(&self.high_shelf);
        data.low_pass.write(&self.low_pass);
    }

    /// Return every parameter to its default
    pub fn reset(&self) {
        self.deserialize(&Preset::default().serialize());
    }

    pub fn to_json(&self) -> Result<String, PresetError> {
        Ok(serde_json::to_string_pretty(&self.serialize())?)
    }

    pub fn apply_json(&self, json: &str) -> Result<(), PresetError> {
        let data: PresetData = serde_json::from_str(json)?;
        self.deserialize(&data);
        Ok(())
    }

    /// Write the preset as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), PresetError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "preset saved");
        Ok(())
    }

    /// Read a JSON preset and apply it
    pub fn load(&self, path: &Path) -> Result<(), PresetError> {
        let json = fs::read_to_string(path)?;
        self.apply_json(&json)?;
        tracing::info!(path = %path.display(), "preset loaded");
        Ok(())
    }
}

/// Serialized form of a [`Preset`]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PresetData {
    pub main: MainData,
    pub high_pass: PassData,
    pub low_shelf: ShelfData,
    pub peaking: PeakingData,
    pub high_shelf: ShelfData,
    pub low_pass: PassData,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MainData {
    /// `null` in JSON stands for silence
    #[serde(with = "decibels")]
    pub gain: f64,
    pub bypass: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PassData {
    pub enabled: bool,
    pub frequency: f64,
    pub order: i32,
    pub q: f64,
}

impl PassData {
    fn read(group: &PassParameters) -> Self {
        Self {
            enabled: group.enabled.get(),
            frequency: group.frequency.get(),
            order: group.order.get(),
            q: group.q.get(),
        }
    }

    fn write(&self, group: &PassParameters) {
        group.enabled.set(self.enabled);
        group.frequency.set(self.frequency);
        group.order.set(self.order);
        group.q.set(self.q);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ShelfData {
    pub enabled: bool,
    pub frequency: f64,
    pub gain: f64,
}

impl ShelfData {
    fn read(group: &ShelfParameters) -> Self {
        Self {
            enabled: group.enabled.get(),
            frequency: group.frequency.get(),
            gain: group.gain.get(),
        }
    }

    fn write(&self, group: &ShelfParameters) {
        group.enabled.set(self.enabled);
        group.frequency.set(self.frequency);
        group.gain.set(self.gain);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PeakingData {
    pub enabled: bool,
    pub frequency: f64,
    pub gain: f64,
    pub q: f64,
}

/// JSON has no infinities: silence travels as `null`
mod decibels {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}
