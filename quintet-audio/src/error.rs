//! Error types for the filter bank

use quintet_analysis::SpectrumError;
use thiserror::Error;

/// Failures reported by an audio backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend cannot provide {0}")]
    MissingResource(&'static str),
    #[error("Audio graph already started, topology is frozen")]
    GraphStarted,
    #[error("Unknown node {0}")]
    UnknownNode(usize),
    #[error("Analyser error: {0}")]
    Analyser(#[from] SpectrumError),
}

/// Preset persistence failures
#[derive(Error, Debug)]
pub enum PresetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid preset: {0}")]
    Json(#[from] serde_json::Error),
}

/// Filter bank failures
#[derive(Error, Debug)]
pub enum BankError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),
}
