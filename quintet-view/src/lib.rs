//! Drawing for Quintet
//!
//! Renderers paint onto any [`Canvas`]; a [`Screen`] maps between pixels and
//! the plotted units (Hz horizontally, dB vertically).

mod canvas;
mod meter;
mod response;
mod screen;
mod spectrum;
mod theme;

pub use canvas::{BlendMode, Canvas, DrawOp, Paint, PathRecorder, RecordedPath};
pub use meter::{MeterView, METER_MAX_DB, METER_SEGMENTS, METER_STEP_DB};
pub use response::ResponseRenderer;
pub use screen::Screen;
pub use spectrum::{cosine, SpectrumRenderer};
pub use theme::{Color, Theme};
