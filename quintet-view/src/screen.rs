//! Pixel to unit mapping of a plot area

use std::fmt;

use quintet_params::{Exponential, Linear, ValueMapping};

const MIN_FREQUENCY: f64 = 20.0;
const MAX_FREQUENCY: f64 = 20000.0;

/// A plot area: `x_axis` maps `[0, width]`, `y_axis` maps `[0, height]`
///
/// Pixel y grows downwards, so vertical axes list their top value first.
pub struct Screen {
    width: f64,
    height: f64,
    x_axis: Box<dyn ValueMapping<f64>>,
    y_axis: Box<dyn ValueMapping<f64>>,
}

impl Screen {
    pub fn new(
        width: f64,
        height: f64,
        x_axis: impl ValueMapping<f64> + 'static,
        y_axis: impl ValueMapping<f64> + 'static,
    ) -> Self {
        Self {
            width,
            height,
            x_axis: Box::new(x_axis),
            y_axis: Box::new(y_axis),
        }
    }

    /// 20 Hz - 20 kHz by +40 dB - -40 dB
    pub fn response(width: f64, height: f64) -> Self {
        Self::new(
            width,
            height,
            Exponential::new(MIN_FREQUENCY, MAX_FREQUENCY),
            Linear::new(40.0, -40.0),
        )
    }

    /// 20 Hz - 20 kHz by -6 dB - -72 dB
    pub fn spectrum(width: f64, height: f64) -> Self {
        Self::new(
            width,
            height,
            Exponential::new(MIN_FREQUENCY, MAX_FREQUENCY),
            Linear::new(-6.0, -72.0),
        )
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn x_to_unit(&self, x: f64) -> f64 {
        self.x_axis.from_normalized(x / self.width)
    }

    pub fn unit_to_x(&self, value: f64) -> f64 {
        self.x_axis.to_normalized(value) * self.width
    }

    pub fn y_to_unit(&self, y: f64) -> f64 {
        self.y_axis.from_normalized(y / self.height)
    }

    pub fn unit_to_y(&self, value: f64) -> f64 {
        self.y_axis.to_normalized(value) * self.height
    }
}

impl fmt::Debug for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
