//! Live spectrum overlay
//!
//! FFT bins are linear in frequency while the screen is logarithmic: many
//! high bins land in one pixel column and are merged, keeping the quietest.
//! Sparse low bins are joined with a cosine ease.

use std::f64::consts::PI;

use crate::canvas::{BlendMode, Canvas};
use crate::screen::Screen;
use crate::theme::Theme;

/// Cosine interpolation between `y1` (`mu = 0`) and `y2` (`mu = 1`)
pub fn cosine(y1: f64, y2: f64, mu: f64) -> f64 {
    let mu2 = (1.0 - (mu * PI).cos()) * 0.5;
    y1 * (1.0 - mu2) + y2 * mu2
}

/// Columns further apart than this are eased instead of joined directly
const STRAIGHT_SPAN: f64 = 2.0;

pub struct SpectrumRenderer {
    screen: Screen,
}

impl SpectrumRenderer {
    pub fn new(screen: Screen) -> Self {
        Self { screen }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.screen.resize(width, height);
    }

    /// Draw `spectrum` (dB per bin, `bin_width` Hz apart)
    pub fn render(&self, canvas: &mut dyn Canvas, spectrum: &[f32], bin_width: f32, theme: &Theme) {
        let screen = &self.screen;
        let width = screen.width();
        let height = screen.height();
        let y = |db: f32| screen.unit_to_y(f64::from(db));

        canvas.clear(width, height);
        let Some(&first) = spectrum.first() else {
            return;
        };
        canvas.set_alpha(1.0);
        canvas.set_blend(BlendMode::SourceOver);
        canvas.set_stroke(theme.spectrum_stroke);
        canvas.set_fill(theme.spectrum_fill);
        canvas.begin_path();
        canvas.move_to(-1.0, height);
        canvas.line_to(-1.0, y(first));

        let mut x0 = 0.0;
        let mut last = first;
        let mut quietest = first;
        for (bin, &energy) in spectrum.iter().enumerate().skip(1) {
            quietest = quietest.min(energy);
            let mut x1 = screen
                .unit_to_x(bin as f64 * f64::from(bin_width))
                .floor();
            let reached_edge = x1 >= width;
            if reached_edge {
                x1 = width;
            }
            if x0 < x1 {
                let span = x1 - x0;
                if span <= STRAIGHT_SPAN {
                    canvas.line_to(x1, y(quietest));
                } else {
                    let (y1, y2) = (y(last), y(quietest));
                    for step in 1..=span as usize {
                        let offset = step as f64;
                        canvas.line_to(x0 + offset, cosine(y1, y2, offset / span));
                    }
                }
                last = quietest;
                quietest = f32::INFINITY;
            }
            x0 = x1;
            if reached_edge {
                break;
            }
        }

        canvas.line_to(width, height);
        canvas.close_path();
        canvas.fill();
        canvas.stroke();
    }
}
