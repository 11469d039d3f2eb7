//! Filter bank response plot
//!
//! Each enabled stage is filled from the 0 dB line up to its own curve with
//! screen blending; the summed response of the bank is stroked on top.

use quintet_audio::Stage;

use crate::canvas::{BlendMode, Canvas};
use crate::screen::Screen;
use crate::theme::Theme;

const STAGE_ALPHA: f32 = 0.4;

pub struct ResponseRenderer {
    screen: Screen,
    /// One bin per pixel column, including the right edge
    frequencies: Vec<f32>,
    magnitude: Vec<f32>,
    phase: Vec<f32>,
    sum: Vec<f32>,
}

impl ResponseRenderer {
    pub fn new(screen: Screen) -> Self {
        let mut renderer = Self {
            screen,
            frequencies: Vec::new(),
            magnitude: Vec::new(),
            phase: Vec::new(),
            sum: Vec::new(),
        };
        renderer.rebuild_grid();
        renderer
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.screen.resize(width, height);
        self.rebuild_grid();
    }

    fn rebuild_grid(&mut self) {
        let bins = self.screen.width().max(0.0) as usize + 1;
        self.frequencies = (0..bins)
            .map(|x| self.screen.x_to_unit(x as f64) as f32)
            .collect();
        self.magnitude = vec![0.0; bins];
        self.phase = vec![0.0; bins];
        self.sum = vec![0.0; bins];
    }

    /// Grid frequencies in Hz
    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    /// Bank response in dB per bin, as of the last render
    pub fn summed_response(&self) -> &[f32] {
        &self.sum
    }

    pub fn render<S: Stage>(&mut self, canvas: &mut dyn Canvas, stages: &[S], theme: &Theme) {
        let screen = &self.screen;
        let width = screen.width();
        let baseline = screen.unit_to_y(0.0);

        canvas.clear(width, screen.height());
        canvas.set_alpha(STAGE_ALPHA);
        canvas.set_blend(BlendMode::Screen);
        self.sum.fill(0.0);

        for stage in stages.iter().filter(|stage| stage.enabled()) {
            stage.frequency_response(&self.frequencies, &mut self.magnitude, &mut self.phase);

            // the sampled grid can miss a narrow peak
            let apex = stage.apex_decibel();
            if !apex.is_nan() {
                let center = screen.unit_to_x(stage.frequency()).round();
                if let Some(bin) = self.magnitude.get_mut(center as usize) {
                    *bin = apex as f32;
                }
            }

            canvas.set_fill(theme.stage(stage.kind().index()));
            canvas.begin_path();
            canvas.move_to(0.0, baseline);
            for (x, (&db, sum)) in self.magnitude.iter().zip(self.sum.iter_mut()).enumerate() {
                let db = if db.is_nan() { 0.0 } else { db };
                *sum += db;
                canvas.line_to(x as f64, screen.unit_to_y(f64::from(db)));
            }
            canvas.line_to(width, baseline);
            canvas.close_path();
            canvas.fill();
        }

        canvas.set_alpha(1.0);
        canvas.set_blend(BlendMode::SourceOver);
        canvas.set_stroke(theme.outline);
        canvas.begin_path();
        for (x, &db) in self.sum.iter().enumerate() {
            let y = screen.unit_to_y(f64::from(db));
            if x == 0 {
                canvas.move_to(0.0, y);
            } else {
                canvas.line_to(x as f64, y);
            }
        }
        canvas.stroke();
    }
}
