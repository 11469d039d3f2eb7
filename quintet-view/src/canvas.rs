//! Drawing surface seam
//!
//! [`Canvas`] is a small path-based 2D API. [`PathRecorder`] implements it by
//! recording operations, which lets hosts replay them onto a real surface.

use crate::theme::Color;

/// How painted pixels combine with what is already there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    SourceOver,
    /// `1 - (1 - a)(1 - b)`, overlapping fills lighten
    Screen,
}

pub trait Canvas {
    fn clear(&mut self, width: f64, height: f64);

    fn set_alpha(&mut self, alpha: f32);

    fn set_blend(&mut self, blend: BlendMode);

    fn set_fill(&mut self, color: Color);

    fn set_stroke(&mut self, color: Color);

    fn begin_path(&mut self);

    fn move_to(&mut self, x: f64, y: f64);

    fn line_to(&mut self, x: f64, y: f64);

    fn close_path(&mut self);

    fn fill(&mut self);

    fn stroke(&mut self);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOp {
    Clear { width: f64, height: f64 },
    SetAlpha(f32),
    SetBlend(BlendMode),
    SetFill(Color),
    SetStroke(Color),
    BeginPath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    ClosePath,
    Fill,
    Stroke,
    FillRect { x: f64, y: f64, width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    Fill,
    Stroke,
}

/// A painted path with the state it was painted in
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPath {
    pub paint: Paint,
    pub color: Color,
    pub alpha: f32,
    pub blend: BlendMode,
    pub points: Vec<(f64, f64)>,
}

/// Canvas that keeps every operation
#[derive(Debug, Default)]
pub struct PathRecorder {
    ops: Vec<DrawOp>,
}

impl PathRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn replay(&self, canvas: &mut dyn Canvas) {
        for op in &self.ops {
            match *op {
                DrawOp::Clear { width, height } => canvas.clear(width, height),
                DrawOp::SetAlpha(alpha) => canvas.set_alpha(alpha),
                DrawOp::SetBlend(blend) => canvas.set_blend(blend),
                DrawOp::SetFill(color) => canvas.set_fill(color),
                DrawOp::SetStroke(color) => canvas.set_stroke(color),
                DrawOp::BeginPath => canvas.begin_path(),
                DrawOp::MoveTo(x, y) => canvas.move_to(x, y),
                DrawOp::LineTo(x, y) => canvas.line_to(x, y),
                DrawOp::ClosePath => canvas.close_path(),
                DrawOp::Fill => canvas.fill(),
                DrawOp::Stroke => canvas.stroke(),
                DrawOp::FillRect {
                    x,
                    y,
                    width,
                    height,
                } => canvas.fill_rect(x, y, width, height),
            }
        }
    }

    /// Every filled or stroked path, in paint order
    pub fn paths(&self) -> Vec<RecordedPath> {
        let mut alpha = 1.0;
        let mut blend = BlendMode::default();
        let mut fill = Color::BLACK;
        let mut stroke = Color::BLACK;
        let mut points = Vec::new();
        let mut paths = Vec::new();

        for op in &self.ops {
            match *op {
                DrawOp::SetAlpha(value) => alpha = value,
                DrawOp::SetBlend(value) => blend = value,
                DrawOp::SetFill(color) => fill = color,
                DrawOp::SetStroke(color) => stroke = color,
                DrawOp::BeginPath => points.clear(),
                DrawOp::MoveTo(x, y) | DrawOp::LineTo(x, y) => points.push((x, y)),
                DrawOp::Fill | DrawOp::Stroke => {
                    let (paint, color) = if matches!(op, DrawOp::Fill) {
                        (Paint::Fill, fill)
                    } else {
                        (Paint::Stroke, stroke)
                    };
                    paths.push(RecordedPath {
                        paint,
                        color,
                        alpha,
                        blend,
                        points: points.clone(),
                    });
                }
                DrawOp::Clear { .. } | DrawOp::ClosePath | DrawOp::FillRect { .. } => {}
            }
        }
        paths
    }
}

impl Canvas for PathRecorder {
    fn clear(&mut self, width: f64, height: f64) {
        self.ops.push(DrawOp::Clear { width, height });
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ops.push(DrawOp::SetAlpha(alpha));
    }

    fn set_blend(&mut self, blend: BlendMode) {
        self.ops.push(DrawOp::SetBlend(blend));
    }

    fn set_fill(&mut self, color: Color) {
        self.ops.push(DrawOp::SetFill(color));
    }

    fn set_stroke(&mut self, color: Color) {
        self.ops.push(DrawOp::SetStroke(color));
    }

    fn begin_path(&mut self) {
        self.ops.push(DrawOp::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::LineTo(x, y));
    }

    fn close_path(&mut self) {
        self.ops.push(DrawOp::ClosePath);
    }

    fn fill(&mut self) {
        self.ops.push(DrawOp::Fill);
    }

    fn stroke(&mut self) {
        self.ops.push(DrawOp::Stroke);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ops.push(DrawOp::FillRect {
            x,
            y,
            width,
            height,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_capture_state() {
        let mut canvas = PathRecorder::new();
        canvas.set_alpha(0.4);
        canvas.set_blend(BlendMode::Screen);
        canvas.set_fill(Color::WHITE);
        canvas.begin_path();
        canvas.move_to(0.0, 1.0);
        canvas.line_to(2.0, 3.0);
        canvas.fill();
        canvas.stroke();

        let paths = canvas.paths();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].paint, Paint::Fill);
        assert_eq!(paths[0].color, Color::WHITE);
        assert_eq!(paths[0].alpha, 0.4);
        assert_eq!(paths[0].blend, BlendMode::Screen);
        assert_eq!(paths[0].points, [(0.0, 1.0), (2.0, 3.0)]);
        assert_eq!(paths[1].paint, Paint::Stroke);
    }

    #[test]
    fn test_replay_reproduces_ops() {
        let mut source = PathRecorder::new();
        source.clear(10.0, 5.0);
        source.fill_rect(1.0, 1.0, 2.0, 2.0);
        source.begin_path();
        source.close_path();

        let mut copy = PathRecorder::new();
        source.replay(&mut copy);
        assert_eq!(copy.ops(), source.ops());
        assert_eq!(copy.take_ops().len(), 4);
        assert!(copy.ops().is_empty());
    }
}
