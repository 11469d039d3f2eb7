//! Segmented peak meter
//!
//! Sixteen segments per channel in 3 dB steps, the top one lighting at
//! +3 dB. A held peak lights its own segment in the hold color.

use quintet_audio::{gain_to_db, PeakMeter};

use crate::canvas::Canvas;
use crate::theme::{Color, Theme};

pub const METER_SEGMENTS: usize = 16;
pub const METER_STEP_DB: f32 = 3.0;
pub const METER_MAX_DB: f32 = 3.0;

const GAP: f64 = 1.0;

/// Meter layout within a `width` x `height` area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterView {
    width: f64,
    height: f64,
}

impl MeterView {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Level at which `segment` (0 = bottom) lights
    pub fn segment_db(segment: usize) -> f32 {
        METER_MAX_DB - (METER_SEGMENTS - 1 - segment) as f32 * METER_STEP_DB
    }

    /// Number of segments lit by a linear level
    pub fn lit_segments(level: f32) -> usize {
        let db = gain_to_db(f64::from(level)) as f32;
        (0..METER_SEGMENTS)
            .take_while(|&segment| db >= Self::segment_db(segment))
            .count()
    }

    fn segment_color(theme: &Theme, segment: usize) -> Color {
        let db = Self::segment_db(segment);
        if db > 0.0 {
            theme.meter_clip
        } else if db > -6.0 {
            theme.meter_hot
        } else {
            theme.meter_normal
        }
    }

    pub fn render_meter(&self, canvas: &mut dyn Canvas, meter: &PeakMeter, theme: &Theme) {
        self.render(canvas, meter.peaks(), meter.holds(), theme);
    }

    /// One column per channel; `holds` may be shorter than `peaks`
    pub fn render(&self, canvas: &mut dyn Canvas, peaks: &[f32], holds: &[f32], theme: &Theme) {
        canvas.clear(self.width, self.height);
        if peaks.is_empty() {
            return;
        }
        let channels = peaks.len() as f64;
        let column = (self.width - GAP * (channels - 1.0)) / channels;
        let segment_height =
            (self.height - GAP * (METER_SEGMENTS as f64 - 1.0)) / METER_SEGMENTS as f64;

        for (channel, &peak) in peaks.iter().enumerate() {
            let x = channel as f64 * (column + GAP);
            let lit = Self::lit_segments(peak);
            let held = holds
                .get(channel)
                .map(|&hold| Self::lit_segments(hold))
                .filter(|&segments| segments > 0)
                .map(|segments| segments - 1);

            for segment in 0..METER_SEGMENTS {
                let color = if held == Some(segment) {
                    theme.meter_hold
                } else if segment < lit {
                    Self::segment_color(theme, segment)
                } else {
                    theme.meter_off
                };
                let y = self.height - (segment + 1) as f64 * segment_height - segment as f64 * GAP;
                canvas.set_fill(color);
                canvas.fill_rect(x, y, column, segment_height);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawOp, PathRecorder};

    #[test]
    fn test_scale() {
        assert_eq!(MeterView::segment_db(METER_SEGMENTS - 1), 3.0);
        assert_eq!(MeterView::segment_db(0), -42.0);
    }

    #[test]
    fn test_lit_segments() {
        assert_eq!(MeterView::lit_segments(0.0), 0);
        assert_eq!(MeterView::lit_segments(1.0), 15);
        assert_eq!(MeterView::lit_segments(2.0), 16);
        // -12 dB reaches the -12 dB segment
        assert_eq!(MeterView::lit_segments(0.251_188_7), 11);
    }

    #[test]
    fn test_render_columns_and_hold() {
        let view = MeterView::new(33.0, 31.0);
        let mut canvas = PathRecorder::new();
        let theme = Theme::default();
        view.render(&mut canvas, &[1.0, 0.0], &[1.5], &theme);

        let rects: Vec<_> = canvas
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::FillRect { .. }))
            .collect();
        assert_eq!(rects.len(), 2 * METER_SEGMENTS);
        assert_eq!(
            *rects[0],
            DrawOp::FillRect {
                x: 0.0,
                y: 30.0,
                width: 16.0,
                height: 1.0
            }
        );

        let fills: Vec<Color> = canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::SetFill(color) => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(fills[0], theme.meter_normal);
        assert_eq!(fills[13], theme.meter_hot);
        // 1.5 is +3.5 dB
        assert_eq!(fills[15], theme.meter_hold);
        assert_eq!(fills[14], theme.meter_hot);
        assert!(fills[16..].iter().all(|&color| color == theme.meter_off));
    }
}
