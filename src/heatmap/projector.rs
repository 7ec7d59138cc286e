//! Heatmap projection: recorded positions → screen-space points.

use serde::Serialize;

use crate::heatmap::filter::FixedPositionMode;
use crate::heatmap::model::HeatmapRecord;

/// What the overlay currently looks like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub scroll_y: f64,
    pub window_width: f64,
    pub fixed_position_mode: FixedPositionMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projection {
    pub points: Vec<ProjectedPoint>,
    pub max_value: u64,
}

impl Projection {
    /// Point intensities in `0.0..=1.0`, relative to the hottest point.
    pub fn normalized(&self) -> Vec<f64> {
        if self.max_value == 0 {
            return vec![0.0; self.points.len()];
        }
        let max = self.max_value as f64;
        self.points.iter().map(|p| p.value as f64 / max).collect()
    }
}

pub fn project(records: &[HeatmapRecord], ctx: &RenderContext) -> Projection {
    let mut points = Vec::with_capacity(records.len());

    for record in records {
        match *record {
            HeatmapRecord::ScrollDepth {
                scroll_depth_bucket,
                cumulative_count,
            } => points.push(ProjectedPoint {
                x: 0.0,
                y: scroll_depth_bucket,
                value: cumulative_count,
            }),
            HeatmapRecord::Pointer {
                count,
                pointer_relative_x,
                pointer_y,
                ..
            } => {
                let y = if record.is_fixed() {
                    match ctx.fixed_position_mode {
                        FixedPositionMode::Hidden => continue,
                        FixedPositionMode::Fixed => pointer_y,
                        FixedPositionMode::Relative => pointer_y - ctx.scroll_y,
                    }
                } else {
                    pointer_y - ctx.scroll_y
                };
                points.push(ProjectedPoint {
                    x: (pointer_relative_x * ctx.window_width).round(),
                    y,
                    value: count,
                });
            }
        }
    }

    let max_value = points.iter().map(|p| p.value).max().unwrap_or(0);
    Projection { points, max_value }
}
