//! Movement resolution. Pure: no grid, no shared state.

use crate::{config::SimConfig, input::DirectionInput, types::Vec2};

/// Axis-aligned clamp region for agent centres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl MoveBounds {
    /// `[margin, extent - margin]` on both axes.
    pub fn from_config(config: &SimConfig) -> Self {
        let (w, h) = config.extent();
        let m = config.border_margin;
        Self {
            min_x: m,
            min_y: m,
            max_x: w - m,
            max_y: h - m,
        }
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        (self.min_x..=self.max_x).contains(&pos.x) && (self.min_y..=self.max_y).contains(&pos.y)
    }
}

/// Candidate position after one tick of `input`.
///
/// Each held direction moves `speed` along its axis; opposite directions
/// cancel. The result is clamped into `bounds` axis by axis.
pub fn resolve(current: Vec2, input: DirectionInput, speed: f32, bounds: &MoveBounds) -> Vec2 {
    let mut next = current;
    if input.left  { next.x -= speed; }
    if input.right { next.x += speed; }
    if input.up    { next.y -= speed; }
    if input.down  { next.y += speed; }

    Vec2::new(
        next.x.clamp(bounds.min_x, bounds.max_x),
        next.y.clamp(bounds.min_y, bounds.max_y),
    )
}
