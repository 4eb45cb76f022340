//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};

/// One iteration of a worker loop.
pub type Tick = u64;

/// A level's running lifetime, from worker spawn to worker join.
/// Strictly increasing for the life of a `LevelLifecycle`.
pub type Epoch = u64;

/// Zero-based index into a `LevelSource`.
pub type LevelIndex = usize;

/// The canonical run identifier (journal key).
pub type RunId = String;

/// The two independently controlled agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agent {
    /// Red agent. Walks through red obstacles, triggers plate 1.
    Primary,
    /// Blue agent. Walks through blue obstacles, triggers plate 2.
    Secondary,
}

impl Agent {
    pub const ALL: [Agent; 2] = [Agent::Primary, Agent::Secondary];

    /// Stable slot used to index per-agent arrays and RNG streams.
    pub fn index(self) -> usize {
        match self {
            Self::Primary   => 0,
            Self::Secondary => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Primary   => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// A point in world units. Origin is the top-left corner of tile (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Integer grid coordinate. Signed so positions left of / above the map
/// convert without wrapping; such coordinates are simply out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile containing `pos` for square tiles of `tile_size`.
    pub fn containing(pos: Vec2, tile_size: f32) -> Self {
        Self {
            x: (pos.x / tile_size).floor() as i32,
            y: (pos.y / tile_size).floor() as i32,
        }
    }
}
