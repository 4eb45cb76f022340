//! Read-only view of a running epoch for rendering collaborators.
//!
//! A snapshot is assembled from independent reads: each position is
//! internally consistent, but the two positions and the flags may come
//! from neighbouring ticks.

use crate::{
    event::Gate,
    types::{Epoch, LevelIndex, Vec2},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSnapshot {
    pub gate1: bool,
    pub gate2: bool,
    pub gate3: bool,
}

impl GateSnapshot {
    pub fn is_open(&self, gate: Gate) -> bool {
        match gate {
            Gate::One   => self.gate1,
            Gate::Two   => self.gate2,
            Gate::Three => self.gate3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSnapshot {
    pub primary_in_goal:   bool,
    pub secondary_in_goal: bool,
    pub both_in_goal:      bool,
    pub level_completed:   bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub epoch:     Epoch,
    pub level:     LevelIndex,
    pub running:   bool,
    /// Row-major tile codes.
    pub tiles:     Vec<Vec<u8>>,
    pub primary:   Vec2,
    pub secondary: Vec2,
    pub gates:     GateSnapshot,
    pub goals:     GoalSnapshot,
}
