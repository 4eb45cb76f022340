//! Trigger evaluation: plates, gates and the shared goal.
//!
//! EVALUATION ORDER (every validation tick):
//!   1. Primary on plate 1    → latch gate 1.
//!   2. Secondary on plate 2  → latch gate 2.
//!   3. Gate 3 still closed   → latch it iff both agents stand on plate 3
//!                              in this same sample.
//!   4. Notify each gate that opened in steps 1–3.
//!   5. Recompute goal occupancy (not sticky).
//!   6. Both in goal and not yet completed → latch completion, notify.
//!
//! Gates 1 and 2 are never re-checked once open. Gate 3 is re-evaluated
//! every tick until it first opens, then never again.

use crate::{
    config::SimConfig,
    event::{Gate, SimEvent},
    grid::TileKind,
    notify::NotificationSink,
    state::SharedWorldState,
    types::{Agent, Epoch},
    worker::TickWorker,
};
use std::{sync::Arc, time::Duration};

/// What one validation tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Gates that went from closed to open this tick, in gate order.
    pub opened: Vec<Gate>,
    /// Completion was latched this tick.
    pub completed: bool,
}

impl ValidationOutcome {
    pub fn changed(&self) -> bool {
        self.completed || !self.opened.is_empty()
    }
}

/// One validation tick against `state`, notifying `sink` of every edge.
pub fn validate_tick(state: &SharedWorldState, sink: &dyn NotificationSink) -> ValidationOutcome {
    // Two independent locked reads; no atomicity between agents.
    let primary = state.position(Agent::Primary);
    let secondary = state.position(Agent::Secondary);

    let grid = state.grid();
    let primary_tile = grid.tile_at(primary);
    let secondary_tile = grid.tile_at(secondary);
    let gates = state.gates();

    let mut outcome = ValidationOutcome::default();
    let mut latch = |gate: Gate| {
        if !gates.is_open(gate) && gates.open(gate) {
            outcome.opened.push(gate);
        }
    };

    if primary_tile == Some(TileKind::Plate1) {
        latch(Gate::One);
    }
    if secondary_tile == Some(TileKind::Plate2) {
        latch(Gate::Two);
    }
    if !gates.is_open(Gate::Three)
        && primary_tile == Some(TileKind::Plate3)
        && secondary_tile == Some(TileKind::Plate3)
    {
        latch(Gate::Three);
    }

    let (epoch, level) = (state.epoch(), state.level());
    for &gate in &outcome.opened {
        log::debug!("epoch {epoch}: gate {gate:?} opened");
        sink.notify(SimEvent::GateOpened { epoch, level, gate });
    }

    let primary_in_goal = primary_tile == Some(TileKind::Goal);
    let secondary_in_goal = secondary_tile == Some(TileKind::Goal);
    let goals = state.goals();
    goals.set_occupancy(primary_in_goal, secondary_in_goal);

    if primary_in_goal && secondary_in_goal && !goals.level_completed() && goals.complete() {
        outcome.completed = true;
        log::info!("Level {level} completed (epoch {epoch})");
        sink.notify(SimEvent::LevelCompleted { epoch, level });
    }

    outcome
}

/// Runs `validate_tick` at the validation interval.
pub struct ValidationWorker {
    epoch:    Epoch,
    interval: Duration,
    sink:     Arc<dyn NotificationSink>,
}

impl ValidationWorker {
    pub fn new(epoch: Epoch, config: &SimConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            epoch,
            interval: config.validation_interval(),
            sink,
        }
    }
}

impl TickWorker for ValidationWorker {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn tick(&mut self, state: &SharedWorldState) -> bool {
        debug_assert_eq!(self.epoch, state.epoch(), "validator bound to a foreign epoch");
        validate_tick(state, self.sink.as_ref()).changed()
    }
}
