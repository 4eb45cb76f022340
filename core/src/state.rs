//! The single shared model of one epoch.
//!
//! SYNCHRONIZATION RULES:
//!   - Each agent position lives behind its own mutex. No operation ever
//!     holds both position locks at once.
//!   - A position lock is held only for one copy in or one copy out.
//!   - Gate and goal flags are independent atomics. No cross-flag
//!     atomicity is promised or needed.
//!   - Positions are written only by their own AgentWorker (tests stage
//!     scenes through the checked `place`); flags only by
//!     the ValidationWorker. Nothing resets a flag: the next epoch gets a
//!     brand new SharedWorldState instead.

use crate::{
    collision,
    config::SimConfig,
    event::Gate,
    grid::{TileKind, WorldGrid},
    movement::MoveBounds,
    snapshot::{GateSnapshot, GoalSnapshot, WorldSnapshot},
    types::{Agent, Epoch, LevelIndex, TileCoord, Vec2},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError,
};

/// One agent's position together with its write provenance.
/// Always read and written whole, under the agent's lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionCell {
    pub pos: Vec2,
    /// Epoch of the last writer. Equals the state's own epoch for the
    /// initial spawn value and for every commit of a live worker.
    pub stamp: Epoch,
    /// Number of commits since the epoch started.
    pub writes: u64,
}

/// Plate-controlled gate latches. Monotonic within an epoch.
#[derive(Debug, Default)]
pub struct GateFlags {
    open: [AtomicBool; 3],
}

impl GateFlags {
    pub fn is_open(&self, gate: Gate) -> bool {
        self.open[gate.index()].load(Ordering::Acquire)
    }

    /// Latch `gate` open. Returns true only for the call that opened it.
    pub fn open(&self, gate: Gate) -> bool {
        !self.open[gate.index()].swap(true, Ordering::AcqRel)
    }

    pub fn snapshot(&self) -> GateSnapshot {
        let [gate1, gate2, gate3] = Gate::ALL.map(|gate| self.is_open(gate));
        GateSnapshot { gate1, gate2, gate3 }
    }
}

/// Goal occupancy. The in-goal flags are recomputed every validation tick;
/// `level_completed` is sticky.
#[derive(Debug, Default)]
pub struct GoalFlags {
    primary_in_goal:   AtomicBool,
    secondary_in_goal: AtomicBool,
    both_in_goal:      AtomicBool,
    level_completed:   AtomicBool,
}

impl GoalFlags {
    pub fn in_goal(&self, agent: Agent) -> bool {
        match agent {
            Agent::Primary   => self.primary_in_goal.load(Ordering::Acquire),
            Agent::Secondary => self.secondary_in_goal.load(Ordering::Acquire),
        }
    }

    pub fn both_in_goal(&self) -> bool {
        self.both_in_goal.load(Ordering::Acquire)
    }

    pub fn level_completed(&self) -> bool {
        self.level_completed.load(Ordering::Acquire)
    }

    pub(crate) fn set_occupancy(&self, primary: bool, secondary: bool) {
        self.primary_in_goal.store(primary, Ordering::Release);
        self.secondary_in_goal.store(secondary, Ordering::Release);
        self.both_in_goal.store(primary && secondary, Ordering::Release);
    }

    /// Latch completion. Returns true only for the call that latched it.
    pub(crate) fn complete(&self) -> bool {
        !self.level_completed.swap(true, Ordering::AcqRel)
    }

    pub fn snapshot(&self) -> GoalSnapshot {
        GoalSnapshot {
            primary_in_goal:   self.in_goal(Agent::Primary),
            secondary_in_goal: self.in_goal(Agent::Secondary),
            both_in_goal:      self.both_in_goal(),
            level_completed:   self.level_completed(),
        }
    }
}

/// The cooperative cancellation flag shared by the workers of one epoch.
#[derive(Debug)]
pub struct RunControl {
    running: AtomicBool,
}

impl RunControl {
    fn new() -> Self {
        Self { running: AtomicBool::new(true) }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask every worker to leave its loop. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct SharedWorldState {
    epoch:     Epoch,
    level:     LevelIndex,
    grid:      WorldGrid,
    positions: [Mutex<PositionCell>; 2],
    gates:     GateFlags,
    goals:     GoalFlags,
    run:       RunControl,
}

impl SharedWorldState {
    /// Fresh state for `epoch`: every flag false, agents on their spawn
    /// tiles, run control set.
    pub fn new(epoch: Epoch, level: LevelIndex, grid: WorldGrid) -> Self {
        let cell = |agent: Agent| {
            Mutex::new(PositionCell {
                pos: grid.spawn_position(agent),
                stamp: epoch,
                writes: 0,
            })
        };
        let positions = [cell(Agent::Primary), cell(Agent::Secondary)];
        Self {
            epoch,
            level,
            grid,
            positions,
            gates: GateFlags::default(),
            goals: GoalFlags::default(),
            run: RunControl::new(),
        }
    }

    pub fn epoch(&self) -> Epoch      { self.epoch }
    pub fn level(&self) -> LevelIndex { self.level }
    pub fn grid(&self) -> &WorldGrid  { &self.grid }
    pub fn gates(&self) -> &GateFlags { &self.gates }
    pub fn goals(&self) -> &GoalFlags { &self.goals }
    pub fn run(&self) -> &RunControl  { &self.run }

    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    pub fn tile(&self, coord: TileCoord) -> Option<TileKind> {
        self.grid.tile(coord)
    }

    fn cell(&self, agent: Agent) -> MutexGuard<'_, PositionCell> {
        // A cell only ever holds a Copy value, so a poisoned lock
        // still guards a whole, consistent pair.
        self.positions[agent.index()]
            .lock()
            .unwrap_or_else(|poisoned| {
                log::warn!("position lock for {} was poisoned", agent.name());
                PoisonError::into_inner(poisoned)
            })
    }

    /// Both axes of `agent`'s position, read together.
    pub fn position(&self, agent: Agent) -> Vec2 {
        self.cell(agent).pos
    }

    /// Position plus provenance, read together.
    pub fn position_cell(&self, agent: Agent) -> PositionCell {
        *self.cell(agent)
    }

    /// Commit a new position for `agent` as a writer from `writer_epoch`.
    ///
    /// The run flag is re-checked under the lock, so a worker that lost the
    /// race with `RunControl::stop` does not write. Returns whether the
    /// write happened. Callers have already cleared `pos` against the
    /// bounds and the collision oracle.
    pub(crate) fn commit_position(&self, agent: Agent, writer_epoch: Epoch, pos: Vec2) -> bool {
        debug_assert_eq!(writer_epoch, self.epoch, "writer from a foreign epoch");
        let mut cell = self.cell(agent);
        if !self.run.is_running() {
            return false;
        }
        cell.pos = pos;
        cell.stamp = writer_epoch;
        cell.writes += 1;
        true
    }

    /// Put `agent` at `pos` from outside the worker threads, e.g. to stage a
    /// scene in a test. The move obeys the same rules as a worker commit:
    /// `pos` must lie inside the movement bounds of `config` and must not
    /// be blocked under the current gates. Returns whether the write happened.
    #[doc(hidden)]
    pub fn place(&self, agent: Agent, pos: Vec2, config: &SimConfig) -> bool {
        if !MoveBounds::from_config(config).contains(pos) {
            log::debug!("refused placement of {} outside the bounds: {pos:?}", agent.name());
            return false;
        }
        let gates = self.gates.snapshot();
        if collision::is_blocked(pos, config.agent_radius, agent, &self.grid, &gates) {
            log::debug!("refused blocked placement of {} at {pos:?}", agent.name());
            return false;
        }
        self.commit_position(agent, self.epoch, pos)
    }

    /// Read-only view for rendering and inspection.
    /// Takes each agent lock in turn, never both together.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            epoch:     self.epoch,
            level:     self.level,
            running:   self.is_running(),
            tiles:     self.grid.codes(),
            primary:   self.position(Agent::Primary),
            secondary: self.position(Agent::Secondary),
            gates:     self.gates.snapshot(),
            goals:     self.goals.snapshot(),
        }
    }
}
