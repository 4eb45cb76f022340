//! Discrete notifications leaving the simulation core.
//!
//! RULE: Events describe edges, not levels. A gate-opened event is
//! emitted once per gate per epoch, on the tick the gate opens.
//! Variants are only ever appended.

use crate::{
    audio::MusicTrack,
    types::{Epoch, LevelIndex, RunId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three plate-controlled gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    One,
    Two,
    Three,
}

impl Gate {
    pub const ALL: [Gate; 3] = [Gate::One, Gate::Two, Gate::Three];

    pub fn index(self) -> usize {
        match self {
            Self::One   => 0,
            Self::Two   => 1,
            Self::Three => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Lifecycle ──────────────────────────────────
    EpochStarted {
        epoch: Epoch,
        level: LevelIndex,
    },
    EpochStopped {
        epoch: Epoch,
        level: LevelIndex,
    },
    ReturnedToMenu {
        epoch: Epoch,
    },

    // ── Validation ─────────────────────────────────
    GateOpened {
        epoch: Epoch,
        level: LevelIndex,
        gate: Gate,
    },
    LevelCompleted {
        epoch: Epoch,
        level: LevelIndex,
    },

    // ── Audio signals ──────────────────────────────
    MusicChanged {
        track: MusicTrack,
    },
}

impl SimEvent {
    /// The epoch this event belongs to, if any.
    pub fn epoch(&self) -> Option<Epoch> {
        match self {
            Self::EpochStarted { epoch, .. }
            | Self::EpochStopped { epoch, .. }
            | Self::ReturnedToMenu { epoch }
            | Self::GateOpened { epoch, .. }
            | Self::LevelCompleted { epoch, .. } => Some(*epoch),
            Self::MusicChanged { .. } => None,
        }
    }
}

/// Stable string name for a SimEvent variant.
/// Used for the event_type column of the journal.
pub fn event_type_name(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::EpochStarted { .. }   => "epoch_started",
        SimEvent::EpochStopped { .. }   => "epoch_stopped",
        SimEvent::ReturnedToMenu { .. } => "returned_to_menu",
        SimEvent::GateOpened { .. }     => "gate_opened",
        SimEvent::LevelCompleted { .. } => "level_completed",
        SimEvent::MusicChanged { .. }   => "music_changed",
    }
}

/// A journaled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id:          Option<i64>,
    pub run_id:      RunId,
    pub seq:         u64,
    pub epoch:       Option<Epoch>,
    pub event_type:  String,
    pub payload:     String, // JSON-serialized SimEvent
    pub recorded_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(run_id: &str, seq: u64, event: &SimEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id:          None,
            run_id:      run_id.to_string(),
            seq,
            epoch:       event.epoch(),
            event_type:  event_type_name(event).to_string(),
            payload:     serde_json::to_string(event)?,
            recorded_at: Utc::now(),
        })
    }

    pub fn decode(&self) -> serde_json::Result<SimEvent> {
        serde_json::from_str(&self.payload)
    }
}
