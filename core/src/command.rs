use serde::{Deserialize, Serialize};
use crate::{
    input::DirectionInput,
    types::{Agent, LevelIndex},
};

/// Commands a host sends to the runner, one JSON object per line.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum HostCommand {
    // ── Lifecycle ─────────────────────────────────
    Start { level: LevelIndex },
    /// Press the advance key. Acted on at the next `frame`.
    Advance,
    /// Run one host frame: consume the advance request.
    Frame,
    Stop,
    Quit,

    // ── Input ─────────────────────────────────────
    Input {
        agent: Agent,
        #[serde(default)]
        input: DirectionInput,
    },
    /// Every key name currently held. Each agent resolves it through its
    /// own key bindings; an empty list releases everything.
    Keys {
        #[serde(default)]
        held: Vec<String>,
    },

    // ── Inspection ────────────────────────────────
    GetState,

    // ── Audio ─────────────────────────────────────
    TogglePause,
    SetVolume { volume: f32 },
}

impl HostCommand {
    /// True for commands that end the session.
    pub fn is_quit(&self) -> bool {
        matches!(self, Self::Quit)
    }
}
