//! The input-sampling collaborator.
//!
//! AgentWorkers poll an InputSource once per tick. The host thread (or a
//! script) is the only writer; sampling never blocks on the host.

use crate::{rng::AgentRng, types::Agent};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Mutex, PoisonError,
};

/// The four direction keys of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionInput {
    pub left:  bool,
    pub right: bool,
    pub up:    bool,
    pub down:  bool,
}

impl DirectionInput {
    pub const NONE: DirectionInput = DirectionInput {
        left: false,
        right: false,
        up: false,
        down: false,
    };

    const LEFT: u8 = 1;
    const RIGHT: u8 = 1 << 1;
    const UP: u8 = 1 << 2;
    const DOWN: u8 = 1 << 3;

    pub fn bits(self) -> u8 {
        let mut bits = 0;
        if self.left  { bits |= Self::LEFT; }
        if self.right { bits |= Self::RIGHT; }
        if self.up    { bits |= Self::UP; }
        if self.down  { bits |= Self::DOWN; }
        bits
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            left:  bits & Self::LEFT != 0,
            right: bits & Self::RIGHT != 0,
            up:    bits & Self::UP != 0,
            down:  bits & Self::DOWN != 0,
        }
    }

    pub fn is_idle(self) -> bool {
        self.bits() == 0
    }
}

/// Source of per-tick direction state for each agent.
pub trait InputSource: Send + Sync {
    fn sample(&self, agent: Agent) -> DirectionInput;
}

// ── Host-driven input ────────────────────────────────────────────

/// Latest key state per agent, published by the host loop.
#[derive(Debug, Default)]
pub struct SharedInput {
    keys: [AtomicU8; 2],
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, agent: Agent, input: DirectionInput) {
        self.keys[agent.index()].store(input.bits(), Ordering::Release);
    }

    pub fn release_all(&self) {
        for agent in Agent::ALL {
            self.set(agent, DirectionInput::NONE);
        }
    }

    /// Publish both agents' state from one set of held key names,
    /// each agent reading it through its own bindings.
    pub fn set_held<S: AsRef<str>>(&self, bindings: &[KeyBindings; 2], held: &[S]) {
        for agent in Agent::ALL {
            let keys = held.iter().map(AsRef::as_ref);
            self.set(agent, bindings[agent.index()].resolve(keys));
        }
    }
}

impl InputSource for SharedInput {
    fn sample(&self, agent: Agent) -> DirectionInput {
        DirectionInput::from_bits(self.keys[agent.index()].load(Ordering::Acquire))
    }
}

/// Key names for one agent, in left/right/up/down order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub left:  String,
    pub right: String,
    pub up:    String,
    pub down:  String,
}

impl KeyBindings {
    /// Primary: WASD. Secondary: arrow keys.
    pub fn default_for(agent: Agent) -> Self {
        let keys = match agent {
            Agent::Primary   => ["a", "d", "w", "s"],
            Agent::Secondary => ["left", "right", "up", "down"],
        };
        Self {
            left:  keys[0].to_string(),
            right: keys[1].to_string(),
            up:    keys[2].to_string(),
            down:  keys[3].to_string(),
        }
    }

    /// Default bindings for both agents, indexed by `Agent::index`.
    pub fn defaults() -> [Self; 2] {
        Agent::ALL.map(Self::default_for)
    }

    /// Direction state from the set of currently held key names.
    /// Matching is case-insensitive.
    pub fn resolve<'a>(&self, held: impl IntoIterator<Item = &'a str>) -> DirectionInput {
        let mut input = DirectionInput::NONE;
        for key in held {
            if key.eq_ignore_ascii_case(&self.left)  { input.left = true; }
            if key.eq_ignore_ascii_case(&self.right) { input.right = true; }
            if key.eq_ignore_ascii_case(&self.up)    { input.up = true; }
            if key.eq_ignore_ascii_case(&self.down)  { input.down = true; }
        }
        input
    }
}

// ── Scripted input ───────────────────────────────────────────────

/// Longest run, in samples, that a random key combination is held.
const MAX_HOLD_SAMPLES: u64 = 40;

struct WalkState {
    rng:       AgentRng,
    current:   DirectionInput,
    hold_left: u64,
}

impl WalkState {
    fn next(&mut self) -> DirectionInput {
        if self.hold_left == 0 {
            // One in five runs is a pause; otherwise 1..=15 key bits.
            self.current = if self.rng.chance(0.2) {
                DirectionInput::NONE
            } else {
                DirectionInput::from_bits(1 + self.rng.next_u64_below(15) as u8)
            };
            self.hold_left = 1 + self.rng.next_u64_below(MAX_HOLD_SAMPLES);
        }
        self.hold_left -= 1;
        self.current
    }
}

/// Seeded random key presses for unattended runs.
/// Same seed, same sample sequence per agent.
pub struct RandomWalkInput {
    walks: [Mutex<WalkState>; 2],
}

impl RandomWalkInput {
    pub fn new(seed: u64) -> Self {
        let walk = |agent: Agent| {
            Mutex::new(WalkState {
                rng: AgentRng::for_agent(seed, agent),
                current: DirectionInput::NONE,
                hold_left: 0,
            })
        };
        Self {
            walks: [walk(Agent::Primary), walk(Agent::Secondary)],
        }
    }
}

impl InputSource for RandomWalkInput {
    fn sample(&self, agent: Agent) -> DirectionInput {
        self.walks[agent.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next()
    }
}
