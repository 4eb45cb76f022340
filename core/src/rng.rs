//! Deterministic random number generation for scripted input.
//!
//! RULE: Nothing in the core calls a platform RNG.
//! Each agent gets its own stream, seeded from
//! (master_seed XOR scrambled agent slot), so:
//!   - the two agents' streams never alias,
//!   - a stream is reproducible in isolation from its seed and slot.

use crate::types::Agent;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single agent slot.
pub struct AgentRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl AgentRng {
    /// Create a stream from the master seed and a stable slot index.
    pub fn new(master_seed: u64, slot: u64) -> Self {
        let derived_seed = master_seed ^ (slot.wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn for_agent(master_seed: u64, agent: Agent) -> Self {
        Self::new(master_seed, agent.index() as u64).with_name(agent.name())
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}
