//! Simulation tunables.
//!
//! RULE: No worker hard-codes a size, speed or interval.
//! Everything numeric flows from a validated SimConfig.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Grid width in tiles.
    pub map_width: usize,
    /// Grid height in tiles.
    pub map_height: usize,
    /// Edge length of one square tile, in world units.
    pub tile_size: f32,
    /// Collision radius of each agent.
    pub agent_radius: f32,
    /// Distance moved per agent tick per active direction.
    pub agent_speed: f32,
    /// Movement clamp distance from the outer map edge.
    pub border_margin: f32,
    pub agent_tick_ms: u64,
    /// Kept slightly longer than the agent tick.
    pub validation_tick_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            map_width:          20,
            map_height:         15,
            tile_size:          40.0,
            agent_radius:       15.0,
            agent_speed:        3.0,
            border_margin:      1.0,
            agent_tick_ms:      10,
            validation_tick_ms: 15,
        }
    }
}

impl SimConfig {
    /// Load from `<data_dir>/config/sim_config.json`.
    /// Missing keys fall back to the defaults; the result is validated.
    pub fn load(data_dir: &str) -> SimResult<Self> {
        let path = format!("{data_dir}/config/sim_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded sim config from {path}: {config:?}");
        Ok(config)
    }

    /// Config with short ticks for tests that drive real threads.
    pub fn default_test() -> Self {
        Self {
            agent_tick_ms:      1,
            validation_tick_ms: 2,
            ..Self::default()
        }
    }

    /// Reject configurations that would break the collision or timing
    /// preconditions the workers rely on.
    pub fn validate(&self) -> SimResult<()> {
        let fail = |reason: String| Err(SimError::InvalidConfig { reason });

        if self.map_width == 0 || self.map_height == 0 {
            return fail(format!(
                "map must be at least 1x1, got {}x{}",
                self.map_width, self.map_height
            ));
        }
        if !(self.tile_size > 0.0) {
            return fail(format!("tile_size must be positive, got {}", self.tile_size));
        }
        // The collision check only inspects the 3x3 neighbourhood.
        if !(self.agent_radius > 0.0) || self.agent_radius * 2.0 >= self.tile_size {
            return fail(format!(
                "agent_radius must be in (0, tile_size / 2), got {} for tile_size {}",
                self.agent_radius, self.tile_size
            ));
        }
        if !(self.agent_speed > 0.0) {
            return fail(format!("agent_speed must be positive, got {}", self.agent_speed));
        }
        let (w, h) = self.extent();
        if !(self.border_margin >= 0.0) || self.border_margin * 2.0 >= w.min(h) {
            return fail(format!(
                "border_margin {} does not fit a {w}x{h} map",
                self.border_margin
            ));
        }
        if self.agent_tick_ms == 0 || self.validation_tick_ms == 0 {
            return fail("tick intervals must be non-zero".to_string());
        }
        Ok(())
    }

    /// Map extent in world units: (width, height).
    pub fn extent(&self) -> (f32, f32) {
        (
            self.map_width as f32 * self.tile_size,
            self.map_height as f32 * self.tile_size,
        )
    }

    pub fn agent_interval(&self) -> Duration {
        Duration::from_millis(self.agent_tick_ms)
    }

    pub fn validation_interval(&self) -> Duration {
        Duration::from_millis(self.validation_tick_ms)
    }
}
