//! Audio control signals.
//!
//! The core never decodes or mixes audio. It only owns the knobs the host
//! exposes (volume, pause) and tells the audio collaborator which music
//! track belongs to the current mode.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub const DEFAULT_VOLUME: f32 = 0.7;
pub const LOW_VOLUME: f32 = 0.15;
/// Volumes above this count as "high" for the high/low toggle.
pub const HIGH_VOLUME_THRESHOLD: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicTrack {
    Menu,
    Gameplay,
}

/// Shared volume and pause state. Safe to poke from any thread.
#[derive(Debug)]
pub struct AudioControl {
    volume_bits: AtomicU32,
    paused:      AtomicBool,
}

impl Default for AudioControl {
    fn default() -> Self {
        Self {
            volume_bits: AtomicU32::new(DEFAULT_VOLUME.to_bits()),
            paused:      AtomicBool::new(false),
        }
    }
}

impl AudioControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Acquire))
    }

    /// Set the master volume, clamped into [0, 1]. NaN is treated as mute.
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume_bits.store(volume.to_bits(), Ordering::Release);
        log::debug!("volume set to {volume:.2}");
    }

    pub fn mute(&self) {
        self.set_volume(0.0);
    }

    pub fn restore(&self) {
        self.set_volume(DEFAULT_VOLUME);
    }

    /// High goes low, anything else goes back to the default.
    pub fn toggle_level(&self) {
        if self.volume() > HIGH_VOLUME_THRESHOLD {
            self.set_volume(LOW_VOLUME);
        } else {
            self.set_volume(DEFAULT_VOLUME);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Flip pause. Returns the new paused state.
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }
}
