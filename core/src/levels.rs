//! Level sources: where an epoch's WorldGrid comes from.
//!
//! RULE: A level that cannot be loaded is an error for the caller.
//! No source ever falls back to a different level.

use crate::{
    config::SimConfig,
    error::{SimError, SimResult},
    grid::WorldGrid,
    types::LevelIndex,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk level file: `{"name": "...", "tiles": [[u8; width]; height]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelFile {
    pub name:  String,
    pub tiles: Vec<Vec<u8>>,
}

impl LevelFile {
    fn into_grid(self, index: LevelIndex, config: &SimConfig) -> SimResult<WorldGrid> {
        let grid = WorldGrid::from_codes(index, &self.tiles, config)?;
        log::debug!("Level {index} '{}' loaded", self.name);
        Ok(grid)
    }
}

/// The grid-loading collaborator consumed by `LevelLifecycle`.
pub trait LevelSource: Send + Sync {
    fn level_count(&self) -> usize;

    fn load(&self, index: LevelIndex, config: &SimConfig) -> SimResult<WorldGrid>;
}

// ── Built-in levels ──────────────────────────────────────────────

const BUILTIN: [&str; 4] = [
    include_str!("../../data/levels/level_0.json"),
    include_str!("../../data/levels/level_1.json"),
    include_str!("../../data/levels/level_2.json"),
    include_str!("../../data/levels/level_3.json"),
];

/// The four levels shipped with the game, compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLevels;

impl LevelSource for BuiltinLevels {
    fn level_count(&self) -> usize {
        BUILTIN.len()
    }

    fn load(&self, index: LevelIndex, config: &SimConfig) -> SimResult<WorldGrid> {
        let raw = BUILTIN.get(index).ok_or(SimError::LevelNotFound {
            index,
            available: BUILTIN.len(),
        })?;
        let file: LevelFile =
            serde_json::from_str(raw).map_err(|e| SimError::MalformedLevel {
                index,
                reason: e.to_string(),
            })?;
        file.into_grid(index, config)
    }
}

// ── Level directory ──────────────────────────────────────────────

/// Levels read from `<dir>/level_<n>.json`.
/// The level count is the contiguous run of files starting at `level_0.json`.
#[derive(Debug, Clone)]
pub struct LevelDir {
    dir:   PathBuf,
    count: usize,
}

impl LevelDir {
    pub fn open(dir: impl AsRef<Path>) -> SimResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        let count = (0..)
            .take_while(|&i| Self::path_for(&dir, i).is_file())
            .count();
        if count == 0 {
            return Err(SimError::InvalidConfig {
                reason: format!("no level_0.json found in {}", dir.display()),
            });
        }
        log::info!("Found {count} levels in {}", dir.display());
        Ok(Self { dir, count })
    }

    fn path_for(dir: &Path, index: LevelIndex) -> PathBuf {
        dir.join(format!("level_{index}.json"))
    }
}

impl LevelSource for LevelDir {
    fn level_count(&self) -> usize {
        self.count
    }

    fn load(&self, index: LevelIndex, config: &SimConfig) -> SimResult<WorldGrid> {
        if index >= self.count {
            return Err(SimError::LevelNotFound { index, available: self.count });
        }
        let path = Self::path_for(&self.dir, index);
        let content = std::fs::read_to_string(&path)?;
        let file: LevelFile =
            serde_json::from_str(&content).map_err(|e| SimError::MalformedLevel {
                index,
                reason: format!("{}: {e}", path.display()),
            })?;
        file.into_grid(index, config)
    }
}
