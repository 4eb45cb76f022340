//! The per-level tile map.
//!
//! A WorldGrid is built once when an epoch starts and is never mutated
//! afterwards. Workers share it read-only through SharedWorldState.

use crate::{
    config::SimConfig,
    error::{SimError, SimResult},
    types::{Agent, LevelIndex, TileCoord, Vec2},
};
use serde::{Deserialize, Serialize};

/// Tile kinds. Discriminants are the level-file codes and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TileKind {
    Empty         = 0,
    Wall          = 1,
    PrimarySpawn  = 2,
    SecondarySpawn = 3,
    Plate1        = 4,
    Plate2        = 5,
    Plate3        = 6,
    Gate1         = 7,
    Gate2         = 8,
    Gate3         = 9,
    RedObstacle   = 10,
    BlueObstacle  = 11,
    Goal          = 12,
}

impl TileKind {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0  => Self::Empty,
            1  => Self::Wall,
            2  => Self::PrimarySpawn,
            3  => Self::SecondarySpawn,
            4  => Self::Plate1,
            5  => Self::Plate2,
            6  => Self::Plate3,
            7  => Self::Gate1,
            8  => Self::Gate2,
            9  => Self::Gate3,
            10 => Self::RedObstacle,
            11 => Self::BlueObstacle,
            12 => Self::Goal,
            _  => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn spawn_for(agent: Agent) -> Self {
        match agent {
            Agent::Primary   => Self::PrimarySpawn,
            Agent::Secondary => Self::SecondarySpawn,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldGrid {
    width:  usize,
    height: usize,
    tile_size: f32,
    tiles:  Vec<TileKind>,
    spawns: [TileCoord; 2],
}

impl WorldGrid {
    /// Build and validate a grid from row-major tile codes.
    ///
    /// The level must match the configured dimensions exactly, use only
    /// known codes, contain exactly one spawn marker per agent and at most
    /// one plate-3 tile.
    pub fn from_codes(
        index: LevelIndex,
        rows: &[Vec<u8>],
        config: &SimConfig,
    ) -> SimResult<Self> {
        let malformed = |reason: String| SimError::MalformedLevel { index, reason };

        if rows.len() != config.map_height {
            return Err(malformed(format!(
                "expected {} rows, found {}",
                config.map_height,
                rows.len()
            )));
        }

        let mut tiles = Vec::with_capacity(config.map_width * config.map_height);
        let mut spawns: [Option<TileCoord>; 2] = [None, None];
        let mut plate3_count = 0usize;

        for (y, row) in rows.iter().enumerate() {
            if row.len() != config.map_width {
                return Err(malformed(format!(
                    "row {y} has {} columns, expected {}",
                    row.len(),
                    config.map_width
                )));
            }
            for (x, &code) in row.iter().enumerate() {
                let kind = TileKind::from_code(code)
                    .ok_or_else(|| malformed(format!("unknown tile code {code} at ({x}, {y})")))?;
                let coord = TileCoord::new(x as i32, y as i32);
                for agent in Agent::ALL {
                    if kind == TileKind::spawn_for(agent) {
                        if spawns[agent.index()].replace(coord).is_some() {
                            return Err(malformed(format!(
                                "more than one {} spawn marker",
                                agent.name()
                            )));
                        }
                    }
                }
                if kind == TileKind::Plate3 {
                    plate3_count += 1;
                }
                tiles.push(kind);
            }
        }

        if plate3_count > 1 {
            return Err(malformed(format!(
                "found {plate3_count} plate-3 tiles, at most one is allowed"
            )));
        }

        let spawn = |agent: Agent| {
            spawns[agent.index()]
                .ok_or_else(|| malformed(format!("missing {} spawn marker", agent.name())))
        };
        let spawns = [spawn(Agent::Primary)?, spawn(Agent::Secondary)?];

        Ok(Self {
            width: config.map_width,
            height: config.map_height,
            tile_size: config.tile_size,
            tiles,
            spawns,
        })
    }

    pub fn width(&self) -> usize  { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn tile_size(&self) -> f32 { self.tile_size }

    /// The tile at `coord`, or None when outside the map.
    pub fn tile(&self, coord: TileCoord) -> Option<TileKind> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        let (x, y) = (coord.x as usize, coord.y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y * self.width + x).copied()
    }

    /// The tile under a world position.
    pub fn tile_at(&self, pos: Vec2) -> Option<TileKind> {
        self.tile(self.coord_of(pos))
    }

    pub fn coord_of(&self, pos: Vec2) -> TileCoord {
        TileCoord::containing(pos, self.tile_size)
    }

    pub fn spawn_tile(&self, agent: Agent) -> TileCoord {
        self.spawns[agent.index()]
    }

    /// Initial position of `agent`: centre of its spawn tile.
    pub fn spawn_position(&self, agent: Agent) -> Vec2 {
        let tile = self.spawn_tile(agent);
        let half = self.tile_size / 2.0;
        Vec2::new(
            tile.x as f32 * self.tile_size + half,
            tile.y as f32 * self.tile_size + half,
        )
    }

    /// Coordinate of the first tile of `kind`, scanning row-major.
    pub fn find(&self, kind: TileKind) -> Option<TileCoord> {
        self.tiles.iter().position(|&t| t == kind).map(|i| {
            TileCoord::new((i % self.width) as i32, (i / self.width) as i32)
        })
    }

    /// Row-major tile codes, as found in level files.
    pub fn codes(&self) -> Vec<Vec<u8>> {
        self.tiles
            .chunks(self.width)
            .map(|row| row.iter().map(|t| t.code()).collect())
            .collect()
    }
}
