//! Circle-vs-tile collision. Pure: same inputs, same answer.
//!
//! Only the 3x3 neighbourhood around the candidate's tile is inspected.
//! That is sufficient because SimConfig::validate guarantees the agent
//! radius is under half a tile.

use crate::{
    event::Gate,
    grid::{TileKind, WorldGrid},
    snapshot::GateSnapshot,
    types::{Agent, TileCoord, Vec2},
};

/// Whether `agent` may overlap a tile of `kind` with the gates as given.
pub fn can_pass(kind: TileKind, agent: Agent, gates: &GateSnapshot) -> bool {
    match kind {
        TileKind::Empty
        | TileKind::PrimarySpawn
        | TileKind::SecondarySpawn
        | TileKind::Plate1
        | TileKind::Plate2
        | TileKind::Plate3
        | TileKind::Goal => true,
        TileKind::Wall         => false,
        TileKind::Gate1        => gates.is_open(Gate::One),
        TileKind::Gate2        => gates.is_open(Gate::Two),
        TileKind::Gate3        => gates.is_open(Gate::Three),
        TileKind::RedObstacle  => agent == Agent::Primary,
        TileKind::BlueObstacle => agent == Agent::Secondary,
    }
}

/// True when a circle at `pos` with `radius` strictly overlaps the
/// axis-aligned square tile at `coord`. Touching edges do not overlap.
pub fn circle_overlaps_tile(pos: Vec2, radius: f32, coord: TileCoord, tile_size: f32) -> bool {
    let left = coord.x as f32 * tile_size;
    let top = coord.y as f32 * tile_size;
    let nearest_x = pos.x.clamp(left, left + tile_size);
    let nearest_y = pos.y.clamp(top, top + tile_size);
    let dx = pos.x - nearest_x;
    let dy = pos.y - nearest_y;
    dx * dx + dy * dy < radius * radius
}

/// Whether a circle of `radius` at `pos` would cross the outer map edge.
/// A centre exactly `radius` from an edge is still inside.
pub fn crosses_boundary(pos: Vec2, radius: f32, grid: &WorldGrid) -> bool {
    let max_x = grid.width() as f32 * grid.tile_size();
    let max_y = grid.height() as f32 * grid.tile_size();
    pos.x < radius || pos.y < radius || pos.x > max_x - radius || pos.y > max_y - radius
}

/// Whether `agent` may not occupy `pos` under `gates`.
pub fn is_blocked(
    pos: Vec2,
    radius: f32,
    agent: Agent,
    grid: &WorldGrid,
    gates: &GateSnapshot,
) -> bool {
    if crosses_boundary(pos, radius, grid) {
        return true;
    }

    let centre = grid.coord_of(pos);
    for dy in -1..=1 {
        for dx in -1..=1 {
            let coord = TileCoord::new(centre.x + dx, centre.y + dy);
            let Some(kind) = grid.tile(coord) else {
                continue;
            };
            if can_pass(kind, agent, gates) {
                continue;
            }
            if circle_overlaps_tile(pos, radius, coord, grid.tile_size()) {
                log::trace!("{} blocked by {kind:?} at {coord:?}", agent.name());
                return true;
            }
        }
    }
    false
}
