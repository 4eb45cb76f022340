//! Circle-vs-tile collision against hand-built maps.

use duomaze_core::{
    collision::{can_pass, circle_overlaps_tile, crosses_boundary, is_blocked},
    config::SimConfig,
    grid::{TileKind, WorldGrid},
    snapshot::GateSnapshot,
    types::{Agent, TileCoord, Vec2},
};

const CLOSED: GateSnapshot = GateSnapshot { gate1: false, gate2: false, gate3: false };
const R: f32 = 15.0;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 20x15 map of empty tiles with the two spawn markers in the top-left.
fn open_map() -> Vec<Vec<u8>> {
    let mut rows = vec![vec![0u8; 20]; 15];
    rows[1][1] = TileKind::PrimarySpawn.code();
    rows[1][2] = TileKind::SecondarySpawn.code();
    rows
}

fn build(rows: &[Vec<u8>]) -> WorldGrid {
    WorldGrid::from_codes(0, rows, &SimConfig::default()).expect("valid grid")
}

fn with_tile(x: usize, y: usize, kind: TileKind) -> WorldGrid {
    let mut rows = open_map();
    rows[y][x] = kind.code();
    build(&rows)
}

#[test]
fn wall_blocks_only_on_strict_overlap() {
    init_logger();
    let grid = with_tile(5, 5, TileKind::Wall);

    // Wall's left edge is x = 200. A centre at 185 just touches it.
    let touching = Vec2::new(185.0, 220.0);
    assert!(!is_blocked(touching, R, Agent::Primary, &grid, &CLOSED));

    let overlapping = Vec2::new(186.0, 220.0);
    assert!(is_blocked(overlapping, R, Agent::Primary, &grid, &CLOSED));
    assert!(is_blocked(overlapping, R, Agent::Secondary, &grid, &CLOSED));
}

#[test]
fn corner_overlap_uses_nearest_point() {
    let grid = with_tile(5, 5, TileKind::Wall);

    // Nearest point is the corner (200, 200): distance² 200 < 225.
    assert!(is_blocked(Vec2::new(190.0, 190.0), R, Agent::Primary, &grid, &CLOSED));
    // distance² 288 > 225.
    assert!(!is_blocked(Vec2::new(188.0, 188.0), R, Agent::Primary, &grid, &CLOSED));
}

#[test]
fn boundary_is_inclusive_at_radius() {
    let grid = build(&open_map());
    let (w, h) = (800.0, 600.0);

    assert!(!crosses_boundary(Vec2::new(R, R), R, &grid));
    assert!(!crosses_boundary(Vec2::new(w - R, h - R), R, &grid));

    assert!(crosses_boundary(Vec2::new(R - 1.0, 300.0), R, &grid));
    assert!(crosses_boundary(Vec2::new(300.0, R - 1.0), R, &grid));
    assert!(crosses_boundary(Vec2::new(w - R + 1.0, 300.0), R, &grid));
    assert!(crosses_boundary(Vec2::new(300.0, h - R + 1.0), R, &grid));

    assert!(is_blocked(Vec2::new(R - 1.0, 300.0), R, Agent::Primary, &grid, &CLOSED));
}

#[test]
fn neighbours_outside_the_map_are_skipped() {
    let grid = build(&open_map());
    // Centre on tile (0, 0): five of its nine neighbours are off the map.
    assert!(!is_blocked(Vec2::new(R, R), R, Agent::Secondary, &grid, &CLOSED));
    assert!(!is_blocked(Vec2::new(800.0 - R, 600.0 - R), R, Agent::Secondary, &grid, &CLOSED));
}

#[test]
fn gates_block_until_their_flag_is_open() {
    let pos = Vec2::new(190.0, 220.0); // overlaps tile (5, 5)
    let cases = [
        (TileKind::Gate1, GateSnapshot { gate1: true, ..CLOSED }),
        (TileKind::Gate2, GateSnapshot { gate2: true, ..CLOSED }),
        (TileKind::Gate3, GateSnapshot { gate3: true, ..CLOSED }),
    ];

    for (kind, open) in cases {
        let grid = with_tile(5, 5, kind);
        for agent in Agent::ALL {
            assert!(is_blocked(pos, R, agent, &grid, &CLOSED), "{kind:?} closed must block {agent:?}");
            assert!(!is_blocked(pos, R, agent, &grid, &open), "{kind:?} open must pass {agent:?}");
        }
    }

    // Only the matching flag opens a gate.
    let grid = with_tile(5, 5, TileKind::Gate3);
    let wrong = GateSnapshot { gate1: true, gate2: true, gate3: false };
    assert!(is_blocked(pos, R, Agent::Primary, &grid, &wrong));
}

#[test]
fn coloured_obstacles_pass_their_own_agent() {
    let pos = Vec2::new(190.0, 220.0);

    let red = with_tile(5, 5, TileKind::RedObstacle);
    assert!(!is_blocked(pos, R, Agent::Primary, &red, &CLOSED));
    assert!(is_blocked(pos, R, Agent::Secondary, &red, &CLOSED));

    let blue = with_tile(5, 5, TileKind::BlueObstacle);
    assert!(is_blocked(pos, R, Agent::Primary, &blue, &CLOSED));
    assert!(!is_blocked(pos, R, Agent::Secondary, &blue, &CLOSED));
}

#[test]
fn floor_tiles_are_always_passable() {
    let all_open = GateSnapshot { gate1: true, gate2: true, gate3: true };
    for kind in [
        TileKind::Empty,
        TileKind::PrimarySpawn,
        TileKind::SecondarySpawn,
        TileKind::Plate1,
        TileKind::Plate2,
        TileKind::Plate3,
        TileKind::Goal,
    ] {
        for agent in Agent::ALL {
            assert!(can_pass(kind, agent, &CLOSED));
            assert!(can_pass(kind, agent, &all_open));
        }
    }
    for agent in Agent::ALL {
        assert!(!can_pass(TileKind::Wall, agent, &all_open));
    }
}

#[test]
fn overlap_is_symmetric_around_the_tile() {
    let coord = TileCoord::new(3, 3); // spans [120, 160] on both axes
    let inside = Vec2::new(140.0, 140.0);
    assert!(circle_overlaps_tile(inside, R, coord, 40.0));

    for pos in [
        Vec2::new(105.0, 140.0),
        Vec2::new(175.0, 140.0),
        Vec2::new(140.0, 105.0),
        Vec2::new(140.0, 175.0),
    ] {
        assert!(!circle_overlaps_tile(pos, R, coord, 40.0), "touching at {pos:?} is not overlap");
    }
}

#[test]
fn repeated_queries_agree() {
    let grid = with_tile(5, 5, TileKind::Gate2);
    let gates = [CLOSED, GateSnapshot { gate2: true, ..CLOSED }];
    for step in 0..160 {
        let pos = Vec2::new(150.0 + step as f32 * 0.5, 150.0 + step as f32 * 0.5);
        for agent in Agent::ALL {
            for g in &gates {
                let first = is_blocked(pos, R, agent, &grid, g);
                assert_eq!(first, is_blocked(pos, R, agent, &grid, g));
            }
        }
    }
}
