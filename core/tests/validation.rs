//! Plate, gate and goal evaluation, driven tick by tick without threads.

use duomaze_core::{
    config::SimConfig,
    event::{Gate, SimEvent},
    grid::{TileKind, WorldGrid},
    notify::RecordingSink,
    state::SharedWorldState,
    types::{Agent, TileCoord, Vec2},
    validation::validate_tick,
};

const EPOCH: u64 = 1;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Primary spawn (1,1), secondary spawn (1,13), goal (18,13), plates
/// 1/2/3 at (5,5), (6,5), (7,5). One wall at (12,2) and a gate-1
/// tile at (14,2).
fn trigger_map() -> Vec<Vec<u8>> {
    let mut rows = vec![vec![0u8; 20]; 15];
    rows[1][1] = TileKind::PrimarySpawn.code();
    rows[13][1] = TileKind::SecondarySpawn.code();
    rows[13][18] = TileKind::Goal.code();
    rows[13][17] = TileKind::Goal.code();
    rows[5][5] = TileKind::Plate1.code();
    rows[5][6] = TileKind::Plate2.code();
    rows[5][7] = TileKind::Plate3.code();
    rows[2][12] = TileKind::Wall.code();
    rows[2][14] = TileKind::Gate1.code();
    rows
}

fn new_state() -> SharedWorldState {
    let grid = WorldGrid::from_codes(0, &trigger_map(), &SimConfig::default()).expect("valid grid");
    SharedWorldState::new(EPOCH, 0, grid)
}

fn centre(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f32 * 40.0 + 20.0, y as f32 * 40.0 + 20.0)
}

fn place(state: &SharedWorldState, agent: Agent, x: i32, y: i32) {
    assert!(state.place(agent, centre(x, y), &SimConfig::default()));
}

fn gate_events(sink: &RecordingSink, which: Gate) -> usize {
    sink.count_where(|e| matches!(e, SimEvent::GateOpened { gate, .. } if *gate == which))
}

#[test]
fn fresh_state_has_every_flag_cleared() {
    let state = new_state();
    let gates = state.gates().snapshot();
    assert!(!gates.gate1 && !gates.gate2 && !gates.gate3);
    let goals = state.goals().snapshot();
    assert!(!goals.primary_in_goal && !goals.secondary_in_goal);
    assert!(!goals.both_in_goal && !goals.level_completed);
    assert_eq!(state.position(Agent::Primary), centre(1, 1));
    assert_eq!(state.position(Agent::Secondary), centre(1, 13));
}

#[test]
fn one_agent_in_goal_does_not_complete() {
    init_logger();
    let state = new_state();
    let sink = RecordingSink::new();

    place(&state, Agent::Primary, 18, 13);
    let outcome = validate_tick(&state, &sink);

    assert!(!outcome.changed());
    assert!(state.goals().in_goal(Agent::Primary));
    assert!(!state.goals().in_goal(Agent::Secondary));
    assert!(!state.goals().both_in_goal());
    assert!(!state.goals().level_completed());
    assert!(sink.events().is_empty());
}

#[test]
fn both_in_goal_completes_exactly_once() {
    init_logger();
    let state = new_state();
    let sink = RecordingSink::new();

    place(&state, Agent::Primary, 18, 13);
    place(&state, Agent::Secondary, 17, 13);

    assert!(validate_tick(&state, &sink).completed);
    assert!(state.goals().both_in_goal());
    assert!(state.goals().level_completed());

    for _ in 0..5 {
        assert!(!validate_tick(&state, &sink).completed);
    }
    assert_eq!(
        sink.events(),
        vec![SimEvent::LevelCompleted { epoch: EPOCH, level: 0 }]
    );
}

#[test]
fn goal_occupancy_is_recomputed_but_completion_sticks() {
    let state = new_state();
    let sink = RecordingSink::new();

    place(&state, Agent::Primary, 18, 13);
    place(&state, Agent::Secondary, 18, 13);
    validate_tick(&state, &sink);
    assert!(state.goals().level_completed());

    place(&state, Agent::Primary, 10, 10);
    validate_tick(&state, &sink);

    let goals = state.goals().snapshot();
    assert!(!goals.primary_in_goal);
    assert!(goals.secondary_in_goal);
    assert!(!goals.both_in_goal);
    assert!(goals.level_completed);
}

#[test]
fn plate_one_answers_to_primary_only() {
    let state = new_state();
    let sink = RecordingSink::new();

    place(&state, Agent::Secondary, 5, 5);
    validate_tick(&state, &sink);
    assert!(!state.gates().is_open(Gate::One));

    place(&state, Agent::Primary, 5, 5);
    let outcome = validate_tick(&state, &sink);
    assert_eq!(outcome.opened, vec![Gate::One]);
    assert!(state.gates().is_open(Gate::One));
}

#[test]
fn plate_two_answers_to_secondary_only() {
    let state = new_state();
    let sink = RecordingSink::new();

    place(&state, Agent::Primary, 6, 5);
    validate_tick(&state, &sink);
    assert!(!state.gates().is_open(Gate::Two));

    place(&state, Agent::Secondary, 6, 5);
    validate_tick(&state, &sink);
    assert!(state.gates().is_open(Gate::Two));
    assert_eq!(gate_events(&sink, Gate::Two), 1);
}

#[test]
fn gates_stay_open_after_plates_are_left() {
    let state = new_state();
    let sink = RecordingSink::new();

    place(&state, Agent::Primary, 5, 5);
    place(&state, Agent::Secondary, 6, 5);
    let outcome = validate_tick(&state, &sink);
    assert_eq!(outcome.opened, vec![Gate::One, Gate::Two]);

    place(&state, Agent::Primary, 10, 10);
    place(&state, Agent::Secondary, 11, 10);
    for _ in 0..3 {
        assert!(!validate_tick(&state, &sink).changed());
    }

    assert!(state.gates().is_open(Gate::One));
    assert!(state.gates().is_open(Gate::Two));
    assert_eq!(gate_events(&sink, Gate::One), 1);
    assert_eq!(gate_events(&sink, Gate::Two), 1);
}

#[test]
fn plate_three_needs_both_agents_in_the_same_sample() {
    init_logger();
    let state = new_state();
    let sink = RecordingSink::new();

    // Taking turns on the plate never opens the gate.
    place(&state, Agent::Primary, 7, 5);
    validate_tick(&state, &sink);
    place(&state, Agent::Primary, 10, 10);
    place(&state, Agent::Secondary, 7, 5);
    validate_tick(&state, &sink);
    assert!(!state.gates().is_open(Gate::Three));

    // Both on it for one tick.
    place(&state, Agent::Primary, 7, 5);
    let outcome = validate_tick(&state, &sink);
    assert_eq!(outcome.opened, vec![Gate::Three]);
    assert!(state.gates().is_open(Gate::Three));

    for _ in 0..5 {
        validate_tick(&state, &sink);
    }
    place(&state, Agent::Secondary, 10, 10);
    validate_tick(&state, &sink);

    assert!(state.gates().is_open(Gate::Three));
    assert_eq!(gate_events(&sink, Gate::Three), 1);
    assert_eq!(
        sink.events(),
        vec![SimEvent::GateOpened { epoch: EPOCH, level: 0, gate: Gate::Three }]
    );
}

#[test]
fn flags_never_go_back_to_false_within_an_epoch() {
    let state = new_state();
    let sink = RecordingSink::new();
    let path = [(5, 5), (6, 5), (7, 5), (18, 13), (3, 3), (7, 5), (18, 13)];

    let mut seen = state.gates().snapshot();
    for (i, &(x, y)) in path.iter().enumerate() {
        place(&state, Agent::Primary, x, y);
        let (sx, sy) = path[(i + 1) % path.len()];
        place(&state, Agent::Secondary, sx, sy);
        validate_tick(&state, &sink);

        let now = state.gates().snapshot();
        assert!(now.gate1 >= seen.gate1);
        assert!(now.gate2 >= seen.gate2);
        assert!(now.gate3 >= seen.gate3);
        seen = now;
    }
}

#[test]
fn commits_are_refused_after_stop() {
    let state = new_state();
    place(&state, Agent::Primary, 3, 3);
    assert_eq!(state.position_cell(Agent::Primary).writes, 1);

    state.run().stop();
    assert!(!state.place(Agent::Primary, centre(4, 4), &SimConfig::default()));

    let cell = state.position_cell(Agent::Primary);
    assert_eq!(cell.pos, centre(3, 3));
    assert_eq!(cell.writes, 1);
    assert_eq!(cell.stamp, EPOCH);
}

#[test]
fn placement_obeys_bounds_and_collision() {
    init_logger();
    let state = new_state();
    let config = SimConfig::default();
    let before = state.position_cell(Agent::Secondary);

    assert!(!state.place(Agent::Secondary, Vec2::new(-500.0, 9000.0), &config));
    assert!(!state.place(Agent::Secondary, Vec2::new(0.5, 300.0), &config));
    assert!(!state.place(Agent::Primary, centre(12, 2), &config));
    assert!(!state.place(Agent::Primary, Vec2::new(470.0, 100.0), &config));
    // Touching the wall is not overlapping it.
    assert!(state.place(Agent::Primary, Vec2::new(465.0, 100.0), &config));

    assert_eq!(state.position_cell(Agent::Secondary), before);
    assert_eq!(state.tile(TileCoord::new(12, 2)), Some(TileKind::Wall));
}

#[test]
fn placement_onto_a_gate_waits_for_its_plate() {
    let state = new_state();
    let sink = RecordingSink::new();
    let config = SimConfig::default();

    assert!(!state.place(Agent::Secondary, centre(14, 2), &config));
    place(&state, Agent::Primary, 5, 5);
    validate_tick(&state, &sink);
    assert!(state.gates().is_open(Gate::One));
    let gates = state.gates().snapshot();
    assert!(gates.gate1 && !gates.gate2 && !gates.gate3);
    assert!(state.place(Agent::Secondary, centre(14, 2), &config));
    assert_eq!(state.position(Agent::Secondary), centre(14, 2));
}
