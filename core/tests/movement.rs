use duomaze_core::{
    config::SimConfig,
    input::DirectionInput,
    movement::{resolve, MoveBounds},
    types::Vec2,
};

fn bounds() -> MoveBounds {
    MoveBounds::from_config(&SimConfig::default())
}

fn keys(left: bool, right: bool, up: bool, down: bool) -> DirectionInput {
    DirectionInput { left, right, up, down }
}

#[test]
fn bounds_follow_margin_and_extent() {
    let b = bounds();
    assert_eq!((b.min_x, b.min_y), (1.0, 1.0));
    assert_eq!((b.max_x, b.max_y), (799.0, 599.0));
    assert!(b.contains(Vec2::new(1.0, 599.0)));
    assert!(!b.contains(Vec2::new(0.5, 300.0)));
}

#[test]
fn each_direction_moves_speed_units() {
    let start = Vec2::new(100.0, 100.0);
    let b = bounds();

    assert_eq!(resolve(start, keys(true, false, false, false), 3.0, &b), Vec2::new(97.0, 100.0));
    assert_eq!(resolve(start, keys(false, true, false, false), 3.0, &b), Vec2::new(103.0, 100.0));
    assert_eq!(resolve(start, keys(false, false, true, false), 3.0, &b), Vec2::new(100.0, 97.0));
    assert_eq!(resolve(start, keys(false, false, false, true), 3.0, &b), Vec2::new(100.0, 103.0));
}

#[test]
fn diagonals_move_both_axes_and_opposites_cancel() {
    let start = Vec2::new(100.0, 100.0);
    let b = bounds();

    assert_eq!(resolve(start, keys(false, true, false, true), 3.0, &b), Vec2::new(103.0, 103.0));
    assert_eq!(resolve(start, keys(true, true, false, false), 3.0, &b), start);
    assert_eq!(resolve(start, keys(true, true, true, true), 3.0, &b), start);
    assert_eq!(resolve(start, DirectionInput::NONE, 3.0, &b), start);
}

#[test]
fn result_is_clamped_into_bounds() {
    let b = bounds();

    let near_left = Vec2::new(2.0, 2.0);
    assert_eq!(resolve(near_left, keys(true, false, true, false), 3.0, &b), Vec2::new(1.0, 1.0));

    let near_right = Vec2::new(798.0, 598.0);
    assert_eq!(resolve(near_right, keys(false, true, false, true), 3.0, &b), Vec2::new(799.0, 599.0));
}
