//! Signal phase state machine tests

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use intersection_sim::simulation::{
    ConfigurationError, Direction, LightColor, Phase, SignalController, SignalMode, SignalPlan,
    SimConfig, SimWorld,
};

fn config_with_plan(plan: SignalPlan) -> SimConfig {
    SimConfig {
        green_duration: 30,
        yellow_duration: 3,
        red_duration: 2,
        signal_plan: plan,
        ..SimConfig::default()
    }
}

fn green_groups(controller: &SignalController) -> usize {
    controller
        .plan()
        .groups()
        .iter()
        .filter(|group| {
            group
                .iter()
                .any(|d| controller.color(*d) == LightColor::Green)
        })
        .count()
}

#[test]
fn test_initial_state() {
    let controller = SignalController::new(&config_with_plan(SignalPlan::two_way()));
    assert_eq!(controller.phase(), Phase::Green(0));
    assert_eq!(controller.remaining(), 30);
    assert_eq!(controller.mode(), SignalMode::Automatic);
    assert_eq!(controller.color(Direction::North), LightColor::Green);
    assert_eq!(controller.color(Direction::South), LightColor::Green);
    assert_eq!(controller.color(Direction::East), LightColor::Red);
    assert_eq!(controller.color(Direction::West), LightColor::Red);
    assert_eq!(controller.phase_label(), "NS_GREEN");
}

#[test]
fn test_green_to_yellow_after_last_second() {
    let mut controller = SignalController::new(&config_with_plan(SignalPlan::four_phase()));

    assert_eq!(controller.advance(29), 0);
    assert_eq!(controller.phase(), Phase::Green(0));
    assert_eq!(controller.remaining(), 1);

    assert_eq!(controller.advance(1), 1);
    assert_eq!(controller.phase(), Phase::Yellow(0));
    assert_eq!(controller.remaining(), 3);
    assert_eq!(controller.phase_label(), "N_YELLOW");
    assert_eq!(controller.color(Direction::North), LightColor::Yellow);
}

#[test]
fn test_full_cycle_with_clearance() {
    let mut controller = SignalController::new(&config_with_plan(SignalPlan::two_way()));

    controller.advance(30);
    assert_eq!(controller.phase(), Phase::Yellow(0));

    controller.advance(3);
    assert_eq!(controller.phase(), Phase::AllRed { next: 1 });
    assert_eq!(controller.remaining(), 2);
    for direction in Direction::ALL {
        assert_eq!(controller.color(direction), LightColor::Red);
    }

    controller.advance(2);
    assert_eq!(controller.phase(), Phase::Green(1));
    assert_eq!(controller.remaining(), 30);
    assert_eq!(controller.color(Direction::East), LightColor::Green);
    assert_eq!(controller.color(Direction::West), LightColor::Green);
    assert_eq!(controller.color(Direction::North), LightColor::Red);

    // and back around to the first group
    controller.advance(30 + 3 + 2);
    assert_eq!(controller.phase(), Phase::Green(0));
}

#[test]
fn test_zero_clearance_skips_all_red() {
    let config = SimConfig {
        red_duration: 0,
        ..config_with_plan(SignalPlan::four_phase())
    };
    let mut controller = SignalController::new(&config);

    controller.advance(30 + 3);
    assert_eq!(controller.phase(), Phase::Green(1));
    assert_eq!(controller.color(Direction::South), LightColor::Green);
}

#[test]
fn test_four_phase_visits_each_direction_in_turn() {
    let config = SimConfig {
        red_duration: 0,
        ..config_with_plan(SignalPlan::four_phase())
    };
    let mut controller = SignalController::new(&config);

    for expected in [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::North,
    ] {
        assert_eq!(controller.color(expected), LightColor::Green);
        assert_eq!(green_groups(&controller), 1);
        controller.advance(33);
    }
}

#[test]
fn test_manual_request_replaces_previous_green() {
    let mut controller = SignalController::new(&config_with_plan(SignalPlan::four_phase()));
    controller.set_auto_mode(false);

    controller
        .request_green(Direction::East)
        .expect("East is in the plan");

    let lights = controller.lights();
    assert_eq!(lights.get(Direction::North), LightColor::Red);
    assert_eq!(lights.get(Direction::South), LightColor::Red);
    assert_eq!(lights.get(Direction::East), LightColor::Green);
    assert_eq!(lights.get(Direction::West), LightColor::Red);
}

#[test]
fn test_manual_request_on_two_way_greens_whole_group() {
    let mut controller = SignalController::new(&config_with_plan(SignalPlan::two_way()));
    controller.set_auto_mode(false);
    controller.request_green(Direction::West).unwrap();

    assert_eq!(controller.color(Direction::East), LightColor::Green);
    assert_eq!(controller.color(Direction::West), LightColor::Green);
    assert_eq!(controller.color(Direction::North), LightColor::Red);
    assert_eq!(controller.color(Direction::South), LightColor::Red);
}

#[test]
fn test_manual_request_rejected_in_automatic_mode() {
    let mut controller = SignalController::new(&config_with_plan(SignalPlan::four_phase()));
    let before = controller.lights();

    assert_eq!(
        controller.request_green(Direction::East),
        Err(ConfigurationError::ManualModeRequired)
    );
    assert_eq!(controller.request_all_red(), Err(ConfigurationError::ManualModeRequired));
    assert_eq!(controller.lights(), before);
    assert_eq!(controller.phase(), Phase::Green(0));
}

#[test]
fn test_manual_request_for_unserved_direction_is_rejected() {
    let plan = SignalPlan::new(vec![vec![Direction::North], vec![Direction::East]]).unwrap();
    let mut controller = SignalController::new(&config_with_plan(plan));
    controller.set_auto_mode(false);

    assert_eq!(
        controller.request_green(Direction::South),
        Err(ConfigurationError::DirectionNotInPlan(Direction::South))
    );
    assert_eq!(controller.phase(), Phase::Green(0));
    assert_eq!(controller.color(Direction::South), LightColor::Red);
}

#[test]
fn test_unknown_direction_name_is_rejected() {
    let mut world = SimWorld::default();
    world.set_auto_mode(false);
    let before = world.lights();

    assert_eq!(
        world.set_manual_phase_by_name("up"),
        Err(ConfigurationError::UnknownDirection("up".to_string()))
    );
    assert_eq!(world.lights(), before);

    world.set_manual_phase_by_name("e").unwrap();
    assert_eq!(world.light(Direction::East), LightColor::Green);
}

#[test]
fn test_manual_mode_suspends_the_countdown() {
    let mut controller = SignalController::new(&config_with_plan(SignalPlan::two_way()));
    controller.advance(10);
    controller.set_auto_mode(false);

    assert_eq!(controller.advance(100), 0);
    assert_eq!(controller.remaining(), 20);
    assert_eq!(controller.phase(), Phase::Green(0));
}

#[test]
fn test_resuming_automatic_restarts_manual_green() {
    let mut controller = SignalController::new(&config_with_plan(SignalPlan::two_way()));
    controller.advance(25);
    controller.set_auto_mode(false);
    controller.request_green(Direction::East).unwrap();
    controller.set_auto_mode(true);

    assert_eq!(controller.mode(), SignalMode::Automatic);
    assert_eq!(controller.phase(), Phase::Green(1));
    assert_eq!(controller.remaining(), 30);

    controller.advance(30);
    assert_eq!(controller.phase(), Phase::Yellow(1));
}

#[test]
fn test_manual_all_red_then_resume_without_clearance() {
    let config = SimConfig {
        red_duration: 0,
        ..config_with_plan(SignalPlan::four_phase())
    };
    let mut controller = SignalController::new(&config);
    controller.set_auto_mode(false);
    controller.request_all_red().unwrap();
    for direction in Direction::ALL {
        assert_eq!(controller.color(direction), LightColor::Red);
    }

    controller.set_auto_mode(true);
    assert_eq!(controller.phase(), Phase::Green(1));
    assert_eq!(controller.remaining(), 30);
}

#[test]
fn test_new_timings_apply_from_next_transition() {
    let mut controller = SignalController::new(&config_with_plan(SignalPlan::two_way()));
    controller.advance(20);

    let faster = SimConfig {
        green_duration: 5,
        yellow_duration: 1,
        ..config_with_plan(SignalPlan::two_way())
    };
    controller.set_timings(&faster);
    assert_eq!(controller.remaining(), 10);

    controller.advance(10);
    assert_eq!(controller.phase(), Phase::Yellow(0));
    assert_eq!(controller.remaining(), 1);
}

#[test]
fn test_plan_validation() {
    assert_eq!(SignalPlan::new(vec![]), Err(ConfigurationError::EmptyPlan));
    assert_eq!(
        SignalPlan::new(vec![vec![Direction::North], vec![]]),
        Err(ConfigurationError::EmptyGroup(1))
    );
    assert_eq!(
        SignalPlan::new(vec![vec![Direction::North], vec![Direction::North]]),
        Err(ConfigurationError::DuplicateDirection(Direction::North))
    );
    assert_eq!(
        SignalPlan::new(vec![vec![Direction::North, Direction::East]]),
        Err(ConfigurationError::ConflictingGroup {
            group: 0,
            a: Direction::North,
            b: Direction::East,
        })
    );
    assert!(SignalPlan::new(vec![vec![Direction::East, Direction::West]]).is_ok());
}

#[test]
fn test_no_conflicting_green_under_random_operations() {
    let mut rng = StdRng::seed_from_u64(42);

    for plan in [SignalPlan::two_way(), SignalPlan::four_phase()] {
        let mut controller = SignalController::new(&config_with_plan(plan));

        for _ in 0..5_000 {
            match rng.random_range(0..5) {
                0 => {
                    controller.advance(rng.random_range(1..10));
                }
                1 => controller.set_auto_mode(rng.random_bool(0.5)),
                2 => {
                    let direction = Direction::ALL[rng.random_range(0..4)];
                    let _ = controller.request_green(direction);
                }
                3 => {
                    let _ = controller.request_all_red();
                }
                _ => controller.reset(),
            }

            assert_eq!(controller.conflicting_greens(), None);
            assert!(green_groups(&controller) <= 1);
        }
    }
}

#[test]
fn test_reset_returns_to_initial_state() {
    let mut controller = SignalController::new(&config_with_plan(SignalPlan::two_way()));
    controller.advance(31);
    controller.set_auto_mode(false);
    controller.request_green(Direction::East).unwrap();

    controller.reset();
    assert_eq!(controller.phase(), Phase::Green(0));
    assert_eq!(controller.remaining(), 30);
    assert_eq!(controller.mode(), SignalMode::Automatic);
}
