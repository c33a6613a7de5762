//! World lifecycle, configuration and driver tests

use intersection_sim::simulation::{
    Command, ConfigurationError, Direction, LaneId, LightColor, Phase, SignalMode, SignalPlan,
    SimClock, SimConfig, SimDriver, SimWorld, VehicleClass,
};

fn run_frames(world: &mut SimWorld, clock: &mut SimClock, frames: usize) {
    for _ in 0..frames {
        clock.frame(world, 33.0);
    }
}

#[test]
fn test_default_config_is_valid() {
    let config = SimConfig::default();
    assert_eq!(config.validate(), Ok(()));
    let geometry = config.geometry();
    assert_eq!(geometry.stop_line, 150.0);
    assert_eq!(geometry.far_edge, 180.0);
    assert_eq!(geometry.exit, 350.0);
}

#[test]
fn test_invalid_config_rejected() {
    let cases = [
        (
            SimConfig {
                green_duration: 0,
                ..SimConfig::default()
            },
            ConfigurationError::DurationTooShort {
                field: "greenDuration",
            },
        ),
        (
            SimConfig {
                yellow_duration: 0,
                ..SimConfig::default()
            },
            ConfigurationError::DurationTooShort {
                field: "yellowDuration",
            },
        ),
        (
            SimConfig {
                spawn_rate: 1.5,
                ..SimConfig::default()
            },
            ConfigurationError::SpawnRateOutOfRange(1.5),
        ),
        (
            SimConfig {
                min_gap: 0.0,
                ..SimConfig::default()
            },
            ConfigurationError::NotPositive {
                field: "minGap",
                value: 0.0,
            },
        ),
        (
            SimConfig {
                lanes_per_direction: 5,
                ..SimConfig::default()
            },
            ConfigurationError::LaneCountOutOfRange { actual: 5, max: 4 },
        ),
        (
            SimConfig {
                max_vehicles: Some(0),
                ..SimConfig::default()
            },
            ConfigurationError::ZeroCapacity {
                field: "maxVehicles",
            },
        ),
    ];

    for (config, expected) in cases {
        assert_eq!(config.validate(), Err(expected.clone()));
        assert_eq!(SimWorld::new(config).err(), Some(expected));
    }
}

#[test]
fn test_configure_error_leaves_world_untouched() {
    let mut world = SimWorld::default();
    let bad = SimConfig {
        spawn_rate: 2.0,
        ..SimConfig::default()
    };

    assert_eq!(
        world.configure(bad),
        Err(ConfigurationError::SpawnRateOutOfRange(2.0))
    );
    assert_eq!(world.config(), &SimConfig::default());
}

#[test]
fn test_configure_is_idempotent() {
    let config = SimConfig {
        spawn_rate: 0.8,
        ..SimConfig::default()
    };
    let mut a = SimWorld::new_with_seed(config.clone(), 11).unwrap();
    let mut b = SimWorld::new_with_seed(config.clone(), 11).unwrap();
    let (mut clock_a, mut clock_b) = (SimClock::new(), SimClock::new());

    run_frames(&mut a, &mut clock_a, 200);
    run_frames(&mut b, &mut clock_b, 200);
    b.configure(config.clone()).unwrap();
    b.configure(config).unwrap();
    run_frames(&mut a, &mut clock_a, 800);
    run_frames(&mut b, &mut clock_b, 800);

    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn test_configure_keeps_vehicles_and_defers_timings() {
    let mut world = SimWorld::default();
    world
        .add_vehicle(LaneId::new(Direction::North, 0), VehicleClass::Truck, 20.0, 0.5)
        .unwrap();
    world.advance_phase_clock(10);

    let shorter = SimConfig {
        green_duration: 5,
        ..SimConfig::default()
    };
    world.configure(shorter).unwrap();

    assert_eq!(world.vehicles().len(), 1);
    assert_eq!(world.countdown(), Some(20));
    assert_eq!(world.config().green_duration, 5);
}

#[test]
fn test_configure_with_new_plan_restarts_cycle() {
    let mut world = SimWorld::default();
    world.advance_phase_clock(31);
    assert_eq!(world.phase(), Phase::Yellow(0));

    let four = SimConfig {
        signal_plan: SignalPlan::four_phase(),
        ..SimConfig::default()
    };
    world.configure(four).unwrap();
    assert_eq!(world.phase(), Phase::Green(0));
    assert_eq!(world.light(Direction::North), LightColor::Green);
    assert_eq!(world.light(Direction::South), LightColor::Red);
}

#[test]
fn test_reset_replays_seeded_run() {
    let config = SimConfig {
        spawn_rate: 0.7,
        ..SimConfig::default()
    };
    let mut world = SimWorld::new_with_seed(config.clone(), 5).unwrap();
    let mut fresh = SimWorld::new_with_seed(config, 5).unwrap();

    for _ in 0..500 {
        world.tick(33.0);
    }
    world.advance_phase_clock(12);
    world.set_auto_mode(false);
    world.reset();

    assert!(world.vehicles().is_empty());
    assert_eq!(world.throughput(), 0);
    assert_eq!(world.phase(), Phase::Green(0));
    assert_eq!(world.signal_mode(), SignalMode::Automatic);
    assert_eq!(world.stats().frames, 0);

    for _ in 0..300 {
        world.tick(33.0);
        fresh.tick(33.0);
    }
    assert_eq!(world.snapshot(), fresh.snapshot());
}

#[test]
fn test_total_vehicle_cap() {
    let config = SimConfig {
        spawn_rate: 1.0,
        lanes_per_direction: 2,
        max_vehicles: Some(3),
        ..SimConfig::default()
    };
    let mut world = SimWorld::new_with_seed(config, 9).unwrap();

    for _ in 0..2000 {
        world.tick(1000.0);
        assert!(world.vehicles().len() <= 3);
    }
    assert!(world.stats().total_spawned >= 3);
}

#[test]
fn test_per_lane_cap() {
    let config = SimConfig {
        spawn_rate: 1.0,
        max_vehicles_per_lane: Some(2),
        max_vehicles: None,
        ..SimConfig::default()
    };
    let mut world = SimWorld::new_with_seed(config, 9).unwrap();
    world.set_auto_mode(false);
    world.set_manual_all_red().unwrap();

    for _ in 0..3000 {
        world.tick(1000.0);
    }
    for direction in Direction::ALL {
        let lane = LaneId::new(direction, 0);
        let count = world.vehicles().iter().filter(|v| v.lane == lane).count();
        assert_eq!(count, 2, "{lane}");
    }
}

#[test]
fn test_vehicle_ids_are_unique_and_increasing() {
    let config = SimConfig {
        spawn_rate: 1.0,
        lanes_per_direction: 3,
        max_vehicles: None,
        ..SimConfig::default()
    };
    let mut world = SimWorld::new_with_seed(config, 4).unwrap();
    let mut seen = Vec::new();

    for _ in 0..400 {
        world.tick(500.0);
        for vehicle in world.vehicles() {
            if !seen.contains(&vehicle.id) {
                if let Some(last) = seen.last() {
                    assert!(vehicle.id > *last);
                }
                seen.push(vehicle.id);
            }
        }
    }
    assert_eq!(seen.len() as u64, world.stats().total_spawned);
}

#[test]
fn test_add_vehicle_rejects_overlap_and_unknown_lane() {
    let mut world = SimWorld::default();
    let lane = LaneId::new(Direction::West, 0);

    world.add_vehicle(lane, VehicleClass::Car, 50.0, 0.5).unwrap();
    assert!(world.add_vehicle(lane, VehicleClass::Car, 53.0, 0.5).is_err());
    assert!(world
        .add_vehicle(LaneId::new(Direction::West, 1), VehicleClass::Car, 10.0, 0.5)
        .is_err());
    assert!(world.add_vehicle(lane, VehicleClass::Car, 80.0, -1.0).is_err());
    assert_eq!(world.vehicles().len(), 1);
}

#[test]
fn test_snapshot_serializes_to_json() {
    let mut world = SimWorld::default();
    world
        .add_vehicle(LaneId::new(Direction::South, 0), VehicleClass::Bus, 30.0, 0.4)
        .unwrap();
    world.tick(33.0);

    let value = serde_json::to_value(world.snapshot()).unwrap();
    assert_eq!(value["lights"]["North"], "green");
    assert_eq!(value["lights"]["East"], "red");
    assert_eq!(value["phase"], "NS_GREEN");
    assert_eq!(value["mode"], "automatic");
    assert_eq!(value["countdown"], 30);
    assert_eq!(value["vehicles"][0]["class"], "bus");
    assert_eq!(value["vehicles"][0]["motionState"], "moving");
    assert_eq!(value["vehicles"][0]["crossedIntersection"], false);
}

#[test]
fn test_countdown_is_absent_while_held_manually() {
    let mut world = SimWorld::default();
    world.advance_phase_clock(5);
    world.set_auto_mode(false);
    world.set_manual_phase(Direction::East).unwrap();

    assert_eq!(world.countdown(), None);
    let value = serde_json::to_value(world.snapshot()).unwrap();
    assert!(value["countdown"].is_null());
    assert!(world.draw_map().contains("held"));

    world.set_auto_mode(true);
    assert_eq!(world.countdown(), Some(30));
}

#[test]
fn test_config_from_json() {
    let config = SimConfig::from_json_str(
        r#"{ "greenDuration": 20, "spawnRate": 0.5, "vehicleClass": "truck" }"#,
    )
    .unwrap();
    assert_eq!(config.green_duration, 20);
    assert_eq!(config.spawn_rate, 0.5);
    assert_eq!(config.vehicle_class, Some(VehicleClass::Truck));
    assert_eq!(config.yellow_duration, 3);

    assert!(SimConfig::from_json_str(r#"{ "spawnRate": 2.0 }"#).is_err());
    assert!(SimConfig::from_json_str(r#"{ "greenDuration": -5 }"#).is_err());
    assert!(SimConfig::from_json_str(
        r#"{ "signalPlan": { "groups": [["North", "East"]] } }"#
    )
    .is_err());
}

#[test]
fn test_phase_clock_counts_whole_seconds() {
    let mut world = SimWorld::default();
    let mut clock = SimClock::new();

    run_frames(&mut world, &mut clock, 30);
    assert_eq!(world.countdown(), Some(30));
    run_frames(&mut world, &mut clock, 1);
    assert_eq!(world.countdown(), Some(29));
}

#[test]
fn test_draw_map_shows_vehicles() {
    let mut world = SimWorld::default();
    world
        .add_vehicle(LaneId::new(Direction::North, 0), VehicleClass::Car, 100.0, 0.5)
        .unwrap();

    let map = world.draw_map();
    assert!(map.starts_with("=== Intersection ==="));
    assert!(map.contains('^'));
    assert!(map.contains("N:G"));
}

#[test]
fn test_draw_map_widens_road_for_extra_lanes() {
    let crossing_cells = |lanes: u8| {
        let config = SimConfig {
            lanes_per_direction: lanes,
            ..SimConfig::default()
        };
        let world = SimWorld::new(config).unwrap();
        world.draw_map().matches('+').count()
    };
    assert!(crossing_cells(4) > crossing_cells(1));
}

#[test]
fn test_driver_applies_commands_between_frames() {
    let (mut driver, handle) = SimDriver::new(SimWorld::default(), 33.0);

    handle.send(Command::SetAutoMode(false)).unwrap();
    handle.send(Command::SetManualPhase(Direction::East)).unwrap();
    assert_eq!(driver.world().light(Direction::East), LightColor::Red);

    assert!(driver.step());
    assert_eq!(driver.world().light(Direction::East), LightColor::Green);
    assert_eq!(driver.world().light(Direction::North), LightColor::Red);
    assert_eq!(driver.world().signal_mode(), SignalMode::Manual);
}

#[test]
fn test_driver_rejected_command_changes_nothing() {
    let (mut driver, handle) = SimDriver::new(SimWorld::default(), 33.0);
    let before = driver.world().lights();

    handle.send(Command::SetManualPhase(Direction::East)).unwrap();
    handle
        .send(Command::Configure(SimConfig {
            lanes_per_direction: 0,
            ..SimConfig::default()
        }))
        .unwrap();

    assert!(driver.step());
    assert_eq!(driver.world().lights(), before);
    assert_eq!(driver.world().config(), &SimConfig::default());
}

#[test]
fn test_driver_stops_on_request() {
    let (mut driver, handle) = SimDriver::new(SimWorld::default(), 33.0);
    let stopper = handle.clone();

    let frames = driver.run(None, false, |_, frame| {
        if frame == 5 {
            stopper.stop();
        }
    });

    assert_eq!(frames, 5);
    assert!(handle.is_stopped());
    assert!(!driver.step());
    assert_eq!(driver.world().stats().frames, 5);
}

#[test]
fn test_driver_runs_frame_budget_and_resets() {
    let (mut driver, handle) = SimDriver::new(SimWorld::default(), 100.0);

    assert_eq!(driver.run(Some(25), false, |_, _| {}), 25);
    assert_eq!(driver.world().countdown(), Some(28));

    handle.send(Command::Reset).unwrap();
    driver.step();
    let world = driver.into_world();
    assert_eq!(world.stats().frames, 1);
    assert_eq!(world.countdown(), Some(30));
}
