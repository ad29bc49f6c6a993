//! Tests that involve the simulation of vehicles on a few straight segments.

use assert_approx_eq::assert_approx_eq;
use signal_sim::{
    math::Point2d, ConfigError, LightState, Simulation, SimulationAttributes,
    TrafficLightAttributes, VehicleAttributes, DT,
};
use std::collections::HashSet;

fn simulation() -> Simulation {
    Simulation::new(&SimulationAttributes {
        seed: Some(1),
        ..Default::default()
    })
    .unwrap()
}

/// Checks that no vehicle is queued on more than one segment, or twice on one.
fn assert_unique_occupancy(sim: &Simulation) {
    let mut seen = HashSet::new();
    for segment in sim.segments() {
        for id in segment.vehicles() {
            assert!(seen.insert(id), "vehicle {:?} queued twice", id);
        }
    }
}

/// Test that a vehicle's position increases monotonically.
#[test]
fn vehicle_drives_forward() {
    let mut sim = simulation();
    sim.create_segment(Point2d::new(0.0, 0.0), Point2d::new(100.0, 0.0))
        .unwrap();
    let veh = sim
        .add_vehicle(&VehicleAttributes {
            route: vec![0],
            acc: 1.44,
            ..Default::default()
        })
        .unwrap();

    let mut pos = sim.get_vehicle(veh).unwrap().pos();
    for _ in 0..100 {
        sim.step();
        let next_pos = sim.get_vehicle(veh).unwrap().pos();
        assert!(next_pos > pos);
        pos = next_pos;
    }
    let world = sim.vehicle_position(veh).unwrap();
    assert_approx_eq!(world.x, pos, 0.01);
    assert_approx_eq!(world.y, 0.0);
}

#[test]
fn clock_advances_until_max_duration() {
    let mut sim = Simulation::new(&SimulationAttributes {
        max_duration: 1.0,
        ..Default::default()
    })
    .unwrap();

    let mut frames = 0;
    while sim.is_running() {
        let t = sim.t();
        sim.step();
        frames += 1;
        assert_approx_eq!(sim.t() - t, DT);
        assert_eq!(sim.frame(), frames);
    }
    assert!(sim.t() >= 1.0);
    assert!(sim.t() < 1.0 + DT + 1e-9);

    let (t, frame) = (sim.t(), sim.frame());
    sim.step();
    sim.run(100);
    assert_eq!(sim.t(), t);
    assert_eq!(sim.frame(), frame);
}

#[test]
fn external_stop_halts_run() {
    let mut sim = simulation();
    sim.run(10);
    sim.stop();
    assert!(!sim.is_running());
    sim.run(10);
    assert_eq!(sim.frame(), 10);
    assert_eq!(sim.average_wait_time(), None);
}

#[test]
fn vehicle_stops_for_red_light() {
    let mut sim = simulation();
    sim.create_segment(Point2d::new(0.0, 0.0), Point2d::new(50.0, 0.0))
        .unwrap();
    sim.add_traffic_light(
        &TrafficLightAttributes {
            red_duration: 1000.0,
            initial_state: LightState::Red,
            ..Default::default()
        },
        0,
    )
    .unwrap();
    let veh = sim
        .add_vehicle(&VehicleAttributes {
            route: vec![0],
            vel: 10.0,
            ..Default::default()
        })
        .unwrap();

    sim.run(20 * 60);
    let vehicle = sim.get_vehicle(veh).unwrap();
    assert_eq!(vehicle.segment(), Some(0));
    assert!(vehicle.pos() >= 46.0 && vehicle.pos() < 50.0);
    assert!(vehicle.is_stopped());
    assert_eq!(vehicle.vel(), 0.0);
    assert_eq!(vehicle.acc(), 0.0);
    assert!(vehicle.wait_time() > 10.0);

    let waited = vehicle.wait_time();
    sim.step();
    assert_approx_eq!(sim.get_vehicle(veh).unwrap().wait_time() - waited, DT);
}

#[test]
fn vehicle_hands_off_between_segments() {
    let mut sim = simulation();
    sim.create_segment(Point2d::new(0.0, 0.0), Point2d::new(20.0, 0.0))
        .unwrap();
    sim.create_segment(Point2d::new(20.0, 0.0), Point2d::new(40.0, 0.0))
        .unwrap();
    let veh = sim
        .add_vehicle(&VehicleAttributes {
            route: vec![0, 1],
            vel: 10.0,
            ..Default::default()
        })
        .unwrap();

    let mut visited = vec![];
    for _ in 0..600 {
        sim.step();
        assert_unique_occupancy(&sim);
        let vehicle = sim.get_vehicle(veh).unwrap();
        if let Some(segment) = vehicle.segment() {
            let queued = sim.get_segment(segment).unwrap().vehicles().collect::<Vec<_>>();
            assert_eq!(queued, vec![veh]);
            if visited.last() != Some(&segment) {
                visited.push(segment);
            }
        }
    }
    assert_eq!(visited, vec![0, 1]);

    // The route is exhausted, but the vehicle is still recorded.
    let vehicle = sim.get_vehicle(veh).unwrap();
    assert_eq!(vehicle.segment(), None);
    assert_eq!(vehicle.route_index(), 1);
    assert_eq!(sim.vehicle_count(), 1);
    assert!(sim.segments().iter().all(|s| s.vehicle_count() == 0));
    assert_eq!(sim.vehicle_position(veh), None);
}

#[test]
fn invalid_route_drops_vehicle() {
    let mut sim = simulation();
    sim.create_segment(Point2d::new(0.0, 0.0), Point2d::new(10.0, 0.0))
        .unwrap();
    let veh = sim
        .add_vehicle(&VehicleAttributes {
            route: vec![0, 7],
            vel: 10.0,
            ..Default::default()
        })
        .unwrap();

    sim.run(300);
    let vehicle = sim.get_vehicle(veh).unwrap();
    assert_eq!(vehicle.segment(), None);
    assert_eq!(vehicle.route_index(), 1);
    assert_eq!(sim.segments()[0].vehicle_count(), 0);
    assert!(sim.is_running());
}

#[test]
fn follower_keeps_minimum_gap() {
    let mut sim = simulation();
    sim.create_segment(Point2d::new(0.0, 0.0), Point2d::new(60.0, 0.0))
        .unwrap();
    sim.add_traffic_light(
        &TrafficLightAttributes {
            red_duration: 1000.0,
            ..Default::default()
        },
        0,
    )
    .unwrap();
    let lead = sim
        .add_vehicle(&VehicleAttributes {
            route: vec![0],
            vel: 10.0,
            ..Default::default()
        })
        .unwrap();
    sim.run(120);
    let follower = sim
        .add_vehicle(&VehicleAttributes {
            route: vec![0],
            vel: 10.0,
            ..Default::default()
        })
        .unwrap();

    for _ in 0..1200 {
        sim.step();
        let lead = sim.get_vehicle(lead).unwrap();
        let follower = sim.get_vehicle(follower).unwrap();
        assert!(follower.pos() < lead.pos() - lead.length());
    }
    let queued = sim.segments()[0].vehicles().collect::<Vec<_>>();
    assert_eq!(queued, vec![lead, follower]);
    assert!(sim.get_vehicle(follower).unwrap().is_stopped());
}

#[test]
fn rejects_bad_network() {
    let mut sim = simulation();
    let p = Point2d::new(1.0, 1.0);
    assert!(matches!(
        sim.create_segment(p, p),
        Err(ConfigError::DegenerateSegment)
    ));
    assert!(matches!(
        sim.add_traffic_light(&TrafficLightAttributes::default(), 0),
        Err(ConfigError::UnknownSegment(0))
    ));
    assert!(matches!(
        sim.add_vehicle(&VehicleAttributes {
            route: vec![3],
            ..Default::default()
        }),
        Err(ConfigError::UnknownSegment(3))
    ));

    let parked = sim.add_vehicle(&VehicleAttributes::default()).unwrap();
    sim.run(60);
    assert_eq!(sim.get_vehicle(parked).unwrap().segment(), None);
}
