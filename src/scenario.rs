//! Ready-made networks.

use crate::error::ConfigError;
use crate::generator::GeneratorAttributes;
use crate::light::{LightState, TrafficLightAttributes};
use crate::math::Point2d;
use crate::simulation::{Simulation, SimulationAttributes};
use crate::vehicle::VehicleAttributes;

/// The distance between the centre lines of opposing lanes, in m.
const LANE_SPACE: f64 = 3.5;
/// The width of the box in the middle of the intersection, in m.
const INTERSECTION_SIZE: f64 = 12.0;
/// The length of each approach, in m.
const APPROACH_LENGTH: f64 = 100.0;
/// The speed at which generated vehicles arrive, in m/s.
const ARRIVAL_SPEED: f64 = 16.6;

/// Routes through the four-way intersection, by segment index.
///
/// Segments 0-3 are the approaches (south, east, north, west), 4-7 the exits,
/// 8-11 straight through, 12-15 right turns and 16-19 left turns.
const ROUTES: [[usize; 3]; 12] = [
    // straight
    [0, 8, 6],
    [1, 9, 7],
    [2, 10, 4],
    [3, 11, 5],
    // right turn
    [0, 12, 5],
    [1, 13, 6],
    [2, 14, 7],
    [3, 15, 4],
    // left turn
    [0, 16, 7],
    [1, 17, 4],
    [2, 18, 5],
    [3, 19, 6],
];

/// Builds a single lane four-way intersection with a light on each approach.
///
/// The lights are registered south, north, east, west; south and north
/// start red and east and west start green. One generator sends vehicles
/// along all twelve movements with equal probability.
pub fn four_way_intersection(attributes: &SimulationAttributes) -> Result<Simulation, ConfigError> {
    let mut sim = Simulation::new(attributes)?;

    let p = Point2d::new;
    let (a, b, c) = (LANE_SPACE / 2.0, INTERSECTION_SIZE / 2.0, APPROACH_LENGTH + INTERSECTION_SIZE / 2.0);

    // Approaches
    sim.create_segment(p(a, c), p(a, b))?;
    sim.create_segment(p(c, -a), p(b, -a))?;
    sim.create_segment(p(-a, -c), p(-a, -b))?;
    sim.create_segment(p(-c, a), p(-b, a))?;
    // Exits
    sim.create_segment(p(-a, b), p(-a, c))?;
    sim.create_segment(p(b, a), p(c, a))?;
    sim.create_segment(p(a, -b), p(a, -c))?;
    sim.create_segment(p(-b, -a), p(-c, -a))?;
    // Straight through
    sim.create_segment(p(a, b), p(a, -b))?;
    sim.create_segment(p(b, -a), p(-b, -a))?;
    sim.create_segment(p(-a, -b), p(-a, b))?;
    sim.create_segment(p(-b, a), p(b, a))?;
    // Right turns
    sim.create_quadratic_bezier_curve(p(a, b), p(a, a), p(b, a))?;
    sim.create_quadratic_bezier_curve(p(b, -a), p(a, -a), p(a, -b))?;
    sim.create_quadratic_bezier_curve(p(-a, -b), p(-a, -a), p(-b, -a))?;
    sim.create_quadratic_bezier_curve(p(-b, a), p(-a, a), p(-a, b))?;
    // Left turns
    sim.create_quadratic_bezier_curve(p(a, b), p(a, -a), p(-b, -a))?;
    sim.create_quadratic_bezier_curve(p(b, -a), p(-a, -a), p(-a, b))?;
    sim.create_quadratic_bezier_curve(p(-a, -b), p(-a, a), p(b, a))?;
    sim.create_quadratic_bezier_curve(p(-b, a), p(a, a), p(a, -b))?;

    let light = |initial_state| TrafficLightAttributes {
        initial_state,
        ..Default::default()
    };
    sim.add_traffic_light(&light(LightState::Red), 0)?;
    sim.add_traffic_light(&light(LightState::Red), 2)?;
    sim.add_traffic_light(&light(LightState::Green), 1)?;
    sim.add_traffic_light(&light(LightState::Green), 3)?;

    let vehicles = ROUTES
        .iter()
        .map(|route| {
            let vehicle = VehicleAttributes {
                route: route.to_vec(),
                vel: ARRIVAL_SPEED,
                ..Default::default()
            };
            (2, vehicle)
        })
        .collect();
    sim.add_vehicle_generator(&GeneratorAttributes {
        vehicles,
        ..Default::default()
    })?;

    Ok(sim)
}
