//! Read-only, serialisable views of a simulation for visualisers and tests.

use crate::light::LightState;
use crate::segment::SegmentId;
use crate::Simulation;
use serde::Serialize;
use slotmap::Key;

/// The state of a simulation at one instant.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationSnapshot {
    pub t: f64,
    pub frame: usize,
    pub running: bool,
    pub vehicles: Vec<VehicleSnapshot>,
    pub segments: Vec<SegmentSnapshot>,
    pub lights: Vec<LightSnapshot>,
}

/// The state of a single vehicle.
#[derive(Clone, Debug, Serialize)]
pub struct VehicleSnapshot {
    /// A stable identifier for the vehicle.
    pub id: u64,
    /// The segment the vehicle is on, if it is still in the network.
    pub segment: Option<SegmentId>,
    pub route_index: usize,
    pub pos: f64,
    pub vel: f64,
    pub acc: f64,
    pub stopped: bool,
    pub wait_time: f64,
    /// The world coordinates of the vehicle, if it is on a segment.
    pub world_pos: Option<[f64; 2]>,
}

/// The occupancy of a segment.
#[derive(Clone, Debug, Serialize)]
pub struct SegmentSnapshot {
    pub length: f64,
    /// The vehicles on the segment, lead vehicle first.
    pub vehicles: Vec<u64>,
}

/// The state of a traffic light.
#[derive(Clone, Debug, Serialize)]
pub struct LightSnapshot {
    /// The segment the light controls.
    pub segment: SegmentId,
    pub state: LightState,
}

impl SimulationSnapshot {
    pub(crate) fn capture(sim: &Simulation) -> Self {
        let vehicles = sim
            .iter_vehicles()
            .map(|vehicle| VehicleSnapshot {
                id: vehicle.id().data().as_ffi(),
                segment: vehicle.segment(),
                route_index: vehicle.route_index(),
                pos: vehicle.pos(),
                vel: vehicle.vel(),
                acc: vehicle.acc(),
                stopped: vehicle.is_stopped(),
                wait_time: vehicle.wait_time(),
                world_pos: sim.vehicle_position(vehicle.id()).map(|p| [p.x, p.y]),
            })
            .collect();
        let segments = sim
            .segments()
            .iter()
            .map(|segment| SegmentSnapshot {
                length: segment.length(),
                vehicles: segment.vehicles().map(|id| id.data().as_ffi()).collect(),
            })
            .collect();
        let lights = sim
            .iter_lights()
            .map(|(light, segment)| LightSnapshot {
                segment,
                state: light.state(),
            })
            .collect();
        Self {
            t: sim.t(),
            frame: sim.frame(),
            running: sim.is_running(),
            vehicles,
            segments,
            lights,
        }
    }

    /// Serialises the snapshot as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
