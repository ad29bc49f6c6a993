//! Simulation of vehicle traffic through a signalised intersection.
//!
//! Vehicles follow each other along a network of road [Segment]s, stopping
//! for red [TrafficLight]s, while [VehicleGenerator]s feed new vehicles in.
//! Optionally a [QLearningAgent] chooses the light phases.

pub use cgmath;
pub use control::{ConflictTable, Phase, PhasePlan};
pub use error::ConfigError;
pub use generator::{GeneratorAttributes, VehicleGenerator};
pub use learning::{LearningAttributes, QLearningAgent};
pub use light::{LightState, TrafficLight, TrafficLightAttributes};
pub use segment::{Segment, SegmentCurve, SegmentId};
pub use simulation::{Simulation, SimulationAttributes, DT};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use snapshot::{LightSnapshot, SegmentSnapshot, SimulationSnapshot, VehicleSnapshot};
pub use vehicle::{LeadVehicle, Vehicle, VehicleAttributes};

mod control;
mod error;
mod generator;
mod learning;
mod light;
pub mod math;
pub mod scenario;
mod segment;
mod simulation;
mod snapshot;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
