use crate::control::{ConflictTable, PhasePlan};
use crate::error::{positive, ConfigError};
use crate::generator::{GeneratorAttributes, VehicleGenerator};
use crate::learning::{LearningAttributes, QLearningAgent};
use crate::light::{TrafficLight, TrafficLightAttributes};
use crate::math::{CubicBezier2d, LineSegment2d, ParametricCurve2d, Point2d, QuadraticBezier2d};
use crate::segment::{Segment, SegmentId};
use crate::snapshot::SimulationSnapshot;
use crate::vehicle::{LeadVehicle, Vehicle, VehicleAttributes};
use crate::{VehicleId, VehicleSet};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

/// The simulation time step, in s.
pub const DT: f64 = 1.0 / 60.0;

/// The reward penalty for each pair of conflicting lights that are green together.
const CONFLICT_PENALTY: f64 = 100.0;

/// A traffic simulation.
pub struct Simulation {
    /// The segments in the network.
    segments: Vec<Segment>,
    /// Every vehicle that has entered the simulation.
    vehicles: VehicleSet,
    /// The traffic lights, in registration order, with the segment each controls.
    lights: Vec<(TrafficLight, SegmentId)>,
    /// The vehicle generators.
    generators: Vec<VehicleGenerator>,
    /// The signal controller, if learning is enabled.
    agent: Option<QLearningAgent>,
    /// The light phase chosen by each controller action.
    phases: PhasePlan,
    /// The segment pairs which may not be green together.
    conflicts: ConflictTable,
    /// The random number generator shared by the generators and the controller.
    rng: StdRng,
    /// The simulation time in s.
    t: f64,
    /// The current frame of simulation.
    frame: usize,
    /// The simulation stops once `t` reaches this, in s.
    max_duration: f64,
    /// Whether the simulation is still running.
    running: bool,
}

/// The attributes of a simulation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationAttributes {
    /// The simulated time after which the simulation stops, in s.
    pub max_duration: f64,
    /// Whether the traffic lights are driven by a Q-learning controller.
    pub use_q_learning: bool,
    /// The number of states in the controller's table.
    pub state_size: usize,
    /// The number of actions in the controller's table.
    pub action_size: usize,
    /// The controller's hyperparameters.
    pub learning: LearningAttributes,
    /// The light phase for each controller action.
    pub phases: PhasePlan,
    /// The segment pairs which may not be green together.
    pub conflicts: ConflictTable,
    /// Seeds the random number generator, for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SimulationAttributes {
    fn default() -> Self {
        Self {
            max_duration: 200.0,
            use_q_learning: false,
            state_size: 4,
            action_size: 2,
            learning: LearningAttributes::default(),
            phases: PhasePlan::default(),
            conflicts: ConflictTable::default(),
            seed: None,
        }
    }
}

impl SimulationAttributes {
    /// Parses simulation attributes from JSON, rejecting unknown keys.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let attributes: Self = serde_json::from_str(json)?;
        attributes.validate()?;
        Ok(attributes)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("max_duration", self.max_duration)?;
        if self.use_q_learning {
            positive("state_size", self.state_size as f64)?;
            positive("action_size", self.action_size as f64)?;
            if self.action_size > self.phases.len() {
                return Err(ConfigError::InvalidParameter {
                    name: "action_size",
                    value: self.action_size as f64,
                });
            }
            self.learning.validate()?;
        }
        Ok(())
    }
}

impl Simulation {
    /// Creates a new simulation with an empty network.
    pub fn new(attributes: &SimulationAttributes) -> Result<Self, ConfigError> {
        attributes.validate()?;
        let agent = if attributes.use_q_learning {
            Some(QLearningAgent::new(
                attributes.state_size,
                attributes.action_size,
                &attributes.learning,
            )?)
        } else {
            None
        };
        let rng = match attributes.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            segments: vec![],
            vehicles: VehicleSet::with_key(),
            lights: vec![],
            generators: vec![],
            agent,
            phases: attributes.phases.clone(),
            conflicts: attributes.conflicts.clone(),
            rng,
            t: 0.0,
            frame: 0,
            max_duration: attributes.max_duration,
            running: true,
        })
    }

    /// Adds a segment following the given curve to the network.
    pub fn add_segment(&mut self, curve: &impl ParametricCurve2d) -> Result<SegmentId, ConfigError> {
        let segment = Segment::new(curve);
        if segment.length() <= 0.0 {
            return Err(ConfigError::DegenerateSegment);
        }
        self.segments.push(segment);
        Ok(self.segments.len() - 1)
    }

    /// Adds a straight segment.
    pub fn create_segment(&mut self, start: Point2d, end: Point2d) -> Result<SegmentId, ConfigError> {
        self.add_segment(&LineSegment2d::from_ends(start, end))
    }

    /// Adds a segment following a quadratic bezier curve.
    pub fn create_quadratic_bezier_curve(
        &mut self,
        start: Point2d,
        control: Point2d,
        end: Point2d,
    ) -> Result<SegmentId, ConfigError> {
        self.add_segment(&QuadraticBezier2d::new(&[start, control, end]))
    }

    /// Adds a segment following a cubic bezier curve.
    pub fn create_cubic_bezier_curve(
        &mut self,
        start: Point2d,
        control_1: Point2d,
        control_2: Point2d,
        end: Point2d,
    ) -> Result<SegmentId, ConfigError> {
        self.add_segment(&CubicBezier2d::new(&[start, control_1, control_2, end]))
    }

    /// Adds a traffic light controlling the end of `segment`.
    /// Returns the light's registration index.
    pub fn add_traffic_light(
        &mut self,
        attributes: &TrafficLightAttributes,
        segment: SegmentId,
    ) -> Result<usize, ConfigError> {
        if segment >= self.segments.len() {
            return Err(ConfigError::UnknownSegment(segment));
        }
        self.lights.push((TrafficLight::new(attributes)?, segment));
        Ok(self.lights.len() - 1)
    }

    /// Adds a vehicle generator. Every route it generates must start on an existing segment.
    pub fn add_vehicle_generator(&mut self, attributes: &GeneratorAttributes) -> Result<(), ConfigError> {
        let generator = VehicleGenerator::new(attributes, &mut self.rng)?;
        for vehicle in generator.templates() {
            let first = vehicle.route[0];
            if first >= self.segments.len() {
                return Err(ConfigError::UnknownSegment(first));
            }
        }
        self.generators.push(generator);
        Ok(())
    }

    /// Adds a vehicle at the start of the first segment on its route.
    /// A vehicle with an empty route is recorded but never enters the network.
    pub fn add_vehicle(&mut self, attributes: &VehicleAttributes) -> Result<VehicleId, ConfigError> {
        attributes.validate()?;
        if let Some(&first) = attributes.route.first() {
            if first >= self.segments.len() {
                return Err(ConfigError::UnknownSegment(first));
            }
        }
        Ok(self.insert_vehicle(attributes))
    }

    fn insert_vehicle(&mut self, attributes: &VehicleAttributes) -> VehicleId {
        let vehicle_id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, attributes));
        if let Some(&first) = attributes.route.first() {
            if let Some(segment) = self.segments.get_mut(first) {
                segment.push_vehicle(vehicle_id);
                self.vehicles[vehicle_id].enter(0, first);
            }
        }
        log::debug!("vehicle {:?} added at t={:.2}", vehicle_id, self.t);
        vehicle_id
    }

    /// Changes the simulated time at which the simulation stops.
    pub fn set_max_duration(&mut self, max_duration: f64) {
        self.max_duration = max_duration;
    }

    /// Advances the simulation by one time step of [DT] seconds.
    /// Does nothing once the simulation has stopped.
    pub fn step(&mut self) {
        if !self.running {
            return;
        }

        let decision = match &self.agent {
            Some(agent) => {
                let state = self.encode_state();
                Some((state, agent.choose_action(state, &mut self.rng)))
            }
            None => None,
        };

        if let Some((_, action)) = decision {
            self.set_traffic_phase(action);
        }
        self.update_lights();
        self.update_vehicles();
        self.advance_vehicles();
        self.spawn_vehicles();
        self.t += DT;
        self.frame += 1;

        if let Some((state, action)) = decision {
            let reward = self.calculate_reward();
            let next_state = self.encode_state();
            if let Some(agent) = self.agent.as_mut() {
                agent.update(state, action, reward, next_state);
            }
        }

        if self.t >= self.max_duration {
            self.stop();
        }
    }

    /// Steps the simulation up to `steps` times, or until it stops.
    pub fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            if !self.running {
                break;
            }
            self.step();
        }
    }

    /// Stops the simulation and reports the mean wait time.
    pub fn stop(&mut self) {
        self.running = false;
        match self.average_wait_time() {
            Some(avg) => log::info!(
                "simulation stopped at t={:.2}: mean wait time {:.2} s over {} vehicles",
                self.t,
                avg,
                self.vehicles.len()
            ),
            None => log::info!("simulation stopped at t={:.2}: no vehicles entered", self.t),
        }
    }

    /// Requests the lights to show the phase selected by `action`:
    /// green for the lights in the phase and red for the rest.
    /// Each request is still subject to the light's minimum phase duration.
    pub fn set_traffic_phase(&mut self, action: usize) {
        let Some(phase) = self.phases.phase(action) else {
            log::warn!("no phase defined for action {}", action);
            return;
        };
        for idx in phase.iter().filter(|idx| **idx >= self.lights.len()) {
            log::debug!("phase {} names unregistered light {}", action, idx);
        }
        for (idx, (light, _)) in self.lights.iter_mut().enumerate() {
            light.set_state(phase.contains(&idx));
        }
    }

    /// Encodes the light states as a binary number, first light most significant,
    /// with a red light as a one.
    ///
    /// With learning enabled the result is clamped to the last state in the table,
    /// so networks with more lights than the table can represent share that state.
    pub fn encode_state(&self) -> usize {
        let state = self.lights.iter().fold(0usize, |state, (light, _)| {
            state.saturating_mul(2).saturating_add(light.is_red() as usize)
        });
        match &self.agent {
            Some(agent) => state.min(agent.state_size() - 1),
            None => state,
        }
    }

    /// Scores the current state of the intersection: penalises conflicting
    /// green lights and accumulated waiting, and rewards moving vehicles.
    pub fn calculate_reward(&self) -> f64 {
        let conflicting = self
            .lights
            .iter()
            .tuple_combinations()
            .filter(|((a, seg_a), (b, seg_b))| {
                a.is_green() && b.is_green() && self.conflicts.conflicts(*seg_a, *seg_b)
            })
            .count();
        let moving = self.vehicles.values().filter(|v| v.is_moving()).count();
        -CONFLICT_PENALTY * conflicting as f64 - self.total_wait_time() + moving as f64
    }

    /// Advances every light's timers.
    fn update_lights(&mut self) {
        for (light, _) in &mut self.lights {
            light.step(DT);
        }
    }

    /// Updates the kinematics of every vehicle on every segment, lead vehicles first.
    fn update_vehicles(&mut self) {
        for (segment_id, segment) in self.segments.iter().enumerate() {
            let red = self
                .lights
                .iter()
                .any(|(light, id)| *id == segment_id && light.is_red());

            let mut lead: Option<LeadVehicle> = None;
            for vehicle_id in segment.vehicles() {
                let vehicle = &mut self.vehicles[vehicle_id];
                let stop_for_light = red && segment.length() - vehicle.pos() <= vehicle.min_gap();
                let blocked = lead.map_or(false, |lead| vehicle.is_blocked_by(&lead));
                vehicle.set_stopped(stop_for_light || blocked);
                vehicle.update(lead, DT);
                lead = Some(LeadVehicle {
                    pos: vehicle.pos(),
                    length: vehicle.length(),
                });
            }
        }
    }

    /// Moves lead vehicles which have reached the end of their segment
    /// onto the next segment of their route.
    fn advance_vehicles(&mut self) {
        for segment_id in 0..self.segments.len() {
            let Some(vehicle_id) = self.segments[segment_id].lead() else {
                continue;
            };
            let vehicle = &mut self.vehicles[vehicle_id];
            if vehicle.pos() < self.segments[segment_id].length() {
                continue;
            }
            self.segments[segment_id].pop_lead();

            match vehicle.next_route_index() {
                Some(route_idx) => {
                    let next = vehicle.route()[route_idx];
                    match self.segments.get_mut(next) {
                        Some(segment) => {
                            vehicle.enter(route_idx, next);
                            segment.push_vehicle(vehicle_id);
                        }
                        None => {
                            log::warn!("vehicle {:?} routed onto missing segment {}", vehicle_id, next);
                            vehicle.leave(route_idx);
                        }
                    }
                }
                None => {
                    log::debug!("vehicle {:?} reached the end of its route", vehicle_id);
                    let route_idx = vehicle.route_index();
                    vehicle.leave(route_idx);
                }
            }
        }
    }

    /// Gives every generator the chance to spawn a vehicle.
    fn spawn_vehicles(&mut self) {
        for idx in 0..self.generators.len() {
            let spawned =
                self.generators[idx].poll(self.t, &self.segments, &self.vehicles, &mut self.rng);
            if let Some(attributes) = spawned {
                self.insert_vehicle(&attributes);
            }
        }
    }

    /// The simulation time in s.
    pub fn t(&self) -> f64 {
        self.t
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Whether the simulation is still running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The simulated time at which the simulation stops, in s.
    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    /// The segments in the network.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Gets a reference to the segment with the given ID.
    pub fn get_segment(&self, segment_id: SegmentId) -> Option<&Segment> {
        self.segments.get(segment_id)
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// The number of vehicles that have entered the simulation.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// The world coordinates of a vehicle, if it is on a segment.
    pub fn vehicle_position(&self, vehicle_id: VehicleId) -> Option<Point2d> {
        let vehicle = self.vehicles.get(vehicle_id)?;
        let segment = &self.segments[vehicle.segment()?];
        Some(segment.position_at(vehicle.pos()))
    }

    /// Returns an iterator over the traffic lights and the segments they control,
    /// in registration order.
    pub fn iter_lights(&self) -> impl Iterator<Item = (&TrafficLight, SegmentId)> {
        self.lights.iter().map(|(light, segment)| (light, *segment))
    }

    /// Gets the traffic light with the given registration index.
    pub fn get_light(&self, idx: usize) -> Option<&TrafficLight> {
        self.lights.get(idx).map(|(light, _)| light)
    }

    /// The signal controller, if learning is enabled.
    pub fn agent(&self) -> Option<&QLearningAgent> {
        self.agent.as_ref()
    }

    /// The signal controller, if learning is enabled.
    pub fn agent_mut(&mut self) -> Option<&mut QLearningAgent> {
        self.agent.as_mut()
    }

    /// The sum of every vehicle's wait time, in s.
    pub fn total_wait_time(&self) -> f64 {
        self.vehicles.values().map(|v| v.wait_time()).sum()
    }

    /// The mean wait time over every vehicle that has entered the simulation.
    pub fn average_wait_time(&self) -> Option<f64> {
        (!self.vehicles.is_empty()).then(|| self.total_wait_time() / self.vehicles.len() as f64)
    }

    /// Captures the current state for display or export.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot::capture(self)
    }
}
