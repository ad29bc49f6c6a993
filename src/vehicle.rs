use crate::error::{non_negative, positive, ConfigError};
use crate::segment::SegmentId;
use crate::VehicleId;
use serde::Deserialize;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    pub(crate) id: VehicleId,
    /// The vehicle's length in m.
    length: f64,
    /// The minimum bumper to bumper gap in m.
    min_gap: f64,
    /// The desired time headway in s.
    time_headway: f64,
    /// The maximum velocity in m/s.
    max_vel: f64,
    /// The maximum acceleration in m/s^2.
    max_acc: f64,
    /// The comfortable deceleration in m/s^2.
    comf_dec: f64,
    /// The segments the vehicle will travel along, in order.
    route: Vec<SegmentId>,
    /// The index into `route` of the segment the vehicle is on, or was last on.
    route_idx: usize,
    /// The segment the vehicle currently occupies, if any.
    segment: Option<SegmentId>,
    /// The longitudinal position along the current segment, in m.
    pos: f64,
    /// The velocity in m/s.
    vel: f64,
    /// The acceleration in m/s^2.
    acc: f64,
    /// Whether the vehicle is held stationary this frame.
    stopped: bool,
    /// The total time the vehicle has spent stopped, in s.
    wait_time: f64,
}

/// The attributes of a simulated vehicle.
///
/// Keys use the short names of the configuration format,
/// so `{"l": 5, "path": [0, 8, 6]}` is a valid vehicle.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VehicleAttributes {
    /// The vehicle length in m.
    #[serde(rename = "l")]
    pub length: f64,
    /// The minimum gap to the vehicle ahead in m.
    #[serde(rename = "s0")]
    pub min_gap: f64,
    /// The desired time headway in s.
    #[serde(rename = "T")]
    pub time_headway: f64,
    /// The maximum velocity in m/s.
    #[serde(rename = "v_max")]
    pub max_vel: f64,
    /// The maximum acceleration in m/s^2.
    #[serde(rename = "a_max")]
    pub max_acc: f64,
    /// The comfortable deceleration in m/s^2.
    #[serde(rename = "b_max")]
    pub comf_dec: f64,
    /// The segments the vehicle travels along.
    #[serde(rename = "path")]
    pub route: Vec<SegmentId>,
    /// The initial velocity in m/s.
    #[serde(rename = "v")]
    pub vel: f64,
    /// The initial acceleration in m/s^2.
    #[serde(rename = "a")]
    pub acc: f64,
}

/// What a vehicle needs to know about the vehicle ahead of it.
#[derive(Clone, Copy, Debug)]
pub struct LeadVehicle {
    /// The lead vehicle's position along the segment, in m.
    pub pos: f64,
    /// The lead vehicle's length, in m.
    pub length: f64,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            length: 4.0,
            min_gap: 4.0,
            time_headway: 1.0,
            max_vel: 16.6,
            max_acc: 1.44,
            comf_dec: 4.61,
            route: vec![],
            vel: 0.0,
            acc: 0.0,
        }
    }
}

impl VehicleAttributes {
    /// Parses vehicle attributes from JSON, rejecting unknown keys.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let attributes: Self = serde_json::from_str(json)?;
        attributes.validate()?;
        Ok(attributes)
    }

    /// Checks that every parameter is physically meaningful.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("l", self.length)?;
        non_negative("s0", self.min_gap)?;
        non_negative("T", self.time_headway)?;
        positive("v_max", self.max_vel)?;
        positive("a_max", self.max_acc)?;
        positive("b_max", self.comf_dec)?;
        non_negative("v", self.vel)?;
        Ok(())
    }
}

impl Vehicle {
    /// Creates a new vehicle, not yet on any segment.
    pub(crate) fn new(id: VehicleId, attributes: &VehicleAttributes) -> Self {
        Self {
            id,
            length: attributes.length,
            min_gap: attributes.min_gap,
            time_headway: attributes.time_headway,
            max_vel: attributes.max_vel,
            max_acc: attributes.max_acc,
            comf_dec: attributes.comf_dec,
            route: attributes.route.clone(),
            route_idx: 0,
            segment: None,
            pos: 0.0,
            vel: attributes.vel,
            acc: attributes.acc,
            stopped: false,
            wait_time: 0.0,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The minimum gap the vehicle keeps to the vehicle ahead, in m.
    pub fn min_gap(&self) -> f64 {
        self.min_gap
    }

    /// The desired time headway in s.
    pub fn time_headway(&self) -> f64 {
        self.time_headway
    }

    /// The maximum velocity in m/s.
    pub fn max_vel(&self) -> f64 {
        self.max_vel
    }

    /// The maximum acceleration in m/s^2.
    pub fn max_acc(&self) -> f64 {
        self.max_acc
    }

    /// The comfortable deceleration in m/s^2.
    pub fn comf_dec(&self) -> f64 {
        self.comf_dec
    }

    /// The vehicle's route.
    pub fn route(&self) -> &[SegmentId] {
        &self.route
    }

    /// The index into the route of the segment the vehicle is on.
    pub fn route_index(&self) -> usize {
        self.route_idx
    }

    /// The segment the vehicle is currently on, if it is still in the network.
    pub fn segment(&self) -> Option<SegmentId> {
        self.segment
    }

    /// The longitudinal position of the front of the vehicle along its segment, in m.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The vehicle's velocity in m/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// The vehicle's acceleration in m/s^2.
    pub fn acc(&self) -> f64 {
        self.acc
    }

    /// Whether the vehicle was held stationary in the last frame.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The total time the vehicle has spent stopped, in s.
    pub fn wait_time(&self) -> f64 {
        self.wait_time
    }

    /// Whether the vehicle is moving forward.
    pub fn is_moving(&self) -> bool {
        self.vel > 0.0
    }

    /// Forces the vehicle to stop (or releases it) for the next update.
    pub(crate) fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    /// Puts the vehicle at the start of the segment at `route_idx` on its route.
    pub(crate) fn enter(&mut self, route_idx: usize, segment: SegmentId) {
        self.route_idx = route_idx;
        self.segment = Some(segment);
        self.pos = 0.0;
    }

    /// Takes the vehicle off the network, leaving it at `route_idx` on its route.
    pub(crate) fn leave(&mut self, route_idx: usize) {
        self.route_idx = route_idx;
        self.segment = None;
        self.pos = 0.0;
    }

    /// The route index the vehicle will move to at the end of its segment, if any.
    pub(crate) fn next_route_index(&self) -> Option<usize> {
        Some(self.route_idx + 1).filter(|idx| *idx < self.route.len())
    }

    /// Whether the vehicle is too close to the vehicle ahead to move off.
    pub(crate) fn is_blocked_by(&self, lead: &LeadVehicle) -> bool {
        self.pos + self.length + self.min_gap >= lead.pos
    }

    /// Advances the vehicle's kinematics by one time step.
    ///
    /// # Parameters
    /// * `lead` - The vehicle ahead on the same segment, if there is one
    /// * `dt` - The time step in seconds
    pub(crate) fn update(&mut self, lead: Option<LeadVehicle>, dt: f64) {
        if self.stopped {
            self.hold(dt);
            return;
        }

        if self.vel + self.acc * dt < 0.0 {
            // Came to rest part way through the step
            self.pos -= 0.5 * self.vel * self.vel / self.acc;
            self.vel = 0.0;
        } else {
            self.vel += self.acc * dt;
            self.pos += self.vel * dt + 0.5 * self.acc * dt * dt;
        }

        if let Some(lead) = lead {
            let gap = lead.pos - self.pos - lead.length;
            if gap < self.min_gap {
                self.stopped = true;
                self.hold(dt);
                return;
            }
        }

        // Free road term only; closing speed to the lead vehicle is not considered.
        self.acc = self.max_acc * (1.0 - (self.vel / self.max_vel).powi(4));
    }

    /// Holds the vehicle stationary for one time step.
    fn hold(&mut self, dt: f64) {
        self.vel = 0.0;
        self.acc = 0.0;
        self.wait_time += dt;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use slotmap::KeyData;

    const DT: f64 = 1.0 / 60.0;

    fn vehicle(attributes: &VehicleAttributes) -> Vehicle {
        Vehicle::new(VehicleId::from(KeyData::from_ffi(1)), attributes)
    }

    #[test]
    fn stopped_vehicle_accumulates_wait() {
        let mut veh = vehicle(&VehicleAttributes {
            vel: 10.0,
            acc: 1.0,
            ..Default::default()
        });
        veh.set_stopped(true);
        veh.update(None, DT);
        assert_eq!(veh.vel(), 0.0);
        assert_eq!(veh.acc(), 0.0);
        assert_eq!(veh.pos(), 0.0);
        assert_approx_eq!(veh.wait_time(), DT);
        veh.update(None, DT);
        assert_approx_eq!(veh.wait_time(), 2.0 * DT);
    }

    #[test]
    fn free_road_acceleration_approaches_max_vel() {
        let attributes = VehicleAttributes {
            acc: 1.44,
            ..Default::default()
        };
        let mut veh = vehicle(&attributes);
        let mut vel = veh.vel();
        for _ in 0..6000 {
            veh.update(None, DT);
            assert!(veh.vel() >= vel);
            assert!(veh.vel() <= attributes.max_vel);
            vel = veh.vel();
        }
        assert!(vel > 0.95 * attributes.max_vel);
        assert!(veh.acc() < 0.2 * attributes.max_acc);
    }

    #[test]
    fn integrates_constant_acceleration() {
        let mut veh = vehicle(&VehicleAttributes {
            vel: 2.0,
            acc: 1.0,
            ..Default::default()
        });
        veh.update(None, 0.5);
        assert_approx_eq!(veh.vel(), 2.5);
        assert_approx_eq!(veh.pos(), 2.5 * 0.5 + 0.5 * 0.25);
    }

    #[test]
    fn comes_to_rest_within_step() {
        let mut veh = vehicle(&VehicleAttributes {
            vel: 1.0,
            acc: -4.0,
            ..Default::default()
        });
        veh.update(None, 0.5);
        assert_eq!(veh.vel(), 0.0);
        assert_approx_eq!(veh.pos(), 0.125);
    }

    #[test]
    fn gap_floor_stops_vehicle() {
        let mut veh = vehicle(&VehicleAttributes {
            vel: 5.0,
            acc: 1.0,
            ..Default::default()
        });
        let lead = LeadVehicle {
            pos: 7.0,
            length: 4.0,
        };
        veh.update(Some(lead), DT);
        assert!(veh.is_stopped());
        assert_approx_eq!(veh.wait_time(), DT);
        assert_eq!(veh.vel(), 0.0);
        assert_eq!(veh.acc(), 0.0);
        assert!(veh.pos() > 0.0);
    }

    #[test]
    fn parses_short_keys() {
        let attributes =
            VehicleAttributes::from_json(r#"{"l": 5, "path": [0, 8, 6], "v": 16.6}"#).unwrap();
        assert_eq!(attributes.length, 5.0);
        assert_eq!(attributes.route, vec![0, 8, 6]);
        assert_eq!(attributes.vel, 16.6);
        assert_eq!(attributes.min_gap, 4.0);
    }

    #[test]
    fn rejects_unknown_keys() {
        let result = VehicleAttributes::from_json(r#"{"colour": "red"}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_invalid_values() {
        let result = VehicleAttributes::from_json(r#"{"v_max": 0}"#);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "v_max", .. })
        ));
    }
}
