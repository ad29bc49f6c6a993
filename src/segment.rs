use crate::math::{ParametricCurve2d, Point2d, Vector2d};
use crate::VehicleId;
pub use curve::SegmentCurve;
use std::collections::VecDeque;

mod curve;

/// The index of a [Segment] in the network.
pub type SegmentId = usize;

/// A segment is a single directed lane of road.
#[derive(Clone, Debug)]
pub struct Segment {
    /// The geometry of the segment.
    curve: SegmentCurve,
    /// The vehicles on the segment, lead vehicle first.
    vehicles: VecDeque<VehicleId>,
}

impl Segment {
    /// Creates a new, empty segment following the given curve.
    pub(crate) fn new(curve: &impl ParametricCurve2d) -> Self {
        Self {
            curve: SegmentCurve::new(curve),
            vehicles: VecDeque::new(),
        }
    }

    /// Gets the length of the segment in m.
    pub fn length(&self) -> f64 {
        self.curve.length()
    }

    /// Gets the world position of a point `dist` metres along the segment.
    pub fn position_at(&self, dist: f64) -> Point2d {
        self.curve.position_at(dist)
    }

    /// Gets the direction of travel `dist` metres along the segment.
    pub fn direction_at(&self, dist: f64) -> Vector2d {
        self.curve.tangent_at(dist)
    }

    /// Gets the curve representing the segment's centre line.
    pub fn curve(&self) -> &SegmentCurve {
        &self.curve
    }

    /// The vehicles on the segment, ordered from the lead vehicle backwards.
    pub fn vehicles(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.vehicles.iter().copied()
    }

    /// The number of vehicles on the segment.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// The vehicle closest to the end of the segment.
    pub fn lead(&self) -> Option<VehicleId> {
        self.vehicles.front().copied()
    }

    /// The vehicle that most recently entered the segment.
    pub fn tail(&self) -> Option<VehicleId> {
        self.vehicles.back().copied()
    }

    /// Adds a vehicle to the back of the segment.
    pub(crate) fn push_vehicle(&mut self, id: VehicleId) {
        debug_assert!(!self.vehicles.contains(&id));
        self.vehicles.push_back(id);
    }

    /// Removes the lead vehicle from the segment.
    pub(crate) fn pop_lead(&mut self) -> Option<VehicleId> {
        self.vehicles.pop_front()
    }
}
