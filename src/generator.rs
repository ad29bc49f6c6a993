use crate::error::{positive, ConfigError};
use crate::segment::Segment;
use crate::vehicle::VehicleAttributes;
use crate::VehicleSet;
use rand::Rng;
use serde::Deserialize;

/// A source of new vehicles entering the network.
#[derive(Clone, Debug)]
pub struct VehicleGenerator {
    /// The target arrival rate in vehicles per minute.
    vehicle_rate: f64,
    /// The weighted vehicle templates.
    templates: Vec<(u32, VehicleAttributes)>,
    /// The sum of the template weights.
    total_weight: u32,
    /// The simulation time of the last successful spawn, in s.
    last_spawn: f64,
    /// The next vehicle to be spawned.
    upcoming: VehicleAttributes,
}

/// The attributes of a vehicle generator.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorAttributes {
    /// The target arrival rate in vehicles per minute.
    pub vehicle_rate: f64,
    /// The vehicle templates, each with a relative weight.
    pub vehicles: Vec<(u32, VehicleAttributes)>,
}

impl Default for GeneratorAttributes {
    fn default() -> Self {
        Self {
            vehicle_rate: 20.0,
            vehicles: vec![(1, VehicleAttributes::default())],
        }
    }
}

impl GeneratorAttributes {
    /// Parses generator attributes from JSON, rejecting unknown keys.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let attributes: Self = serde_json::from_str(json)?;
        attributes.validate()?;
        Ok(attributes)
    }

    /// Checks the arrival rate and every template.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("vehicle_rate", self.vehicle_rate)?;
        if self.vehicles.is_empty() {
            return Err(ConfigError::NoTemplates);
        }
        if self.vehicles.iter().all(|(weight, _)| *weight == 0) {
            return Err(ConfigError::ZeroTotalWeight);
        }
        for (_, vehicle) in &self.vehicles {
            vehicle.validate()?;
            if vehicle.route.is_empty() {
                return Err(ConfigError::EmptyRoute);
            }
        }
        Ok(())
    }
}

impl VehicleGenerator {
    /// Creates a new vehicle generator and draws its first vehicle.
    pub fn new(attributes: &GeneratorAttributes, rng: &mut impl Rng) -> Result<Self, ConfigError> {
        attributes.validate()?;
        let templates = attributes.vehicles.clone();
        let total_weight = templates.iter().map(|(weight, _)| *weight).sum();
        let upcoming = choose(&templates, total_weight, rng).clone();
        Ok(Self {
            vehicle_rate: attributes.vehicle_rate,
            templates,
            total_weight,
            last_spawn: 0.0,
            upcoming,
        })
    }

    /// The target arrival rate in vehicles per minute.
    pub fn vehicle_rate(&self) -> f64 {
        self.vehicle_rate
    }

    /// The vehicle that will be spawned next.
    pub fn upcoming(&self) -> &VehicleAttributes {
        &self.upcoming
    }

    /// The vehicle templates.
    pub(crate) fn templates(&self) -> impl Iterator<Item = &VehicleAttributes> {
        self.templates.iter().map(|(_, vehicle)| vehicle)
    }

    /// The minimum time between spawns, in s.
    fn interval(&self) -> f64 {
        60.0 / self.vehicle_rate
    }

    /// Decides whether to spawn the upcoming vehicle at time `now`.
    /// If so, the vehicle is returned and a new upcoming vehicle is drawn.
    /// If the vehicle is due but its first segment has no room,
    /// it is held back until a later frame.
    pub(crate) fn poll(
        &mut self,
        now: f64,
        segments: &[Segment],
        vehicles: &VehicleSet,
        rng: &mut impl Rng,
    ) -> Option<VehicleAttributes> {
        if now - self.last_spawn < self.interval() {
            return None;
        }

        let segment_id = *self.upcoming.route.first()?;
        let Some(segment) = segments.get(segment_id) else {
            log::warn!("generator route starts on missing segment {}", segment_id);
            return None;
        };
        let clearance = self.upcoming.length + self.upcoming.min_gap;
        let has_room = segment
            .tail()
            .map_or(true, |id| vehicles[id].pos() > clearance);
        if !has_room {
            return None;
        }

        self.last_spawn = now;
        let next = choose(&self.templates, self.total_weight, rng).clone();
        Some(std::mem::replace(&mut self.upcoming, next))
    }
}

/// Chooses a template at random, with probability proportional to its weight.
fn choose<'a>(
    templates: &'a [(u32, VehicleAttributes)],
    total_weight: u32,
    rng: &mut impl Rng,
) -> &'a VehicleAttributes {
    let mut r = rng.gen_range(1..=total_weight) as i64;
    for (weight, vehicle) in templates {
        r -= *weight as i64;
        if r <= 0 {
            return vehicle;
        }
    }
    // Unreachable while the weights sum to `total_weight`
    &templates[templates.len() - 1].1
}
