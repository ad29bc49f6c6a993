use crate::error::{non_negative, ConfigError};
use serde::{Deserialize, Serialize};

/// A timed two-phase traffic light.
///
/// The light cycles between red and green on its own timer, and can also be
/// switched on request. Neither kind of transition is allowed until the light
/// has held its current state for the minimum phase duration.
#[derive(Clone, Debug)]
pub struct TrafficLight {
    /// The time spent red before turning green, in s.
    red_duration: f64,
    /// The time spent green before turning red, in s.
    green_duration: f64,
    /// The minimum time between state changes, in s.
    min_phase_duration: f64,
    /// The current state.
    state: LightState,
    /// The time since the cycle timer was last reset, in s.
    timer: f64,
    /// The time since the state last changed, in s.
    phase_timer: f64,
}

/// The state of a traffic light.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    Red,
    Green,
}

/// The attributes of a traffic light.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrafficLightAttributes {
    /// The time spent red before turning green, in s.
    pub red_duration: f64,
    /// The time spent green before turning red, in s.
    pub green_duration: f64,
    /// The state the light starts in.
    pub initial_state: LightState,
    /// The minimum time between state changes, in s.
    pub min_phase_duration: f64,
}

impl Default for TrafficLightAttributes {
    fn default() -> Self {
        Self {
            red_duration: 10.0,
            green_duration: 10.0,
            initial_state: LightState::Red,
            min_phase_duration: 5.0,
        }
    }
}

impl TrafficLightAttributes {
    /// Parses traffic light attributes from JSON, rejecting unknown keys.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let attributes: Self = serde_json::from_str(json)?;
        attributes.validate()?;
        Ok(attributes)
    }

    /// Checks that every duration is non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("red_duration", self.red_duration)?;
        non_negative("green_duration", self.green_duration)?;
        non_negative("min_phase_duration", self.min_phase_duration)
    }
}

impl LightState {
    /// The other state.
    fn toggled(self) -> Self {
        match self {
            LightState::Red => LightState::Green,
            LightState::Green => LightState::Red,
        }
    }
}

impl TrafficLight {
    /// Creates a new traffic light.
    pub fn new(attributes: &TrafficLightAttributes) -> Result<Self, ConfigError> {
        attributes.validate()?;
        Ok(Self {
            red_duration: attributes.red_duration,
            green_duration: attributes.green_duration,
            min_phase_duration: attributes.min_phase_duration,
            state: attributes.initial_state,
            timer: 0.0,
            phase_timer: 0.0,
        })
    }

    /// The current state.
    pub fn state(&self) -> LightState {
        self.state
    }

    pub fn is_red(&self) -> bool {
        self.state == LightState::Red
    }

    pub fn is_green(&self) -> bool {
        self.state == LightState::Green
    }

    /// The time since the state last changed, in s.
    pub fn phase_timer(&self) -> f64 {
        self.phase_timer
    }

    /// Whether the light has held its state long enough to change.
    pub fn can_change(&self) -> bool {
        self.phase_timer >= self.min_phase_duration
    }

    /// Advances the light's timers, changing state if the current one has expired.
    pub fn step(&mut self, dt: f64) {
        self.timer += dt;
        self.phase_timer += dt;

        let duration = match self.state {
            LightState::Red => self.red_duration,
            LightState::Green => self.green_duration,
        };
        if self.timer >= duration && self.can_change() {
            self.switch(self.state.toggled());
        }
    }

    /// Requests that the light turns green (or red).
    /// The request is ignored if the light is already in that state,
    /// or hasn't held its current state for the minimum phase duration.
    /// Returns `true` iff the light changed.
    pub fn set_state(&mut self, green: bool) -> bool {
        let target = if green {
            LightState::Green
        } else {
            LightState::Red
        };
        if self.state == target || !self.can_change() {
            return false;
        }
        self.switch(target);
        true
    }

    fn switch(&mut self, state: LightState) {
        log::debug!("light {:?} -> {:?}", self.state, state);
        self.state = state;
        self.timer = 0.0;
        self.phase_timer = 0.0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    fn light(initial_state: LightState) -> TrafficLight {
        TrafficLight::new(&TrafficLightAttributes {
            red_duration: 10.0,
            green_duration: 10.0,
            initial_state,
            min_phase_duration: 5.0,
        })
        .unwrap()
    }

    #[test]
    fn cycles_on_timer() {
        let mut light = light(LightState::Red);
        for _ in 0..590 {
            light.step(DT);
        }
        assert!(light.is_red());
        for _ in 0..20 {
            light.step(DT);
        }
        assert!(light.is_green());
        assert!(light.phase_timer() < 1.0);
    }

    #[test]
    fn request_before_min_phase_is_ignored() {
        let mut light = light(LightState::Red);
        for _ in 0..200 {
            assert!(!light.set_state(true));
            assert!(light.is_red());
            light.step(DT);
        }
    }

    #[test]
    fn request_after_min_phase_succeeds() {
        let mut light = light(LightState::Red);
        for _ in 0..310 {
            light.step(DT);
        }
        assert!(!light.set_state(false));
        assert!(light.set_state(true));
        assert!(light.is_green());
        assert_eq!(light.phase_timer(), 0.0);
        assert!(!light.set_state(false));
    }

    #[test]
    fn min_phase_delays_timed_change() {
        let mut light = TrafficLight::new(&TrafficLightAttributes {
            red_duration: 1.0,
            green_duration: 1.0,
            initial_state: LightState::Green,
            min_phase_duration: 3.0,
        })
        .unwrap();
        for _ in 0..170 {
            light.step(DT);
        }
        assert!(light.is_green());
        for _ in 0..20 {
            light.step(DT);
        }
        assert!(light.is_red());
    }

    #[test]
    fn parses_state_names() {
        let attributes =
            TrafficLightAttributes::from_json(r#"{"initial_state": "green", "red_duration": 30}"#)
                .unwrap();
        assert_eq!(attributes.initial_state, LightState::Green);
        assert_eq!(attributes.red_duration, 30.0);
        assert!(TrafficLightAttributes::from_json(r#"{"initial_state": "amber"}"#).is_err());
    }
}
