use crate::error::{positive, unit_interval, ConfigError};
use rand::Rng;
use serde::Deserialize;

/// A tabular Q-learning agent which picks traffic light phases.
#[derive(Clone, Debug)]
pub struct QLearningAgent {
    /// The number of distinct states.
    state_size: usize,
    /// The number of distinct actions.
    action_size: usize,
    /// The expected return of each action in each state, row-major by state.
    q_table: Vec<f64>,
    learning_rate: f64,
    discount_factor: f64,
    /// The probability of choosing a random action.
    exploration_rate: f64,
    /// The factor applied to the exploration rate on each decay.
    exploration_decay: f64,
    /// The exploration rate never decays below this.
    min_exploration_rate: f64,
}

/// The hyperparameters of a [QLearningAgent].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LearningAttributes {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub exploration_decay: f64,
    pub min_exploration_rate: f64,
}

impl Default for LearningAttributes {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 1.0,
            exploration_decay: 0.995,
            min_exploration_rate: 0.01,
        }
    }
}

impl LearningAttributes {
    /// Checks that every rate lies within `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_interval("learning_rate", self.learning_rate)?;
        unit_interval("discount_factor", self.discount_factor)?;
        unit_interval("exploration_rate", self.exploration_rate)?;
        unit_interval("exploration_decay", self.exploration_decay)?;
        unit_interval("min_exploration_rate", self.min_exploration_rate)
    }
}

impl QLearningAgent {
    /// Creates an agent whose expected returns are all zero.
    pub fn new(
        state_size: usize,
        action_size: usize,
        attributes: &LearningAttributes,
    ) -> Result<Self, ConfigError> {
        positive("state_size", state_size as f64)?;
        positive("action_size", action_size as f64)?;
        attributes.validate()?;
        Ok(Self {
            state_size,
            action_size,
            q_table: vec![0.0; state_size * action_size],
            learning_rate: attributes.learning_rate,
            discount_factor: attributes.discount_factor,
            exploration_rate: attributes.exploration_rate,
            exploration_decay: attributes.exploration_decay,
            min_exploration_rate: attributes.min_exploration_rate,
        })
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    pub fn action_size(&self) -> usize {
        self.action_size
    }

    /// The current probability of choosing a random action.
    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    /// The expected returns of each action in the given state.
    pub fn row(&self, state: usize) -> Option<&[f64]> {
        (state < self.state_size)
            .then(|| &self.q_table[state * self.action_size..(state + 1) * self.action_size])
    }

    /// The expected return of taking `action` in `state`.
    pub fn q_value(&self, state: usize, action: usize) -> Option<f64> {
        self.row(state)?.get(action).copied()
    }

    /// Chooses an action using an epsilon-greedy policy.
    /// States beyond the table are treated as the last state.
    pub fn choose_action(&self, state: usize, rng: &mut impl Rng) -> usize {
        if rng.gen::<f64>() < self.exploration_rate {
            return rng.gen_range(0..self.action_size);
        }
        let state = state.min(self.state_size - 1);
        self.row(state).map(best_action).unwrap_or(0)
    }

    /// Applies the Q-learning update for one observed transition.
    /// Returns `false`, leaving the table untouched, if any index is out of bounds.
    pub fn update(&mut self, state: usize, action: usize, reward: f64, next_state: usize) -> bool {
        if state >= self.state_size || next_state >= self.state_size {
            log::warn!(
                "state out of bounds: {} -> {} (table has {} states)",
                state,
                next_state,
                self.state_size
            );
            return false;
        }
        if action >= self.action_size {
            log::warn!(
                "action {} out of bounds (table has {} actions)",
                action,
                self.action_size
            );
            return false;
        }

        let best_next = self.row(next_state).map(max_value).unwrap_or(0.0);
        let target = reward + self.discount_factor * best_next;
        let q = &mut self.q_table[state * self.action_size + action];
        *q += self.learning_rate * (target - *q);
        true
    }

    /// Reduces the exploration rate, down to its minimum.
    pub fn decay_exploration(&mut self) {
        self.exploration_rate =
            f64::max(self.min_exploration_rate, self.exploration_rate * self.exploration_decay);
    }
}

/// The index of the largest value, preferring the first on ties.
fn best_action(row: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in row.iter().enumerate() {
        if *value > row[best] {
            best = idx;
        }
    }
    best
}

fn max_value(row: &[f64]) -> f64 {
    row.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
