use thiserror::Error;

/// An error in the configuration of the simulation or one of its parts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration could not be parsed, or contained an unknown key.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A numeric parameter is outside of its allowed range.
    #[error("parameter `{name}` has invalid value {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    /// A vehicle generator has no vehicle templates.
    #[error("vehicle generator has no vehicle templates")]
    NoTemplates,
    /// The weights of a vehicle generator's templates sum to zero.
    #[error("vehicle generator template weights sum to zero")]
    ZeroTotalWeight,
    /// A generated vehicle would have nowhere to go.
    #[error("vehicle template has an empty route")]
    EmptyRoute,
    /// A segment index does not refer to a segment in the network.
    #[error("segment {0} does not exist")]
    UnknownSegment(usize),
    /// A segment's geometry has zero length.
    #[error("segment has zero length")]
    DegenerateSegment,
}

/// Checks that `value` is strictly positive.
pub(crate) fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

/// Checks that `value` is zero or positive.
pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

/// Checks that `value` lies within `[0, 1]`.
pub(crate) fn unit_interval(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}
