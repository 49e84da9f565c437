use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a [`State`] from an untyped vector
#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    #[error("state vector must have exactly 3 elements, got {0}")]
    WrongLength(usize),
    #[error("indoor temperature must be finite, got {0}")]
    NonFiniteTemperature(f64),
    #[error("{field} must be 0 or 1, got {value}")]
    NotBinary { field: &'static str, value: f64 },
}

/// Observable state of the room: `(indoor_temperature, ac_status, window_status)`.
///
/// The declared operating range for `indoor_temperature` is 0-40 °C but it is
/// not enforced anywhere; the dynamics may drift outside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub indoor_temperature: f64,
    pub ac_status: u8,
    pub window_status: u8,
}

impl State {
    pub fn new(indoor_temperature: f64, ac_status: u8, window_status: u8) -> Self {
        Self {
            indoor_temperature,
            ac_status,
            window_status,
        }
    }

    /// Parse `[temperature, ac_status, window_status]`
    pub fn from_vector(values: &[f64]) -> Result<Self, StateError> {
        let [temperature, ac, window] = values else {
            return Err(StateError::WrongLength(values.len()));
        };
        if !temperature.is_finite() {
            return Err(StateError::NonFiniteTemperature(*temperature));
        }
        Ok(Self::new(
            *temperature,
            binary_flag("ac_status", *ac)?,
            binary_flag("window_status", *window)?,
        ))
    }

    pub fn to_vector(&self) -> [f64; 3] {
        [
            self.indoor_temperature,
            f64::from(self.ac_status),
            f64::from(self.window_status),
        ]
    }
}

fn binary_flag(field: &'static str, value: f64) -> Result<u8, StateError> {
    if value == 0.0 {
        Ok(0)
    } else if value == 1.0 {
        Ok(1)
    } else {
        Err(StateError::NotBinary { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_vector() {
        let state = State::from_vector(&[25.0, 0.0, 1.0]).unwrap();
        assert_eq!(state, State::new(25.0, 0, 1));
        assert_eq!(state.to_vector(), [25.0, 0.0, 1.0]);
    }

    #[rstest]
    #[case(&[25.0, 0.0], StateError::WrongLength(2))]
    #[case(&[25.0, 0.0, 1.0, 0.0], StateError::WrongLength(4))]
    #[case(&[f64::NAN, 0.0, 0.0], StateError::NonFiniteTemperature(f64::NAN))]
    #[case(&[25.0, 2.0, 0.0], StateError::NotBinary { field: "ac_status", value: 2.0 })]
    #[case(&[25.0, 0.0, 0.5], StateError::NotBinary { field: "window_status", value: 0.5 })]
    fn test_from_vector_rejects(#[case] values: &[f64], #[case] expected: StateError) {
        let err = State::from_vector(values).unwrap_err();
        // NaN != NaN, compare on the variant text instead
        assert_eq!(err.to_string(), expected.to_string());
    }
}
