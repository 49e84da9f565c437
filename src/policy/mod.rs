//! Decision functions mapping the room state to a catalog action index.

pub mod q_network;
pub mod thermostat;

pub use q_network::{DenseLayer, QNetworkPolicy};
pub use thermostat::ThermostatPolicy;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::domain::State;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model shape: {0}")]
    Shape(String),
}

/// Deterministic decision function.
///
/// Implementations must always return an index within the action catalog.
#[cfg_attr(test, mockall::automock)]
pub trait PolicyOracle: Send + Sync {
    fn decide(&self, state: &State) -> usize;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PolicyKind {
    Thermostat,
    QNetwork,
}
