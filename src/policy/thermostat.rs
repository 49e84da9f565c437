use crate::domain::{Action, ActionCatalog, State, AC_MAX_TARGET_C, AC_MIN_TARGET_C};
use crate::simulation::environment::{AC_RESPONSE, COMFORT_TEMP_C};

use super::PolicyOracle;

/// Rule-based policy: leave the room alone inside the deadband, otherwise run
/// the AC at the setpoint that lands the next step on the comfort temperature.
#[derive(Debug, Clone)]
pub struct ThermostatPolicy {
    catalog: ActionCatalog,
    comfort_c: f64,
    deadband_c: f64,
}

impl ThermostatPolicy {
    pub fn new(comfort_c: f64, deadband_c: f64) -> Self {
        Self {
            catalog: ActionCatalog::new(),
            comfort_c,
            deadband_c: deadband_c.abs(),
        }
    }

    fn action_for(&self, temp: f64) -> Action {
        if (temp - self.comfort_c).abs() <= self.deadband_c {
            return Action::Idle;
        }
        // next = temp - r * (temp - target)  =>  target = temp + (comfort - temp) / r
        let ideal = temp + (self.comfort_c - temp) / AC_RESPONSE;
        let target = ideal
            .round()
            .clamp(f64::from(AC_MIN_TARGET_C), f64::from(AC_MAX_TARGET_C)) as u8;
        Action::AcOn { target }
    }
}

impl Default for ThermostatPolicy {
    fn default() -> Self {
        Self::new(COMFORT_TEMP_C, 0.5)
    }
}

impl PolicyOracle for ThermostatPolicy {
    fn decide(&self, state: &State) -> usize {
        let temp = if state.indoor_temperature.is_finite() {
            state.indoor_temperature
        } else {
            self.comfort_c
        };
        self.catalog.index_of(self.action_for(temp)).unwrap_or(0)
    }

    fn name(&self) -> &'static str {
        "thermostat"
    }
}
