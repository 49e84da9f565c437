//! # Thermal Environment
//!
//! Single-room model with an AC unit and a window. One [`step`] applies one
//! catalog action: the AC pulls the indoor temperature halfway towards its
//! setpoint, an open window moves it 10% of the way towards the outdoor
//! temperature, and doing nothing lets it wander by a little noise.
//!
//! Reward favours a 24 °C room, charges for running the AC and penalises
//! opening the window in the rain.
//!
//! [`step`]: ThermalEnvironment::step

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Action, ActionCatalog, State};
use crate::weather::{WeatherProvider, WeatherReading};

/// Temperature the reward is centred on (°C)
pub const COMFORT_TEMP_C: f64 = 24.0;
/// Fraction of the gap to the AC setpoint closed per step
pub const AC_RESPONSE: f64 = 0.5;
/// Fraction of the gap to the outdoor temperature closed per step
pub const WINDOW_EXCHANGE: f64 = 0.1;
/// Half-width of the idle temperature drift (°C)
pub const IDLE_NOISE_C: f64 = 0.1;
pub const ENERGY_PENALTY: f64 = 0.1;
pub const RAIN_PENALTY: f64 = -1.0;
/// Upper bound (exclusive) of the temperature drawn on reset
pub const RESET_MAX_TEMP_C: f64 = 45.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("invalid action index {index} (catalog has {catalog_len} actions)")]
    InvalidAction { index: usize, catalog_len: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Steps after which an episode reports `done`
    pub max_episode_steps: u32,
    /// Random seed for reproducibility (None = random)
    pub random_seed: Option<u64>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            max_episode_steps: 50,
            random_seed: None,
        }
    }
}

/// Energy accounting since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnergyStats {
    /// Steps in which the AC was running
    pub energy_used: u64,
    pub total_steps: u64,
}

impl EnergyStats {
    /// Share of steps in which the AC was off, 0 before the first step
    pub fn saved_percentage(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        100.0 * (self.total_steps - self.energy_used) as f64 / self.total_steps as f64
    }
}

/// Result of applying one action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub action: Action,
    pub state: State,
    pub reward: f64,
    /// Episode length reached; informational only
    pub done: bool,
}

pub struct ThermalEnvironment {
    actions: ActionCatalog,
    weather: Arc<dyn WeatherProvider>,
    location: String,
    config: EnvironmentConfig,
    rng: StdRng,
    state: State,
    episode_steps: u32,
    energy: EnergyStats,
    outdoor: Option<WeatherReading>,
}

impl ThermalEnvironment {
    /// Create an environment and reset it to a random initial state
    pub fn new(
        config: EnvironmentConfig,
        weather: Arc<dyn WeatherProvider>,
        location: impl Into<String>,
    ) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut env = Self {
            actions: ActionCatalog::new(),
            weather,
            location: location.into(),
            config,
            rng,
            state: State::new(0.0, 0, 0),
            episode_steps: 0,
            energy: EnergyStats::default(),
            outdoor: None,
        };
        env.reset();
        env
    }

    /// Draw a fresh indoor temperature in [0, 45) with AC and window off,
    /// and zero all counters.
    pub fn reset(&mut self) -> State {
        let temperature = Uniform::new(0.0, RESET_MAX_TEMP_C).sample(&mut self.rng);
        self.state = State::new(temperature, 0, 0);
        self.episode_steps = 0;
        self.energy = EnergyStats::default();
        self.outdoor = None;
        self.state
    }

    /// Reset counters, then adopt `state` as the starting point
    pub fn reset_to(&mut self, state: State) -> State {
        self.reset();
        self.state = state;
        self.state
    }

    pub async fn step(&mut self, action_index: usize) -> Result<StepOutcome, EnvironmentError> {
        let action = self
            .actions
            .get(action_index)
            .ok_or(EnvironmentError::InvalidAction {
                index: action_index,
                catalog_len: self.actions.len(),
            })?;

        let temp = self.state.indoor_temperature;
        let mut rain_penalty = 0.0;

        let (next_temp, energy_cost) = match action {
            Action::AcOn { target } => {
                self.energy.energy_used += 1;
                (temp - AC_RESPONSE * (temp - f64::from(target)), 1.0)
            }
            Action::WindowOpen => {
                let outdoor = self.weather.fetch(&self.location).await;
                self.outdoor = Some(outdoor);
                if outdoor.rain {
                    rain_penalty = RAIN_PENALTY;
                }
                (temp + WINDOW_EXCHANGE * (outdoor.temperature_c - temp), 0.0)
            }
            Action::Idle => {
                let noise = Uniform::new(-IDLE_NOISE_C, IDLE_NOISE_C).sample(&mut self.rng);
                (temp + noise, 0.0)
            }
        };

        let reward = -(next_temp - COMFORT_TEMP_C).abs() - ENERGY_PENALTY * energy_cost + rain_penalty;

        self.state = State::new(next_temp, action.ac_status(), action.window_status());
        self.episode_steps += 1;
        self.energy.total_steps += 1;
        let done = self.episode_steps >= self.config.max_episode_steps;

        debug!(
            %action,
            previous_temp_c = temp,
            indoor_temp_c = next_temp,
            outdoor_temp_c = self.outdoor.map(|o| o.temperature_c),
            reward,
            energy_used = self.energy.energy_used,
            total_steps = self.energy.total_steps,
            energy_saved_percent = self.energy.saved_percentage(),
            "environment step"
        );

        Ok(StepOutcome {
            action,
            state: self.state,
            reward,
            done,
        })
    }

    /// Fetch and cache the outdoor reading without touching the room state
    pub async fn refresh_outdoor(&mut self) -> WeatherReading {
        let reading = self.weather.fetch(&self.location).await;
        self.outdoor = Some(reading);
        reading
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn actions(&self) -> &ActionCatalog {
        &self.actions
    }

    /// Last outdoor reading, if the weather has been consulted since reset
    pub fn outdoor(&self) -> Option<WeatherReading> {
        self.outdoor
    }

    pub fn energy(&self) -> EnergyStats {
        self.energy
    }

    pub fn energy_saved_percentage(&self) -> f64 {
        self.energy.saved_percentage()
    }

    pub fn episode_steps(&self) -> u32 {
        self.episode_steps
    }
}
