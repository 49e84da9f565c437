//! # Environment Simulation Module
//!
//! Simulated room driven by the control loop.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ac_window_controller::simulation::{EnvironmentConfig, ThermalEnvironment};
//! use ac_window_controller::weather::FixedWeather;
//!
//! # async fn demo() {
//! let mut env = ThermalEnvironment::new(
//!     EnvironmentConfig::default(),
//!     Arc::new(FixedWeather::default()),
//!     "Tunis",
//! );
//!
//! // AC on at 25 °C
//! let outcome = env.step(8).await.unwrap();
//! println!("{} -> reward {}", outcome.state.indoor_temperature, outcome.reward);
//! # }
//! ```

pub mod environment;

pub use environment::{
    EnergyStats, EnvironmentConfig, EnvironmentError, StepOutcome, ThermalEnvironment,
};
