//! Periodic AC/window controller for a single simulated room, with an HTTP
//! API and a websocket live feed of every control cycle.

pub mod api;
pub mod broadcast;
pub mod config;
pub mod controller;
pub mod domain;
pub mod policy;
pub mod simulation;
pub mod store;
pub mod telemetry;
pub mod weather;
