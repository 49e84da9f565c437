use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::policy::PolicyKind;
use crate::simulation::EnvironmentConfig;
use crate::weather::WeatherReading;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub controller: ControllerConfig,
    pub broadcast: BroadcastConfig,
    pub environment: EnvironmentConfig,
    pub weather: WeatherConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
}
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            request_timeout_secs: 30,
            cors_origins: vec!["http://localhost:5173".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub cycle_seconds: u64,
}
impl ControllerConfig {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(self.cycle_seconds.max(1))
    }
}
impl Default for ControllerConfig {
    fn default() -> Self {
        Self { cycle_seconds: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub push_interval_ms: u64,
    pub keepalive_seconds: u64,
}
impl BroadcastConfig {
    pub fn push_interval(&self) -> Duration {
        Duration::from_millis(self.push_interval_ms.max(1))
    }
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_seconds.max(1))
    }
}
impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            push_interval_ms: 1000,
            keepalive_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherProviderKind {
    #[serde(rename = "openweathermap")]
    OpenWeatherMap,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub provider: WeatherProviderKind,
    pub base_url: String,
    pub api_key: String,
    pub location: String,
    pub http_timeout_seconds: u64,
    /// Re-read the weather after every cycle so snapshots always carry it
    pub refresh_every_cycle: bool,
    /// Reading served by the `fixed` provider
    pub fixed: WeatherReading,
}
impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider: WeatherProviderKind::OpenWeatherMap,
            base_url: "http://api.openweathermap.org".into(),
            api_key: String::new(),
            location: "Tunis".into(),
            http_timeout_seconds: 10,
            refresh_every_cycle: false,
            fixed: WeatherReading::FALLBACK,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub kind: PolicyKind,
    pub model_path: Option<PathBuf>,
    pub comfort_c: f64,
    pub deadband_c: f64,
}
impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::Thermostat,
            model_path: None,
            comfort_c: 24.0,
            deadband_c: 0.5,
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `ACW__SECTION__KEY` variables
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("ACW__").split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract().context("invalid configuration")?;
        if cfg.policy.kind == PolicyKind::QNetwork && cfg.policy.model_path.is_none() {
            anyhow::bail!("policy.kind = \"q_network\" requires policy.model_path");
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<Config> {
        Config::from_figment(
            Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml)),
        )
    }

    #[test]
    fn test_defaults() {
        let cfg = from_toml("").unwrap();
        assert_eq!(cfg.controller.cycle_period(), Duration::from_secs(60));
        assert_eq!(cfg.broadcast.push_interval(), Duration::from_secs(1));
        assert_eq!(cfg.broadcast.keepalive_interval(), Duration::from_secs(30));
        assert_eq!(cfg.environment.max_episode_steps, 50);
        assert_eq!(cfg.weather.location, "Tunis");
        assert_eq!(cfg.policy.kind, PolicyKind::Thermostat);
        assert_eq!(cfg.server.socket_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_overrides() {
        let cfg = from_toml(
            r#"
            [controller]
            cycle_seconds = 5

            [weather]
            provider = "fixed"
            fixed = { temperature_c = 30.0, rain = true, humidity = 70 }

            [environment]
            random_seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(cfg.controller.cycle_seconds, 5);
        assert_eq!(cfg.weather.provider, WeatherProviderKind::Fixed);
        assert!(cfg.weather.fixed.rain);
        assert_eq!(cfg.environment.random_seed, Some(42));
        assert_eq!(cfg.environment.max_episode_steps, 50);
    }

    #[test]
    fn test_zero_periods_are_clamped() {
        let cfg = from_toml("[broadcast]\npush_interval_ms = 0\nkeepalive_seconds = 0").unwrap();
        assert_eq!(cfg.broadcast.push_interval(), Duration::from_millis(1));
        assert_eq!(cfg.broadcast.keepalive_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_q_network_requires_model_path() {
        assert!(from_toml("[policy]\nkind = \"q_network\"").is_err());
        let cfg = from_toml("[policy]\nkind = \"q_network\"\nmodel_path = \"models/q.json\"").unwrap();
        assert_eq!(cfg.policy.model_path, Some(PathBuf::from("models/q.json")));
    }
}
