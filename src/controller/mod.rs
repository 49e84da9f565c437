pub mod cycle;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::{Config, WeatherProviderKind};
use crate::domain::{ActionCatalog, State};
use crate::policy::{PolicyKind, PolicyOracle, QNetworkPolicy, ThermostatPolicy};
use crate::simulation::ThermalEnvironment;
use crate::store::SnapshotStore;
use crate::weather::{FixedWeather, OpenWeatherMapClient, WeatherProvider};

pub use cycle::ControlLoop;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub store: SnapshotStore,
    pub supervisor: Arc<ControlSupervisor>,
    pub broadcaster: Arc<Broadcaster>,
    pub policy: Arc<dyn PolicyOracle>,
    pub catalog: Arc<ActionCatalog>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build the weather provider and policy described by `cfg`
    pub async fn new(cfg: Config) -> Result<Self> {
        let weather: Arc<dyn WeatherProvider> = match cfg.weather.provider {
            WeatherProviderKind::OpenWeatherMap => {
                if cfg.weather.api_key.is_empty() {
                    warn!("weather.api_key is empty; window actions will use the fallback reading");
                }
                Arc::new(OpenWeatherMapClient::new(
                    cfg.weather.base_url.clone(),
                    cfg.weather.api_key.clone(),
                    Duration::from_secs(cfg.weather.http_timeout_seconds.max(1)),
                )?)
            }
            WeatherProviderKind::Fixed => Arc::new(FixedWeather(cfg.weather.fixed)),
        };

        let catalog_len = ActionCatalog::new().len();
        let policy: Arc<dyn PolicyOracle> = match cfg.policy.kind {
            PolicyKind::Thermostat => Arc::new(ThermostatPolicy::new(
                cfg.policy.comfort_c,
                cfg.policy.deadband_c,
            )),
            PolicyKind::QNetwork => {
                let path = cfg
                    .policy
                    .model_path
                    .clone()
                    .context("policy.model_path is required for the q_network policy")?;
                let policy = QNetworkPolicy::from_file(&path, catalog_len)
                    .with_context(|| format!("loading policy model {}", path.display()))?;
                Arc::new(policy)
            }
        };

        Ok(Self::from_parts(cfg, weather, policy))
    }

    pub fn from_parts(
        cfg: Config,
        weather: Arc<dyn WeatherProvider>,
        policy: Arc<dyn PolicyOracle>,
    ) -> Self {
        let env = ThermalEnvironment::new(
            cfg.environment.clone(),
            weather,
            cfg.weather.location.clone(),
        );
        let store = SnapshotStore::new();
        let supervisor = Arc::new(ControlSupervisor::new(
            env,
            policy.clone(),
            store.clone(),
            cfg.controller.cycle_period(),
            cfg.weather.refresh_every_cycle,
        ));
        let broadcaster = Arc::new(Broadcaster::new(store.clone(), &cfg.broadcast));

        Self {
            cfg,
            store,
            supervisor,
            broadcaster,
            policy,
            catalog: Arc::new(ActionCatalog::new()),
            started_at: Utc::now(),
        }
    }
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the environment and at most one running [`ControlLoop`].
pub struct ControlSupervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    env: Arc<Mutex<ThermalEnvironment>>,
    policy: Arc<dyn PolicyOracle>,
    store: SnapshotStore,
    period: Duration,
    refresh_weather: bool,
    /// Serializes restarts; only held by detached restart tasks
    running: Mutex<Option<RunningLoop>>,
    alive: Arc<AtomicBool>,
    started: parking_lot::Mutex<Option<Instant>>,
}

impl ControlSupervisor {
    pub fn new(
        env: ThermalEnvironment,
        policy: Arc<dyn PolicyOracle>,
        store: SnapshotStore,
        period: Duration,
        refresh_weather: bool,
    ) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                env: Arc::new(Mutex::new(env)),
                policy,
                store,
                period,
                refresh_weather,
                running: Mutex::new(None),
                alive: Arc::new(AtomicBool::new(false)),
                started: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// Start from a freshly reset environment (process startup)
    pub async fn start_from_reset(&self) -> Result<State> {
        self.restart_with(ThermalEnvironment::reset).await
    }

    /// Stop the running loop, reset the environment to `state` and start again
    pub async fn restart(&self, state: State) -> Result<State> {
        self.restart_with(move |env| env.reset_to(state)).await
    }

    async fn restart_with<F>(&self, init: F) -> Result<State>
    where
        F: FnOnce(&mut ThermalEnvironment) -> State + Send + 'static,
    {
        let inner = self.inner.clone();
        // Detached: a caller dropped mid-restart must not leave the loop stopped
        tokio::spawn(async move { inner.restart(init).await })
            .await
            .context("control loop restart task failed")
    }

    /// Whether the loop task is alive; never waits on a restart in progress
    pub fn is_running(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Time since the current loop was started, if one is running
    pub fn uptime(&self) -> Option<Duration> {
        if !self.is_running() {
            return None;
        }
        self.inner.started.lock().map(|t| t.elapsed())
    }

    pub async fn stop(&self) {
        if let Some(previous) = self.inner.running.lock().await.take() {
            previous.cancel.cancel();
            let _ = previous.handle.await;
        }
    }
}

impl SupervisorInner {
    async fn restart<F>(&self, init: F) -> State
    where
        F: FnOnce(&mut ThermalEnvironment) -> State,
    {
        let mut running = self.running.lock().await;

        if let Some(previous) = running.take() {
            previous.cancel.cancel();
            // Wait out any in-flight cycle so only one loop ever steps
            if let Err(e) = previous.handle.await {
                if e.is_panic() {
                    error!(error = %e, "previous control loop panicked");
                }
                self.alive.store(false, Ordering::Release);
            }
        }

        let initial = {
            let mut env = self.env.lock().await;
            init(&mut *env)
        };

        let cancel = CancellationToken::new();
        let control = ControlLoop::new(
            self.env.clone(),
            self.policy.clone(),
            self.store.clone(),
            self.period,
            self.refresh_weather,
        );
        let token = cancel.clone();
        let alive = self.alive.clone();
        alive.store(true, Ordering::Release);
        let handle = tokio::spawn(async move {
            if let Err(e) = control.run(token).await {
                error!(error = %e, "control loop terminated by internal fault");
            }
            alive.store(false, Ordering::Release);
        });
        *self.started.lock() = Some(Instant::now());

        info!(
            indoor_temp_c = initial.indoor_temperature,
            ac_status = initial.ac_status,
            window_status = initial.window_status,
            period_s = self.period.as_secs(),
            policy = self.policy.name(),
            "control loop started"
        );

        *running = Some(RunningLoop { cancel, handle });
        initial
    }
}
