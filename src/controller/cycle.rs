use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{epoch_seconds_now, Snapshot};
use crate::policy::PolicyOracle;
use crate::simulation::{EnvironmentError, ThermalEnvironment};
use crate::store::SnapshotStore;
use crate::weather::WeatherReading;

/// Periodic decide → step → publish loop. The only writer of the store and
/// the only caller of [`ThermalEnvironment::step`] while it runs.
pub struct ControlLoop {
    env: Arc<Mutex<ThermalEnvironment>>,
    policy: Arc<dyn PolicyOracle>,
    store: SnapshotStore,
    period: Duration,
    refresh_weather: bool,
    last_timestamp: f64,
}

impl ControlLoop {
    pub fn new(
        env: Arc<Mutex<ThermalEnvironment>>,
        policy: Arc<dyn PolicyOracle>,
        store: SnapshotStore,
        period: Duration,
        refresh_weather: bool,
    ) -> Self {
        let last_timestamp = store.get().map(|s| s.timestamp).unwrap_or(0.0);
        Self {
            env,
            policy,
            store,
            period,
            refresh_weather,
            last_timestamp,
        }
    }

    /// Run one control cycle and publish its snapshot
    pub async fn run_cycle(&mut self) -> Result<Snapshot, EnvironmentError> {
        let mut env = self.env.lock().await;

        let state = env.state();
        let action_index = self.policy.decide(&state);
        let outcome = env.step(action_index).await?;

        if self.refresh_weather {
            env.refresh_outdoor().await;
        }
        let outdoor = env.outdoor();
        let energy_saved = env.energy_saved_percentage();
        drop(env);

        // Wall clock may step backwards; published timestamps must not
        let timestamp = epoch_seconds_now().max(self.last_timestamp);
        self.last_timestamp = timestamp;

        let snapshot = Snapshot {
            action: outcome.action,
            reward: outcome.reward,
            indoor_temperature: outcome.state.indoor_temperature,
            outdoor_temperature: outdoor.map(|o| o.temperature_c),
            rain: outdoor.map(|o| o.rain).unwrap_or(false),
            humidity: outdoor
                .map(|o| o.humidity)
                .unwrap_or(WeatherReading::FALLBACK.humidity),
            energy_saved_percentage: energy_saved,
            timestamp,
        };
        self.store.set(snapshot.clone());

        info!(
            policy = self.policy.name(),
            action = %outcome.action,
            action_index,
            indoor_temp_c = snapshot.indoor_temperature,
            outdoor_temp_c = snapshot.outdoor_temperature,
            reward = snapshot.reward,
            energy_saved_percent = snapshot.energy_saved_percentage,
            "control cycle"
        );
        if outcome.done {
            debug!("episode length reached, continuing without reset");
        }

        Ok(snapshot)
    }

    /// Cycle on a fixed period until `cancel` fires. The first cycle runs
    /// immediately; cancellation is only observed between cycles.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), EnvironmentError> {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("control loop stopped");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }
            self.run_cycle().await?;
        }
    }
}
