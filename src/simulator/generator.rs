//! Periodic driver for [`tick`](super::tick).
//!
//! Ticks never overlap: the loop awaits each tick to completion before it
//! waits for the next interval, and a tick that overruns just delays the
//! following one instead of queuing a burst of catch-up ticks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::{roster, tick, SimulationState};
use crate::store::ReadingStore;

// ---

pub struct Generator {
    // ---
    store: Arc<dyn ReadingStore>,
    period: Duration,
    state: SimulationState,
    rng: StdRng,
}

/// Running generator; dropping it leaves the task running detached.
pub struct GeneratorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<SimulationState>,
}

impl Generator {
    // ---
    pub fn new(
        store: Arc<dyn ReadingStore>,
        period: Duration,
        state: SimulationState,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            period,
            state,
            rng,
        }
    }

    /// Start ticking on the current runtime. The first tick runs immediately.
    pub fn spawn(self) -> GeneratorHandle {
        // ---
        let (shutdown, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        GeneratorHandle { shutdown, task }
    }

    async fn run(mut self, mut stop: watch::Receiver<bool>) -> SimulationState {
        // ---
        info!(
            period_secs = self.period.as_secs_f64(),
            sensors = roster().len(),
            "Generator started"
        );

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                // Also fires if the handle was dropped without stopping.
                _ = stop.changed() => break,
            }

            let now = Local::now().fixed_offset();
            match tick(&*self.store, &mut self.state, &mut self.rng, now).await {
                Ok(report) => info!(
                    readings = report.readings,
                    timestamp = %report.timestamp,
                    "Data inserted"
                ),
                Err(e) => error!(error = %e, "Tick failed, retrying on next interval"),
            }
        }

        info!("Generator stopped");
        self.state
    }
}

impl GeneratorHandle {
    // ---
    /// Ask the loop to exit and wait for it. A tick in progress completes
    /// first. Returns the final simulation state.
    pub async fn stop(self) -> Result<SimulationState, JoinError> {
        // ---
        // Err only if the task already exited, which `await` reports below.
        let _ = self.shutdown.send(true);
        self.task.await
    }
}
