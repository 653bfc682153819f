//! Background fetch scheduler.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use remora_core::{RemoraError, Result};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, warn};

use super::FetchState;
use crate::options::FetchOptions;
use crate::remote::Remote;
use crate::session::FetchOutcome;

/// Builds the options for each scheduled fetch. Options hold one-shot
/// observers, so every fetch gets a fresh set.
pub type OptionsFactory = Arc<dyn Fn() -> FetchOptions + Send + Sync>;

/// Configuration for the fetch scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between fetches.
    pub interval: Duration,
    /// Consecutive failures tolerated before backing off.
    pub max_failures: u32,
    /// Backoff multiplier for failures.
    pub backoff_multiplier: f64,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_failures: 3,
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(300),
        }
    }
}

/// Stops a running scheduler when told to or when dropped.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl SchedulerHandle {
    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Periodically fetches one remote in the background.
///
/// Fetches are blocking and run on tokio's blocking pool.
pub struct FetchScheduler {
    remote: Remote,
    state: Arc<FetchState>,
    config: SchedulerConfig,
    options: OptionsFactory,
    current_backoff: Arc<Mutex<Duration>>,
}

impl FetchScheduler {
    /// Creates a scheduler fetching `remote` with default options.
    pub fn new(remote: Remote, state: Arc<FetchState>, config: SchedulerConfig) -> Self {
        Self {
            remote,
            state,
            current_backoff: Arc::new(Mutex::new(config.interval)),
            config,
            options: Arc::new(FetchOptions::default),
        }
    }

    /// Creates a scheduler with default configuration.
    pub fn with_defaults(remote: Remote, state: Arc<FetchState>) -> Self {
        Self::new(remote, state, SchedulerConfig::default())
    }

    /// Uses `factory` to build the options of every fetch.
    pub fn with_options<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> FetchOptions + Send + Sync + 'static,
    {
        self.options = Arc::new(factory);
        self
    }

    /// Interval the scheduler is currently waiting between fetches.
    pub fn current_interval(&self) -> Duration {
        *self.current_backoff.lock()
    }

    /// Starts the background task. The first fetch happens immediately.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = SchedulerHandle { shutdown_tx };

        tokio::spawn(self.run(shutdown_rx));

        handle
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let initial_interval = self.config.interval;
        let mut interval_timer = interval(initial_interval);

        info!(
            "Starting fetch scheduler for {} with interval {:?}",
            self.remote.url(),
            initial_interval
        );

        loop {
            tokio::select! {
                _ = interval_timer.tick() => {
                    self.do_fetch().await;

                    let current = *self.current_backoff.lock();
                    if current != interval_timer.period() {
                        interval_timer = interval(current);
                        interval_timer.reset();
                    }
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("Fetch scheduler for {} shutting down", self.remote.url());
                        break;
                    }
                }
            }
        }
    }

    async fn do_fetch(&self) {
        debug!("Starting scheduled fetch of {}", self.remote.url());

        match self.fetch_once().await {
            Ok(outcome) => {
                self.state.record_success(outcome.updates.len());
                self.reset_backoff();
                debug!("Scheduled fetch updated {} refs", outcome.updates.len());
            },
            Err(e) => {
                self.state.record_failure(e.to_string());
                self.increase_backoff();
                warn!("Scheduled fetch of {} failed: {}", self.remote.url(), e);
            },
        }
    }

    async fn fetch_once(&self) -> Result<FetchOutcome> {
        let remote = self.remote.clone();
        let options = (self.options)();
        let url = remote.url().to_string();

        tokio::task::spawn_blocking(move || remote.fetch(options))
            .await
            .map_err(|e| RemoraError::transport_with_cause(url, "fetch task failed", e))?
    }

    fn reset_backoff(&self) {
        *self.current_backoff.lock() = self.config.interval;
    }

    fn increase_backoff(&self) {
        let mut backoff = self.current_backoff.lock();
        let failure_count = self.state.failure_count();

        if failure_count >= self.config.max_failures {
            let next =
                Duration::from_secs_f64(backoff.as_secs_f64() * self.config.backoff_multiplier);
            *backoff = next.min(self.config.max_backoff);

            debug!(
                "Increased fetch backoff to {:?} after {} failures",
                *backoff, failure_count
            );
        }
    }

    /// Fetches once, now, outside the schedule.
    pub async fn trigger(&self) -> Result<FetchOutcome> {
        info!("Manual fetch of {} triggered", self.remote.url());
        let result = self.fetch_once().await;

        match &result {
            Ok(outcome) => {
                self.state.record_success(outcome.updates.len());
                self.reset_backoff();
            },
            Err(e) => {
                self.state.record_failure(e.to_string());
            },
        }

        result
    }
}

impl fmt::Debug for FetchScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchScheduler")
            .field("remote", &self.remote.name().unwrap_or(self.remote.url()))
            .field("config", &self.config)
            .field("current_backoff", &self.current_interval())
            .finish()
    }
}
