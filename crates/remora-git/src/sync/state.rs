//! Fetch bookkeeping for one scheduled remote.

use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Tracks how background fetches of a remote have been going.
#[derive(Debug)]
pub struct FetchState {
    /// When the last successful fetch finished.
    last_fetch: RwLock<Option<Instant>>,
    /// The last error message, if the most recent fetch failed.
    last_error: RwLock<Option<String>>,
    /// Number of consecutive failures.
    failure_count: RwLock<u32>,
    /// Refs updated by the last successful fetch.
    refs_updated: RwLock<usize>,
    /// Successful fetches so far.
    fetch_count: RwLock<u64>,
}

impl FetchState {
    /// Creates a state with no fetch recorded.
    pub fn new() -> Self {
        Self {
            last_fetch: RwLock::new(None),
            last_error: RwLock::new(None),
            failure_count: RwLock::new(0),
            refs_updated: RwLock::new(0),
            fetch_count: RwLock::new(0),
        }
    }

    /// When the last successful fetch finished.
    pub fn last_fetch(&self) -> Option<Instant> {
        *self.last_fetch.read()
    }

    /// Time elapsed since the last successful fetch.
    pub fn time_since_fetch(&self) -> Option<Duration> {
        self.last_fetch.read().map(|t| t.elapsed())
    }

    /// Records a successful fetch that updated `refs_updated` refs.
    pub fn record_success(&self, refs_updated: usize) {
        let mut last_fetch = self.last_fetch.write();
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();
        let mut updated = self.refs_updated.write();
        let mut fetch_count = self.fetch_count.write();

        *last_fetch = Some(Instant::now());
        *last_error = None;
        *failure_count = 0;
        *updated = refs_updated;
        *fetch_count += 1;
    }

    /// Records a failed fetch.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();

        *last_error = Some(error.into());
        *failure_count += 1;
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Number of consecutive failures.
    pub fn failure_count(&self) -> u32 {
        *self.failure_count.read()
    }

    pub fn refs_updated(&self) -> usize {
        *self.refs_updated.read()
    }

    pub fn fetch_count(&self) -> u64 {
        *self.fetch_count.read()
    }

    /// Returns true once a fetch succeeded and none has failed since.
    pub fn is_healthy(&self) -> bool {
        self.last_fetch.read().is_some() && self.last_error.read().is_none()
    }

    /// Returns true if no fetch succeeded within `interval`.
    pub fn needs_fetch(&self, interval: Duration) -> bool {
        match self.time_since_fetch() {
            Some(elapsed) => elapsed >= interval,
            None => true,
        }
    }

    /// Forgets everything recorded so far.
    pub fn reset(&self) {
        *self.last_fetch.write() = None;
        *self.last_error.write() = None;
        *self.failure_count.write() = 0;
        *self.refs_updated.write() = 0;
        *self.fetch_count.write() = 0;
    }
}

impl Default for FetchState {
    fn default() -> Self {
        Self::new()
    }
}
