//! Scripted in-process transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gix::ObjectId;
use parking_lot::RwLock;
use remora_core::{
    AllowedKinds, Credential, CredentialRequest, Direction, RemoraError, Result, TransferProgress,
};
use tracing::debug;

use super::{Connector, TransferHooks, Transport};
use crate::head::RemoteHead;

/// Authentication attempts a server allows before giving up.
const MAX_AUTH_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
struct AuthRequirement {
    allowed: AllowedKinds,
    accepted: Credential,
}

/// What a scripted remote advertises and how it behaves.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    heads: Vec<(String, ObjectId)>,
    sideband: Vec<String>,
    objects: Option<u32>,
    bytes_per_object: u64,
    auth: Option<AuthRequirement>,
    connect_failure: Option<String>,
    transfer_failure: Option<String>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            heads: Vec::new(),
            sideband: Vec::new(),
            objects: None,
            bytes_per_object: 512,
            auth: None,
            connect_failure: None,
            transfer_failure: None,
        }
    }
}

impl MemoryRemote {
    /// Creates a remote advertising nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertises `name` at `oid`. Order is preserved.
    pub fn with_head(mut self, name: impl Into<String>, oid: ObjectId) -> Self {
        self.heads.push((name.into(), oid));
        self
    }

    /// Sends `text` on the sideband before streaming objects.
    pub fn with_sideband(mut self, text: impl Into<String>) -> Self {
        self.sideband.push(text.into());
        self
    }

    /// Number of objects a non-empty transfer sends. Defaults to one per wanted head.
    pub fn with_objects(mut self, count: u32) -> Self {
        self.objects = Some(count);
        self
    }

    /// Size reported per received object.
    pub fn with_bytes_per_object(mut self, bytes: u64) -> Self {
        self.bytes_per_object = bytes;
        self
    }

    /// Challenges every connect, allowing `allowed` and accepting only `accepted`.
    pub fn require_auth(mut self, allowed: AllowedKinds, accepted: Credential) -> Self {
        self.auth = Some(AuthRequirement { allowed, accepted });
        self
    }

    /// Makes every connect fail with `message`.
    pub fn fail_connect(mut self, message: impl Into<String>) -> Self {
        self.connect_failure = Some(message.into());
        self
    }

    /// Makes every transfer fail with `message` halfway through.
    pub fn fail_transfer(mut self, message: impl Into<String>) -> Self {
        self.transfer_failure = Some(message.into());
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

/// Opens [`MemoryRemote`]s registered by url.
///
/// Clones share the registry and the connection counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    remotes: Arc<RwLock<HashMap<String, MemoryRemote>>>,
    counters: Arc<Counters>,
}

impl MemoryConnector {
    /// Creates a connector with no remotes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the remote served at `url`.
    pub fn insert(&self, url: impl Into<String>, remote: MemoryRemote) {
        self.remotes.write().insert(url.into(), remote);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_remote(self, url: impl Into<String>, remote: MemoryRemote) -> Self {
        self.insert(url, remote);
        self
    }

    /// Transports opened so far.
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Successful connects so far.
    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    /// Disconnects of connected transports so far.
    pub fn disconnects(&self) -> usize {
        self.counters.disconnects.load(Ordering::SeqCst)
    }

    /// Transports currently connected.
    pub fn active(&self) -> usize {
        self.connects().saturating_sub(self.disconnects())
    }
}

impl Connector for MemoryConnector {
    fn open(&self, url: &str) -> Result<Box<dyn Transport>> {
        let remote = self
            .remotes
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| RemoraError::transport(url, "remote not reachable"))?;

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransport {
            url: url.to_string(),
            remote,
            counters: Arc::clone(&self.counters),
            connected: false,
        }))
    }
}

struct MemoryTransport {
    url: String,
    remote: MemoryRemote,
    counters: Arc<Counters>,
    connected: bool,
}

impl MemoryTransport {
    fn authenticate(&self, auth: &AuthRequirement, hooks: &mut dyn TransferHooks) -> Result<()> {
        let username = gix::url::parse(self.url.as_str().into())
            .ok()
            .and_then(|url| url.user().map(str::to_string));

        for attempt in 1..=MAX_AUTH_ATTEMPTS {
            let request = CredentialRequest::new(self.url.clone(), username.clone(), auth.allowed);
            let credential = hooks.credentials(&request).map_err(|e| {
                RemoraError::transport(&self.url, format!("authentication aborted: {}", e))
            })?;

            if credential == auth.accepted {
                return Ok(());
            }
            debug!(
                "{} rejected {} credential (attempt {}/{})",
                self.url,
                credential.kind(),
                attempt,
                MAX_AUTH_ATTEMPTS
            );
        }

        Err(RemoraError::transport(
            &self.url,
            format!("authentication failed after {} attempts", MAX_AUTH_ATTEMPTS),
        ))
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(RemoraError::transport(&self.url, "not connected"))
        }
    }
}

impl Transport for MemoryTransport {
    fn url(&self) -> &str {
        &self.url
    }

    fn connect(&mut self, direction: Direction, hooks: &mut dyn TransferHooks) -> Result<()> {
        if let Some(message) = &self.remote.connect_failure {
            return Err(RemoraError::transport(&self.url, message.clone()));
        }
        if let Some(auth) = &self.remote.auth {
            self.authenticate(auth, hooks)?;
        }

        debug!("Connected to {} for {}", self.url, direction);
        self.connected = true;
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn list_refs(&mut self) -> Result<Vec<RemoteHead>> {
        self.ensure_connected()?;
        Ok(self
            .remote
            .heads
            .iter()
            .map(|(name, oid)| RemoteHead::new(name.clone(), *oid))
            .collect())
    }

    fn transfer(
        &mut self,
        wanted: &[RemoteHead],
        hooks: &mut dyn TransferHooks,
    ) -> Result<TransferProgress> {
        self.ensure_connected()?;

        let missing = wanted.iter().filter(|head| !head.is_local()).count() as u32;
        if missing == 0 {
            return Ok(TransferProgress::default());
        }

        let abort =
            |e: RemoraError| RemoraError::transport(&self.url, format!("transfer aborted: {}", e));

        for text in &self.remote.sideband {
            hooks.sideband_progress(text).map_err(abort)?;
        }

        let total = self.remote.objects.unwrap_or(missing);
        let fail_at = self.remote.transfer_failure.as_ref().map(|_| total / 2);
        let mut stats = TransferProgress::new(total, 0, 0, 0);

        for received in 1..=total {
            if fail_at == Some(received) {
                let message = self.remote.transfer_failure.clone().unwrap_or_default();
                return Err(RemoraError::transport(&self.url, message));
            }
            stats.received_objects = received;
            stats.indexed_objects = received - 1;
            stats.received_bytes = u64::from(received) * self.remote.bytes_per_object;
            hooks.transfer_progress(&stats).map_err(abort)?;
        }

        if let Some(message) = &self.remote.transfer_failure {
            return Err(RemoraError::transport(&self.url, message.clone()));
        }

        stats.indexed_objects = total;
        hooks.transfer_progress(&stats).map_err(abort)?;
        Ok(stats)
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
            debug!("Disconnected from {}", self.url);
        }
    }
}
