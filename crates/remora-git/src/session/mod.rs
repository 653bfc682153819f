//! Transfer sessions: fetch and listing against a remote.
//!
//! Both operations open a [`Connection`] that disconnects when dropped, so
//! every exit path (success, transport error, observer error, panic)
//! releases the transport before the caller sees the result.

mod fetch;
mod ls;
mod state;

pub use fetch::{FetchOutcome, TransferSession};
pub use ls::RemoteHeads;
pub use state::SessionState;

use remora_core::{
    Credential, CredentialRequest, Direction, RemoraError, Result, TransferProgress,
};
use tracing::debug;

use crate::credentials::CredentialNegotiator;
use crate::options::FetchOptions;
use crate::progress::ProgressReporter;
use crate::transport::{Connector, TransferHooks, Transport};

/// An open transport that is disconnected exactly once.
pub(crate) struct Connection {
    transport: Box<dyn Transport>,
    closed: bool,
}

impl Connection {
    pub(crate) fn open(connector: &dyn Connector, url: &str) -> Result<Self> {
        Ok(Self {
            transport: connector.open(url)?,
            closed: false,
        })
    }

    /// Connects for `direction`; the caller's original error wins over
    /// whatever the transport reported.
    pub(crate) fn connect(&mut self, direction: Direction, hooks: &mut SessionHooks) -> Result<()> {
        let result = self.transport.connect(direction, hooks);
        hooks.resolve(result)
    }

    pub(crate) fn transport(&mut self) -> &mut dyn Transport {
        &mut *self.transport
    }

    pub(crate) fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.transport.disconnect();
            debug!("Closed connection to {}", self.transport.url());
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Routes transport callbacks to the caller's negotiator and observers.
///
/// A failing credential resolver or observer is kept aside and the
/// transport gets a stand-in error; once the transport returns, `resolve`
/// hands back the caller's original error, whether the transport failed or
/// carried on regardless.
#[derive(Debug)]
pub(crate) struct SessionHooks {
    url: String,
    negotiator: CredentialNegotiator,
    reporter: ProgressReporter,
    pending: Option<RemoraError>,
}

impl SessionHooks {
    pub(crate) fn new(url: impl Into<String>, options: FetchOptions) -> Self {
        let (negotiator, reporter) = options.into_parts();
        Self {
            url: url.into(),
            negotiator,
            reporter,
            pending: None,
        }
    }

    pub(crate) fn reporter(&mut self) -> &mut ProgressReporter {
        &mut self.reporter
    }

    pub(crate) fn resolve<T>(&mut self, result: Result<T>) -> Result<T> {
        match self.pending.take() {
            Some(held) => Err(held),
            None => result,
        }
    }

    fn hold(&mut self, error: RemoraError) -> RemoraError {
        let stand_in = RemoraError::transport(&self.url, format!("aborted by caller: {}", error));
        if self.pending.is_none() {
            self.pending = Some(error);
        }
        stand_in
    }
}

impl TransferHooks for SessionHooks {
    fn credentials(&mut self, request: &CredentialRequest) -> Result<Credential> {
        self.negotiator.negotiate(request).map_err(|e| self.hold(e))
    }

    fn sideband_progress(&mut self, text: &str) -> Result<()> {
        self.reporter.progress(text).map_err(|e| self.hold(e))
    }

    fn transfer_progress(&mut self, stats: &TransferProgress) -> Result<()> {
        self.reporter.transfer_progress(stats).map_err(|e| self.hold(e))
    }
}
