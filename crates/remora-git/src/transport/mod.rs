//! Transport collaborators.
//!
//! A [`Connector`] opens one [`Transport`] per operation. The transport owns
//! the wire protocol; this crate drives it through connect, list, transfer
//! and disconnect, and answers its callbacks through [`TransferHooks`].

mod memory;

pub use memory::{MemoryConnector, MemoryRemote};

use remora_core::{Credential, CredentialRequest, Direction, Result, TransferProgress};

use crate::head::RemoteHead;

/// Callbacks a transport invokes while connected.
///
/// When a hook returns an error the transport must stop and return an error
/// of its own promptly; the caller decides which of the two surfaces.
pub trait TransferHooks {
    /// Answers one authentication challenge.
    fn credentials(&mut self, request: &CredentialRequest) -> Result<Credential>;

    /// Forwards sideband text sent by the remote.
    fn sideband_progress(&mut self, text: &str) -> Result<()>;

    /// Reports transfer statistics.
    fn transfer_progress(&mut self, stats: &TransferProgress) -> Result<()>;
}

/// One exclusively owned connection to a remote.
pub trait Transport: Send {
    /// Url this transport talks to.
    fn url(&self) -> &str;

    /// Connects in `direction`, answering authentication challenges via `hooks`.
    fn connect(&mut self, direction: Direction, hooks: &mut dyn TransferHooks) -> Result<()>;

    /// Returns true between a successful `connect` and `disconnect`.
    fn is_connected(&self) -> bool;

    /// Returns the full advertised ref set.
    fn list_refs(&mut self) -> Result<Vec<RemoteHead>>;

    /// Downloads the objects needed for `wanted`.
    ///
    /// Heads whose `local_oid` already equals their `oid` need nothing.
    fn transfer(
        &mut self,
        wanted: &[RemoteHead],
        hooks: &mut dyn TransferHooks,
    ) -> Result<TransferProgress>;

    /// Closes the connection. Calling it while disconnected does nothing.
    fn disconnect(&mut self);
}

/// Opens transports by url.
pub trait Connector: Send + Sync {
    /// Opens an unconnected transport for `url`.
    fn open(&self, url: &str) -> Result<Box<dyn Transport>>;
}
