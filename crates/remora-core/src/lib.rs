//! Remora Core - Error taxonomy and value types
//!
//! This crate provides the types shared by every layer of the Remora remote
//! synchronization client: the error hierarchy, credential values, transfer
//! statistics and the small policy enums. It has no transport dependency.

pub mod credential;
pub mod error;
pub mod progress;
pub mod types;

pub use credential::{AllowedKinds, Credential, CredentialKind, CredentialRequest};
pub use error::{BoxError, CallbackChannel, CredentialError, RemoraError, Result};
pub use progress::TransferProgress;
pub use types::{AutotagPolicy, Direction};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
