//! Error types for Remora.
//!
//! Every fallible operation in the workspace returns [`RemoraError`]. The
//! variants follow the failure classes a remote synchronization can hit:
//!
//! - `Validation`: malformed url, remote name or refspec. Raised before any
//!   network or storage access, so it never leaves side effects behind.
//! - `Transport`: connect, listing or transfer failure reported by the engine.
//! - `Credential`: a credential of the wrong kind, a failing resolver, or a
//!   challenge that arrived with no credential strategy configured.
//! - `Callback`: a progress, transfer-progress or update-tips observer failed.
//! - `Storage`: persisting or renaming remote configuration failed.
//! - `State`: the operation needs a persisted remote but got an anonymous one.
//!
//! A lookup miss is not an error: lookups return `Ok(None)`.
//!
//! # Example
//!
//! ```
//! use remora_core::{RemoraError, Result};
//!
//! fn check_url(url: &str) -> Result<()> {
//!     if url.is_empty() {
//!         return Err(RemoraError::validation("url", url, "url cannot be empty"));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_url("").unwrap_err();
//! assert!(err.is_validation());
//! ```

use std::fmt;

use thiserror::Error;

use crate::credential::{AllowedKinds, CredentialKind};

/// Boxed error used to carry caller-supplied failures through the crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The observer channel a callback failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackChannel {
    /// Textual sideband progress.
    Progress,
    /// Transfer statistics.
    TransferProgress,
    /// Per-ref tip updates.
    UpdateTips,
}

impl CallbackChannel {
    /// Returns the option key this channel is registered under.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::TransferProgress => "transfer_progress",
            Self::UpdateTips => "update_tips",
        }
    }
}

impl fmt::Display for CallbackChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication failures raised while answering a credential challenge.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The supplied credential's kind is absent from the challenge's allowed set.
    #[error("credential kind '{kind}' is not allowed by this challenge (allowed: {allowed})")]
    KindMismatch {
        /// Kind of the rejected credential
        kind: CredentialKind,
        /// Kinds the challenge accepts
        allowed: AllowedKinds,
    },

    /// The dynamic resolver failed to produce a credential.
    #[error("credential resolver failed for '{url}': {message}")]
    Resolver {
        /// Url being authenticated
        url: String,
        /// Description of the failure
        message: String,
        /// The resolver's own error
        #[source]
        cause: Option<BoxError>,
    },

    /// A challenge arrived but no credential strategy was configured.
    #[error("authentication required for '{url}' but no credentials were supplied")]
    Missing {
        /// Url being authenticated
        url: String,
    },
}

impl CredentialError {
    /// Creates a KindMismatch error.
    pub fn kind_mismatch(kind: CredentialKind, allowed: AllowedKinds) -> Self {
        Self::KindMismatch { kind, allowed }
    }

    /// Creates a Resolver error wrapping the resolver's failure.
    pub fn resolver(url: impl Into<String>, cause: BoxError) -> Self {
        Self::Resolver {
            url: url.into(),
            message: cause.to_string(),
            cause: Some(cause),
        }
    }

    /// Creates a Missing error.
    pub fn missing(url: impl Into<String>) -> Self {
        Self::Missing { url: url.into() }
    }
}

/// Main error type for Remora operations.
#[derive(Debug, Error)]
pub enum RemoraError {
    /// A url, remote name or refspec is malformed, or a name is taken.
    #[error("Invalid {field} '{value}': {message}")]
    Validation {
        /// What was being validated ("url", "name", "refspec")
        field: &'static str,
        /// The rejected input
        value: String,
        /// Why it was rejected
        message: String,
    },

    /// The transport failed to connect, list or transfer.
    #[error("Transport error for '{url}': {message}")]
    Transport {
        /// Url of the remote being contacted
        url: String,
        /// Protocol-level detail
        message: String,
        /// Underlying error
        #[source]
        cause: Option<BoxError>,
    },

    /// Authentication could not be completed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// A caller-supplied observer failed and aborted the operation.
    #[error("{channel} callback failed: {message}")]
    Callback {
        /// Channel that failed
        channel: CallbackChannel,
        /// Display text of the observer's error
        message: String,
        /// The observer's own error, unchanged
        #[source]
        cause: Option<BoxError>,
    },

    /// Persisting or renaming remote configuration failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of what went wrong
        message: String,
        /// Underlying error
        #[source]
        cause: Option<BoxError>,
    },

    /// The operation is not permitted in the remote's current state.
    #[error("Cannot {operation}: {reason}")]
    State {
        /// The attempted operation
        operation: &'static str,
        /// Why it is not permitted
        reason: String,
    },
}

impl RemoraError {
    // ============================================
    // Convenience constructors
    // ============================================

    /// Creates a Validation error.
    pub fn validation(
        field: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field,
            value: value.into(),
            message: message.into(),
        }
    }

    /// Creates a Transport error without a cause.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a Transport error with a cause.
    pub fn transport_with_cause<E>(
        url: impl Into<String>,
        message: impl Into<String>,
        cause: E,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            url: url.into(),
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Creates a Callback error carrying the observer's error unchanged.
    pub fn callback(channel: CallbackChannel, cause: BoxError) -> Self {
        Self::Callback {
            channel,
            message: cause.to_string(),
            cause: Some(cause),
        }
    }

    /// Creates a Storage error without a cause.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a Storage error with a cause.
    pub fn storage_with_cause<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Creates a State error for an operation that needs a named remote.
    pub fn anonymous(operation: &'static str) -> Self {
        Self::State {
            operation,
            reason: "remote is anonymous (in-memory only)".to_string(),
        }
    }

    // ============================================
    // Query methods
    // ============================================

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns true if this is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns true if this is a credential error.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Credential(_))
    }

    /// Returns true if this is a callback error.
    pub fn is_callback(&self) -> bool {
        matches!(self, Self::Callback { .. })
    }

    /// Returns true if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Returns true if this is a state error.
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Returns the caller-supplied error behind a callback or resolver failure.
    pub fn caller_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Callback { cause, .. }
            | Self::Credential(CredentialError::Resolver { cause, .. }) => cause.as_deref(),
            _ => None,
        }
    }
}

/// Type alias for Results with RemoraError.
pub type Result<T> = std::result::Result<T, RemoraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Halt;

    impl fmt::Display for Halt {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("halted by observer")
        }
    }

    impl std::error::Error for Halt {}

    #[test]
    fn test_validation_display() {
        let error = RemoraError::validation("refspec", "", "refspec cannot be empty");
        assert_eq!(error.to_string(), "Invalid refspec '': refspec cannot be empty");
        assert!(error.is_validation());
    }

    #[test]
    fn test_callback_keeps_cause() {
        let error = RemoraError::callback(CallbackChannel::UpdateTips, Box::new(Halt));

        assert!(error.is_callback());
        assert_eq!(error.to_string(), "update_tips callback failed: halted by observer");
        let cause = error.caller_error().expect("cause should be kept");
        assert!(cause.downcast_ref::<Halt>().is_some());
    }

    #[test]
    fn test_kind_mismatch_display() {
        let error: RemoraError = CredentialError::kind_mismatch(
            CredentialKind::Plaintext,
            AllowedKinds::SSH_KEY,
        )
        .into();

        assert!(error.is_credential());
        let msg = error.to_string();
        assert!(msg.contains("plaintext"));
        assert!(msg.contains("ssh_key"));
    }

    #[test]
    fn test_resolver_error_source_chain() {
        use std::error::Error;

        let error: RemoraError =
            CredentialError::resolver("ssh://host/repo", Box::new(Halt)).into();
        assert!(error.source().is_some());
        assert!(error.caller_error().is_some());
    }

    #[test]
    fn test_anonymous_state_error() {
        let error = RemoraError::anonymous("rename");
        assert!(error.is_state());
        assert!(error.to_string().contains("anonymous"));
    }

    #[test]
    fn test_transport_with_cause() {
        use std::error::Error;

        let io_error = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error =
            RemoraError::transport_with_cause("https://host/repo", "connect failed", io_error);

        assert!(error.is_transport());
        assert!(error.source().is_some());
        assert!(error.caller_error().is_none());
    }
}
