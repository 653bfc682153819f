//! Per-call fetch options.

use gix::ObjectId;
use remora_core::{BoxError, Credential, CredentialRequest, TransferProgress};

use crate::credentials::{CredentialNegotiator, CredentialSource};
use crate::progress::{CallbackResult, ProgressReporter};

/// Options for one fetch or listing: how to authenticate and whom to tell
/// about progress.
///
/// # Example
///
/// ```
/// use remora_core::Credential;
/// use remora_git::FetchOptions;
///
/// let options = FetchOptions::builder()
///     .credentials(Credential::plaintext("git", "token"))
///     .progress(|text| {
///         eprint!("{text}");
///         Ok(())
///     })
///     .build();
/// # let _ = options;
/// ```
#[derive(Debug, Default)]
pub struct FetchOptions {
    credentials: Option<CredentialSource>,
    reporter: ProgressReporter,
}

impl FetchOptions {
    /// Creates a new builder for FetchOptions.
    pub fn builder() -> FetchOptionsBuilder {
        FetchOptionsBuilder::default()
    }

    /// Returns true if a credential strategy is configured.
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Splits the options into the per-session negotiator and reporter.
    pub(crate) fn into_parts(self) -> (CredentialNegotiator, ProgressReporter) {
        (CredentialNegotiator::new(self.credentials), self.reporter)
    }
}

/// Builder for FetchOptions.
#[derive(Debug, Default)]
pub struct FetchOptionsBuilder {
    credentials: Option<CredentialSource>,
    reporter: ProgressReporter,
}

impl FetchOptionsBuilder {
    /// Answers every challenge with `credential`.
    pub fn credentials(mut self, credential: Credential) -> Self {
        self.credentials = Some(CredentialSource::Static(credential));
        self
    }

    /// Resolves a credential per challenge.
    pub fn credentials_with<F>(mut self, resolver: F) -> Self
    where
        F: FnMut(&CredentialRequest) -> Result<Credential, BoxError> + Send + 'static,
    {
        self.credentials = Some(CredentialSource::dynamic(resolver));
        self
    }

    /// Sets the credential strategy directly.
    pub fn credential_source(mut self, source: CredentialSource) -> Self {
        self.credentials = Some(source);
        self
    }

    /// Observes sideband progress text.
    pub fn progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str) -> CallbackResult + Send + 'static,
    {
        self.reporter = self.reporter.on_progress(f);
        self
    }

    /// Observes transfer statistics.
    pub fn transfer_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(&TransferProgress) -> CallbackResult + Send + 'static,
    {
        self.reporter = self.reporter.on_transfer_progress(f);
        self
    }

    /// Observes each local ref update as `(refname, old, new)`.
    pub fn update_tips<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, Option<ObjectId>, Option<ObjectId>) -> CallbackResult + Send + 'static,
    {
        self.reporter = self.reporter.on_update_tips(f);
        self
    }

    /// Builds the options.
    pub fn build(self) -> FetchOptions {
        FetchOptions {
            credentials: self.credentials,
            reporter: self.reporter,
        }
    }
}
