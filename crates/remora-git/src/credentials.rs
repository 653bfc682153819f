//! Credential negotiation for authentication challenges.

use std::fmt;

use remora_core::{BoxError, Credential, CredentialError, CredentialRequest, Result};
use tracing::{debug, warn};

/// Resolver invoked once per challenge with the url, the username embedded
/// in it and the kinds the challenge accepts.
pub type ResolverFn =
    Box<dyn FnMut(&CredentialRequest) -> std::result::Result<Credential, BoxError> + Send>;

/// How a fetch answers authentication challenges, chosen up front.
pub enum CredentialSource {
    /// Answer every challenge with the same credential.
    Static(Credential),
    /// Ask a resolver for a credential per challenge.
    Dynamic(ResolverFn),
}

impl CredentialSource {
    /// Wraps a closure as a dynamic resolver.
    pub fn dynamic<F>(resolver: F) -> Self
    where
        F: FnMut(&CredentialRequest) -> std::result::Result<Credential, BoxError> + Send + 'static,
    {
        Self::Dynamic(Box::new(resolver))
    }
}

impl From<Credential> for CredentialSource {
    fn from(credential: Credential) -> Self {
        Self::Static(credential)
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(credential) => f.debug_tuple("Static").field(credential).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(<resolver>)"),
        }
    }
}

/// Answers the authentication challenges of one transfer session.
///
/// Every answer is checked against the challenge's allowed kinds; a mismatch
/// fails the challenge instead of trying another kind. Only the most recent
/// failure is remembered.
#[derive(Debug, Default)]
pub struct CredentialNegotiator {
    source: Option<CredentialSource>,
    last_failure: Option<String>,
}

impl CredentialNegotiator {
    /// Creates a negotiator. With no source every challenge fails.
    pub fn new(source: Option<CredentialSource>) -> Self {
        Self {
            source,
            last_failure: None,
        }
    }

    /// Resolves and validates a credential for one challenge.
    pub fn negotiate(&mut self, request: &CredentialRequest) -> Result<Credential> {
        debug!(
            "Credential challenge for {} (allowed: {})",
            request.url(),
            request.allowed()
        );

        match self.resolve(request) {
            Ok(credential) => {
                self.last_failure = None;
                Ok(credential)
            },
            Err(e) => {
                warn!("Credential challenge for {} failed: {}", request.url(), e);
                self.last_failure = Some(e.to_string());
                Err(e.into())
            },
        }
    }

    fn resolve(
        &mut self,
        request: &CredentialRequest,
    ) -> std::result::Result<Credential, CredentialError> {
        let credential = match &mut self.source {
            None => return Err(CredentialError::missing(request.url())),
            Some(CredentialSource::Static(credential)) => credential.clone(),
            Some(CredentialSource::Dynamic(resolver)) => {
                resolver(request).map_err(|e| CredentialError::resolver(request.url(), e))?
            },
        };

        if !credential.is_allowed(request.allowed()) {
            return Err(CredentialError::kind_mismatch(
                credential.kind(),
                request.allowed(),
            ));
        }

        Ok(credential)
    }

    /// Returns the most recent failure, if the last challenge failed.
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// Returns true if a credential strategy is configured.
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }
}
