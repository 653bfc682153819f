#![allow(dead_code)]
use std::fmt;

use remora_core::{AllowedKinds, CredentialRequest};

/// A caller-side error, as an observer or resolver would return it.
#[derive(Debug)]
pub struct ObserverError(pub &'static str);

impl fmt::Display for ObserverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for ObserverError {}

/// A challenge for a GitHub-style https url carrying a username.
pub fn https_request(allowed: AllowedKinds) -> CredentialRequest {
    CredentialRequest::new(
        "https://git@github.com/org/repo.git",
        Some("git".to_string()),
        allowed,
    )
}
