//! Refs advertised by a remote.

use std::fmt;

use gix::ObjectId;

/// One advertised ref. Produced fresh by every listing, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHead {
    name: String,
    oid: ObjectId,
    local_oid: Option<ObjectId>,
}

impl RemoteHead {
    /// Creates a head as the transport advertises it, with no local knowledge.
    pub fn new(name: impl Into<String>, oid: ObjectId) -> Self {
        Self {
            name: name.into(),
            oid,
            local_oid: None,
        }
    }

    /// Returns the head with the oid the local side currently holds for it.
    pub fn with_local_oid(mut self, local_oid: Option<ObjectId>) -> Self {
        self.local_oid = local_oid;
        self
    }

    /// Full symbolic name, e.g. `refs/heads/main`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object id the remote advertises.
    pub fn oid(&self) -> ObjectId {
        self.oid
    }

    /// Object id known locally for this head, if any.
    pub fn local_oid(&self) -> Option<ObjectId> {
        self.local_oid
    }

    /// Returns true if the advertised object is already known locally.
    pub fn is_local(&self) -> bool {
        self.local_oid == Some(self.oid)
    }

    /// Returns true for the `^{}` entries carrying a peeled annotated tag.
    pub fn is_peeled(&self) -> bool {
        self.name.ends_with("^{}")
    }
}

impl fmt::Display for RemoteHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.oid, self.name)
    }
}
