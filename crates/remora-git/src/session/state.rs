use std::fmt;

/// Where a fetch session is in its lifecycle.
///
/// `Idle → Connected → Listing → Transferring → UpdatingTips → Closed`, with
/// `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connected,
    Listing,
    Transferring,
    UpdatingTips,
    Closed,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connected => "connected",
            Self::Listing => "listing",
            Self::Transferring => "transferring",
            Self::UpdatingTips => "updating-tips",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    /// Returns true for `Closed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Returns true if the lifecycle allows moving to `next`.
    pub fn can_advance_to(&self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, Connected)
            | (Connected, Listing)
            | (Listing, Transferring)
            | (Transferring, UpdatingTips)
            | (UpdatingTips, Closed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
