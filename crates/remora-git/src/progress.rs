//! Observer channels for fetch progress.
//!
//! Three independent, optional channels:
//!
//! - `progress`: sideband text from the remote ("Counting objects: ...").
//! - `transfer_progress`: object/byte counters while the pack streams in.
//! - `update_tips`: one call per local ref updated, after the transfer.
//!
//! The first two may interleave in any order. An observer returning an
//! error aborts the fetch; tip updates already applied stay applied.

use std::fmt;

use gix::ObjectId;
use remora_core::{BoxError, CallbackChannel, RemoraError, Result, TransferProgress};

/// What an observer returns: `Err` aborts the operation.
pub type CallbackResult = std::result::Result<(), BoxError>;

type ProgressFn = Box<dyn FnMut(&str) -> CallbackResult + Send>;
type TransferProgressFn = Box<dyn FnMut(&TransferProgress) -> CallbackResult + Send>;
type UpdateTipsFn =
    Box<dyn FnMut(&str, Option<ObjectId>, Option<ObjectId>) -> CallbackResult + Send>;

/// A local ref moved by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipUpdate {
    /// Local ref that was written.
    pub refname: String,
    /// Previous target; `None` if the ref was created.
    pub old: Option<ObjectId>,
    /// New target; `None` if the ref was deleted.
    pub new: Option<ObjectId>,
}

/// The observers installed for one session.
#[derive(Default)]
pub struct ProgressReporter {
    progress: Option<ProgressFn>,
    transfer_progress: Option<TransferProgressFn>,
    update_tips: Option<UpdateTipsFn>,
}

impl ProgressReporter {
    /// Creates a reporter with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the sideband text observer.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str) -> CallbackResult + Send + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    /// Installs the transfer statistics observer.
    pub fn on_transfer_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(&TransferProgress) -> CallbackResult + Send + 'static,
    {
        self.transfer_progress = Some(Box::new(f));
        self
    }

    /// Installs the per-ref update observer.
    pub fn on_update_tips<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, Option<ObjectId>, Option<ObjectId>) -> CallbackResult + Send + 'static,
    {
        self.update_tips = Some(Box::new(f));
        self
    }

    pub(crate) fn progress(&mut self, text: &str) -> Result<()> {
        match self.progress.as_mut() {
            Some(observer) => {
                observer(text).map_err(|e| RemoraError::callback(CallbackChannel::Progress, e))
            },
            None => Ok(()),
        }
    }

    pub(crate) fn transfer_progress(&mut self, stats: &TransferProgress) -> Result<()> {
        match self.transfer_progress.as_mut() {
            Some(observer) => observer(stats)
                .map_err(|e| RemoraError::callback(CallbackChannel::TransferProgress, e)),
            None => Ok(()),
        }
    }

    pub(crate) fn update_tip(&mut self, update: &TipUpdate) -> Result<()> {
        match self.update_tips.as_mut() {
            Some(observer) => observer(&update.refname, update.old, update.new)
                .map_err(|e| RemoraError::callback(CallbackChannel::UpdateTips, e)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("progress", &self.progress.is_some())
            .field("transfer_progress", &self.transfer_progress.is_some())
            .field("update_tips", &self.update_tips.is_some())
            .finish()
    }
}
