//! Transfer statistics reported while objects stream in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Object and byte counters for one fetch.
///
/// Counters only grow during a session; the engine reports a fresh snapshot
/// each time one of them changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    /// Objects the remote announced it will send.
    pub total_objects: u32,
    /// Objects indexed into local storage so far.
    pub indexed_objects: u32,
    /// Objects received so far.
    pub received_objects: u32,
    /// Bytes received so far.
    pub received_bytes: u64,
}

impl TransferProgress {
    /// Creates a snapshot with every counter set explicitly.
    pub fn new(
        total_objects: u32,
        indexed_objects: u32,
        received_objects: u32,
        received_bytes: u64,
    ) -> Self {
        Self {
            total_objects,
            indexed_objects,
            received_objects,
            received_bytes,
        }
    }

    /// Returns true once every announced object was received and indexed.
    pub fn is_complete(&self) -> bool {
        self.received_objects == self.total_objects && self.indexed_objects == self.total_objects
    }

    /// Fraction of announced objects received, in `0.0..=1.0`.
    pub fn received_ratio(&self) -> f64 {
        if self.total_objects == 0 {
            return 1.0;
        }
        f64::from(self.received_objects) / f64::from(self.total_objects)
    }
}

impl fmt::Display for TransferProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Received {}/{} objects ({}), indexed {}/{}",
            self.received_objects,
            self.total_objects,
            format_size(self.received_bytes),
            self.indexed_objects,
            self.total_objects,
        )
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
