//! Storage collaborators: remote configuration and local refs.
//!
//! The engine behind these traits owns the persistence mechanics; this
//! crate only decides what to store and when.

mod file;
mod memory;

pub use file::FileConfigStore;
pub use memory::MemoryBackend;

use gix::ObjectId;
use remora_core::Result;

use crate::remote::RemoteConfig;

/// Persistence for named remotes.
pub trait ConfigStore: Send {
    /// Names of all persisted remotes, in any order.
    fn remote_names(&self) -> Result<Vec<String>>;

    /// Loads a remote; `Ok(None)` when no such remote exists.
    fn load(&self, name: &str) -> Result<Option<RemoteConfig>>;

    /// Writes a remote, replacing any previous entry with the same name.
    fn persist(&mut self, config: &RemoteConfig) -> Result<()>;

    /// Renames a remote and migrates its fetch refspecs.
    ///
    /// Returns the fetch refspecs that could not be migrated mechanically.
    fn rename_config(&mut self, old_name: &str, new_name: &str) -> Result<Vec<String>>;

    /// Syntactic url check applied before a remote is created or changed.
    fn url_is_valid(&self, url: &str) -> bool {
        url_is_syntactically_valid(url)
    }
}

/// Local ref storage.
pub trait RefStore: Send {
    /// Resolves a ref; `Ok(None)` when it does not exist.
    fn find(&self, name: &str) -> Result<Option<ObjectId>>;

    /// Points `name` at `oid`, creating the ref if needed.
    fn update(&mut self, name: &str, oid: ObjectId) -> Result<()>;

    /// Moves every ref under `old_prefix` to `new_prefix`. Returns how many moved.
    fn rename_namespace(&mut self, old_prefix: &str, new_prefix: &str) -> Result<usize>;
}

/// Accepts anything `gix` can parse as a url, scp-like address or path,
/// rejecting empty input and embedded whitespace.
pub fn url_is_syntactically_valid(url: &str) -> bool {
    if url.is_empty() || url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    gix::url::parse(url.into()).is_ok()
}
