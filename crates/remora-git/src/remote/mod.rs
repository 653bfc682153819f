//! Remotes and the repository-scoped catalog that owns them.

mod config;
mod handle;
mod registry;

pub use config::RemoteConfig;
pub use handle::Remote;
pub use registry::{Remotes, Repository};
