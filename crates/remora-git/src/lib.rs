//! # Remora Git
//!
//! Remote management and fetch orchestration for Git repositories.
//!
//! This crate sits above a transport and storage engine: it keeps the catalog
//! of named remotes and their refspecs, answers authentication challenges,
//! streams progress to caller-supplied observers and updates local tracking
//! refs after a fetch. The engine is reached through the [`Transport`],
//! [`Connector`], [`ConfigStore`] and [`RefStore`] traits.
//!
//! ## Features
//!
//! - Named and anonymous remotes with validated urls, names and refspecs
//! - Static or per-challenge credential resolution, checked against the
//!   kinds each challenge allows
//! - Fetch sessions that always disconnect, whatever the outcome
//! - Lazy listing of advertised refs
//! - Background fetching with failure backoff
//! - In-memory and JSON-file backends
//!
//! ## Example
//!
//! ```
//! use remora_git::{
//!     FetchOptions, MemoryBackend, MemoryConnector, MemoryRemote, ObjectId, Repository,
//! };
//!
//! let main = ObjectId::from_hex(b"1111111111111111111111111111111111111111").unwrap();
//! let connector = MemoryConnector::new().with_remote(
//!     "https://example.com/repo.git",
//!     MemoryRemote::new().with_head("refs/heads/main", main),
//! );
//! let backend = MemoryBackend::new();
//! let repo = Repository::in_memory(backend.clone(), connector);
//!
//! let origin = repo.create("origin", "https://example.com/repo.git")?;
//! let outcome = origin.fetch(FetchOptions::default())?;
//!
//! assert_eq!(outcome.updates.len(), 1);
//! assert_eq!(backend.ref_target("refs/remotes/origin/main"), Some(main));
//! # Ok::<(), remora_core::RemoraError>(())
//! ```

pub mod credentials;
pub mod head;
pub mod options;
pub mod progress;
pub mod refspec;
pub mod remote;
pub mod session;
pub mod store;
pub mod sync;
pub mod transport;
pub mod validate;

// Re-exports
pub use credentials::{CredentialNegotiator, CredentialSource, ResolverFn};
pub use head::RemoteHead;
pub use options::{FetchOptions, FetchOptionsBuilder};
pub use progress::{CallbackResult, ProgressReporter, TipUpdate};
pub use refspec::{Refspec, RefspecSet};
pub use remote::{Remote, RemoteConfig, Remotes, Repository};
pub use session::{FetchOutcome, RemoteHeads, SessionState, TransferSession};
pub use store::{ConfigStore, FileConfigStore, MemoryBackend, RefStore, url_is_syntactically_valid};
pub use sync::{FetchScheduler, FetchState, OptionsFactory, SchedulerConfig, SchedulerHandle};
pub use transport::{Connector, MemoryConnector, MemoryRemote, TransferHooks, Transport};
pub use validate::validate_remote_name;

pub use gix::ObjectId;

// Re-export remora_core for consumers
pub use remora_core;
