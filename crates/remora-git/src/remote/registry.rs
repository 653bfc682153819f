//! Repository-scoped catalog of named remotes.

use std::fmt;
use std::sync::Arc;

use gix::ObjectId;
use parking_lot::Mutex;
use remora_core::{RemoraError, Result};
use tracing::{debug, info, warn};

use super::{Remote, RemoteConfig};
use crate::store::{ConfigStore, MemoryBackend, RefStore};
use crate::transport::{Connector, MemoryConnector};
use crate::validate::validate_remote_name;

struct RepositoryInner {
    config: Mutex<Box<dyn ConfigStore>>,
    refs: Mutex<Box<dyn RefStore>>,
    connector: Arc<dyn Connector>,
}

/// A local repository as far as remotes are concerned: its remote
/// configuration, its refs, and a way to reach remotes.
///
/// Cheap to clone; clones share the same stores.
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

impl Repository {
    /// Creates a repository over the given collaborators.
    pub fn new(
        config: impl ConfigStore + 'static,
        refs: impl RefStore + 'static,
        connector: impl Connector + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(RepositoryInner {
                config: Mutex::new(Box::new(config)),
                refs: Mutex::new(Box::new(refs)),
                connector: Arc::new(connector),
            }),
        }
    }

    /// Creates a repository whose config and refs both live in `backend`.
    pub fn in_memory(backend: MemoryBackend, connector: MemoryConnector) -> Self {
        Self::new(backend.clone(), backend, connector)
    }

    /// Creates and persists a remote with the default fetch refspec.
    ///
    /// Fails with a validation error if the name or url is malformed or the
    /// name is already taken.
    pub fn create(&self, name: &str, url: &str) -> Result<Remote> {
        validate_remote_name(name)?;
        self.check_url(url)?;

        let config = RemoteConfig::new(name, url);
        {
            let mut store = self.inner.config.lock();
            if store.load(name)?.is_some() {
                return Err(RemoraError::validation("name", name, "remote already exists"));
            }
            store.persist(&config)?;
        }

        info!("Created remote '{}' at {}", name, url);
        Remote::from_config(self.clone(), &config)
    }

    /// Creates an in-memory remote with no name and no refspecs.
    pub fn create_anonymous(&self, url: &str) -> Result<Remote> {
        self.check_url(url)?;
        debug!("Created anonymous remote at {}", url);
        Ok(Remote::anonymous(self.clone(), url))
    }

    /// Loads a remote by name; `Ok(None)` if there is none.
    pub fn lookup(&self, name: &str) -> Result<Option<Remote>> {
        let config = self.inner.config.lock().load(name)?;
        config
            .map(|config| Remote::from_config(self.clone(), &config))
            .transpose()
    }

    /// Names of all persisted remotes, sorted.
    pub fn remote_names(&self) -> Result<Vec<String>> {
        let mut names = self.inner.config.lock().remote_names()?;
        names.sort();
        Ok(names)
    }

    /// Iterates over the persisted remotes, loading each one lazily.
    ///
    /// The set of names is taken when this is called; remotes removed
    /// meanwhile are skipped.
    pub fn remotes(&self) -> Result<Remotes> {
        Ok(Remotes {
            repo: self.clone(),
            names: self.remote_names()?.into_iter(),
        })
    }

    /// Hands every persisted remote to `visitor`, stopping at its first error.
    pub fn for_each_remote<F, E>(&self, mut visitor: F) -> std::result::Result<(), E>
    where
        F: FnMut(Remote) -> std::result::Result<(), E>,
        E: From<RemoraError>,
    {
        for remote in self.remotes()? {
            visitor(remote?)?;
        }
        Ok(())
    }

    pub(crate) fn rename_remote(&self, remote: &mut Remote, new_name: &str) -> Result<Vec<String>> {
        let old_name = remote
            .name()
            .ok_or_else(|| RemoraError::anonymous("rename"))?
            .to_string();
        validate_remote_name(new_name)?;

        let (original, stored_unmigrated) = {
            let mut store = self.inner.config.lock();
            if store.load(new_name)?.is_some() {
                return Err(RemoraError::validation("name", new_name, "remote already exists"));
            }
            let original = store.load(&old_name)?;
            (original, store.rename_config(&old_name, new_name)?)
        };

        let moved = match self.inner.refs.lock().rename_namespace(
            &format!("refs/remotes/{}/", old_name),
            &format!("refs/remotes/{}/", new_name),
        ) {
            Ok(moved) => moved,
            Err(e) => {
                self.restore_config(&old_name, new_name, original.as_ref());
                return Err(e);
            },
        };

        let mut unmigrated = Vec::new();
        let migrated = remote
            .refspecs()
            .fetch()
            .iter()
            .map(|spec| match spec.renamed(&old_name, new_name) {
                Some(renamed) => renamed,
                None => {
                    unmigrated.push(spec.as_str().to_string());
                    spec.clone()
                },
            })
            .collect();
        remote.refspecs_mut().set_fetch(migrated);
        remote.set_name(new_name.to_string());

        // Stored refspecs this handle never loaded still need reporting.
        for raw in stored_unmigrated {
            if !unmigrated.contains(&raw) {
                unmigrated.push(raw);
            }
        }

        info!(
            "Renamed remote '{}' to '{}' ({} tracking refs moved)",
            old_name, new_name, moved
        );
        if !unmigrated.is_empty() {
            warn!(
                "Remote '{}' has refspecs needing manual update: {:?}",
                new_name, unmigrated
            );
        }
        Ok(unmigrated)
    }

    /// Puts the stored config back under `old_name` after a failed rename.
    fn restore_config(&self, old_name: &str, new_name: &str, original: Option<&RemoteConfig>) {
        let mut store = self.inner.config.lock();
        let restored = store
            .rename_config(new_name, old_name)
            .and_then(|_| original.map_or(Ok(()), |config| store.persist(config)));
        if let Err(e) = restored {
            warn!(
                "Could not restore remote '{}' after failed rename to '{}': {}",
                old_name, new_name, e
            );
        }
    }

    pub(crate) fn check_url(&self, url: &str) -> Result<()> {
        if self.inner.config.lock().url_is_valid(url) {
            Ok(())
        } else {
            Err(RemoraError::validation("url", url, "not a valid remote url"))
        }
    }

    pub(crate) fn persist(&self, config: &RemoteConfig) -> Result<()> {
        self.inner.config.lock().persist(config)
    }

    pub(crate) fn find_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        self.inner.refs.lock().find(name)
    }

    pub(crate) fn update_ref(&self, name: &str, oid: ObjectId) -> Result<()> {
        self.inner.refs.lock().update(name, oid)
    }

    pub(crate) fn connector(&self) -> Arc<dyn Connector> {
        Arc::clone(&self.inner.connector)
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").finish_non_exhaustive()
    }
}

/// Lazily loaded remotes of a repository. See [`Repository::remotes`].
#[derive(Debug)]
pub struct Remotes {
    repo: Repository,
    names: std::vec::IntoIter<String>,
}

impl Iterator for Remotes {
    type Item = Result<Remote>;

    fn next(&mut self) -> Option<Self::Item> {
        for name in self.names.by_ref() {
            match self.repo.lookup(&name) {
                Ok(Some(remote)) => return Some(Ok(remote)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
