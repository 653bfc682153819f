//! In-process configuration and ref storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use gix::ObjectId;
use indexmap::IndexMap;
use parking_lot::Mutex;
use remora_core::{RemoraError, Result};

use super::{ConfigStore, RefStore};
use crate::remote::RemoteConfig;

#[derive(Debug, Default)]
struct MemoryState {
    remotes: IndexMap<String, RemoteConfig>,
    refs: BTreeMap<String, ObjectId>,
    persist_failure: Option<String>,
}

/// Configuration and ref storage kept in memory.
///
/// Clones share the same state, so one clone can be handed to a
/// [`Repository`](crate::Repository) while another inspects it.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every ref.
    pub fn refs(&self) -> BTreeMap<String, ObjectId> {
        self.state.lock().refs.clone()
    }

    /// Returns the target of one ref.
    pub fn ref_target(&self, name: &str) -> Option<ObjectId> {
        self.state.lock().refs.get(name).copied()
    }

    /// Sets a ref directly, bypassing any fetch.
    pub fn set_ref(&self, name: impl Into<String>, oid: ObjectId) {
        self.state.lock().refs.insert(name.into(), oid);
    }

    /// Returns the stored config of a remote.
    pub fn remote_config(&self, name: &str) -> Option<RemoteConfig> {
        self.state.lock().remotes.get(name).cloned()
    }

    /// Makes the next `persist` fail with `message`.
    pub fn fail_next_persist(&self, message: impl Into<String>) {
        self.state.lock().persist_failure = Some(message.into());
    }
}

impl ConfigStore for MemoryBackend {
    fn remote_names(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().remotes.keys().cloned().collect())
    }

    fn load(&self, name: &str) -> Result<Option<RemoteConfig>> {
        Ok(self.state.lock().remotes.get(name).cloned())
    }

    fn persist(&mut self, config: &RemoteConfig) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(message) = state.persist_failure.take() {
            return Err(RemoraError::storage(message));
        }
        state.remotes.insert(config.name.clone(), config.clone());
        Ok(())
    }

    fn rename_config(&mut self, old_name: &str, new_name: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        if state.remotes.contains_key(new_name) {
            return Err(RemoraError::storage(format!(
                "remote '{}' already exists",
                new_name
            )));
        }
        let config = state
            .remotes
            .shift_remove(old_name)
            .ok_or_else(|| RemoraError::storage(format!("remote '{}' does not exist", old_name)))?;

        let (renamed, unmigrated) = config.renamed(new_name);
        state.remotes.insert(new_name.to_string(), renamed);
        Ok(unmigrated)
    }
}

impl RefStore for MemoryBackend {
    fn find(&self, name: &str) -> Result<Option<ObjectId>> {
        Ok(self.ref_target(name))
    }

    fn update(&mut self, name: &str, oid: ObjectId) -> Result<()> {
        self.set_ref(name, oid);
        Ok(())
    }

    fn rename_namespace(&mut self, old_prefix: &str, new_prefix: &str) -> Result<usize> {
        let mut state = self.state.lock();
        let moved: Vec<(String, ObjectId)> = state
            .refs
            .iter()
            .filter(|(name, _)| name.starts_with(old_prefix))
            .map(|(name, oid)| (name.clone(), *oid))
            .collect();

        for (name, oid) in &moved {
            state.refs.remove(name);
            let renamed = format!("{}{}", new_prefix, &name[old_prefix.len()..]);
            state.refs.insert(renamed, *oid);
        }
        Ok(moved.len())
    }
}
