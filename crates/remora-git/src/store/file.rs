//! JSON-file backed remote configuration.

use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use remora_core::{RemoraError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ConfigStore;
use crate::remote::RemoteConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RemotesDocument {
    #[serde(default)]
    remotes: IndexMap<String, RemoteConfig>,
}

/// Keeps every named remote in one JSON document.
///
/// Writes go to a sibling temp file that is then renamed over the document,
/// so a failed write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    document: RemotesDocument,
}

impl FileConfigStore {
    /// Opens the document at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                RemoraError::storage_with_cause(format!("failed to parse {}", path.display()), e)
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => RemotesDocument::default(),
            Err(e) => {
                return Err(RemoraError::storage_with_cause(
                    format!("failed to read {}", path.display()),
                    e,
                ));
            },
        };

        debug!(
            "Opened remote config {} ({} remotes)",
            path.display(),
            document.remotes.len()
        );
        Ok(Self { path, document })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, document: &RemotesDocument) -> Result<()> {
        let text = serde_json::to_string_pretty(document)
            .map_err(|e| RemoraError::storage_with_cause("failed to serialize remotes", e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RemoraError::storage_with_cause(format!("failed to create {}", parent.display()), e)
            })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text).map_err(|e| {
            RemoraError::storage_with_cause(format!("failed to write {}", tmp.display()), e)
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            RemoraError::storage_with_cause(format!("failed to replace {}", self.path.display()), e)
        })
    }
}

impl ConfigStore for FileConfigStore {
    fn remote_names(&self) -> Result<Vec<String>> {
        Ok(self.document.remotes.keys().cloned().collect())
    }

    fn load(&self, name: &str) -> Result<Option<RemoteConfig>> {
        Ok(self.document.remotes.get(name).cloned())
    }

    fn persist(&mut self, config: &RemoteConfig) -> Result<()> {
        let mut next = self.document.clone();
        next.remotes.insert(config.name.clone(), config.clone());
        self.write(&next)?;
        self.document = next;
        Ok(())
    }

    fn rename_config(&mut self, old_name: &str, new_name: &str) -> Result<Vec<String>> {
        if self.document.remotes.contains_key(new_name) {
            return Err(RemoraError::storage(format!(
                "remote '{}' already exists",
                new_name
            )));
        }

        let mut next = self.document.clone();
        let config = next
            .remotes
            .shift_remove(old_name)
            .ok_or_else(|| RemoraError::storage(format!("remote '{}' does not exist", old_name)))?;

        let (renamed, unmigrated) = config.renamed(new_name);
        next.remotes.insert(new_name.to_string(), renamed);
        self.write(&next)?;
        self.document = next;
        Ok(unmigrated)
    }
}
