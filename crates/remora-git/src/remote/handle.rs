//! A single remote: where it lives and which refs it maps.

use std::fmt;

use remora_core::{AutotagPolicy, Direction, RemoraError, Result};
use tracing::info;

use super::{RemoteConfig, Repository};
use crate::options::FetchOptions;
use crate::refspec::RefspecSet;
use crate::session::{FetchOutcome, RemoteHeads, TransferSession};

/// A named or anonymous remote.
///
/// Edits (urls, refspecs, autotag) stay in memory until [`save`](Self::save).
/// Anonymous remotes have no name and can be neither saved nor renamed.
#[derive(Clone)]
pub struct Remote {
    repo: Repository,
    name: Option<String>,
    url: String,
    push_url: Option<String>,
    refspecs: RefspecSet,
    autotag: AutotagPolicy,
}

impl Remote {
    pub(crate) fn anonymous(repo: Repository, url: impl Into<String>) -> Self {
        Self {
            repo,
            name: None,
            url: url.into(),
            push_url: None,
            refspecs: RefspecSet::new(),
            autotag: AutotagPolicy::default(),
        }
    }

    pub(crate) fn from_config(repo: Repository, config: &RemoteConfig) -> Result<Self> {
        Ok(Self {
            repo,
            name: Some(config.name.clone()),
            url: config.url.clone(),
            push_url: config.push_url.clone(),
            refspecs: RefspecSet::from_strings(&config.fetch, &config.push)?,
            autotag: config.autotag,
        })
    }

    /// Copy used by a single fetch: same url and autotag policy, no name, and
    /// a private copy of the fetch refspecs.
    pub(crate) fn working_copy(&self) -> Self {
        let mut refspecs = RefspecSet::new();
        refspecs.set_fetch(self.refspecs.fetch().to_vec());

        Self {
            repo: self.repo.clone(),
            name: None,
            url: self.url.clone(),
            push_url: None,
            refspecs,
            autotag: self.autotag,
        }
    }

    pub(crate) fn repo(&self) -> &Repository {
        &self.repo
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub(crate) fn refspecs_mut(&mut self) -> &mut RefspecSet {
        &mut self.refspecs
    }

    /// Name, or `None` for an anonymous remote.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns true if this remote has no name.
    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    /// Fetch url.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replaces the fetch url after checking its syntax.
    pub fn set_url(&mut self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        self.repo.check_url(&url)?;
        self.url = url;
        Ok(())
    }

    /// Push url as configured, without falling back to the fetch url.
    pub fn push_url(&self) -> Option<&str> {
        self.push_url.as_deref()
    }

    /// Url a push would use.
    pub fn effective_push_url(&self) -> &str {
        self.push_url.as_deref().unwrap_or(&self.url)
    }

    /// Sets or clears the push url.
    pub fn set_push_url(&mut self, url: Option<String>) -> Result<()> {
        if let Some(url) = &url {
            self.repo.check_url(url)?;
        }
        self.push_url = url;
        Ok(())
    }

    /// Refspecs of both directions.
    pub fn refspecs(&self) -> &RefspecSet {
        &self.refspecs
    }

    /// Fetch refspecs as strings, in order.
    pub fn fetch_refspecs(&self) -> Vec<String> {
        self.refspecs.list(Direction::Fetch)
    }

    /// Push refspecs as strings, in order.
    pub fn push_refspecs(&self) -> Vec<String> {
        self.refspecs.list(Direction::Push)
    }

    /// Appends a fetch refspec.
    pub fn add_fetch(&mut self, spec: &str) -> Result<()> {
        self.refspecs.add_fetch(spec)
    }

    /// Appends a push refspec.
    pub fn add_push(&mut self, spec: &str) -> Result<()> {
        self.refspecs.add_push(spec)
    }

    /// Drops every fetch and push refspec.
    pub fn clear_refspecs(&mut self) {
        self.refspecs.clear();
    }

    /// Tag-following policy.
    pub fn autotag(&self) -> AutotagPolicy {
        self.autotag
    }

    /// Sets the tag-following policy.
    pub fn set_autotag(&mut self, autotag: AutotagPolicy) {
        self.autotag = autotag;
    }

    /// The persisted form of this remote.
    pub fn to_config(&self) -> Result<RemoteConfig> {
        let name = self.name.clone().ok_or_else(|| RemoraError::anonymous("save"))?;
        Ok(RemoteConfig {
            name,
            url: self.url.clone(),
            push_url: self.push_url.clone(),
            fetch: self.fetch_refspecs(),
            push: self.push_refspecs(),
            autotag: self.autotag,
        })
    }

    /// Writes name, urls, refspecs and autotag policy to the config store.
    pub fn save(&self) -> Result<()> {
        let config = self.to_config()?;
        self.repo.persist(&config)?;
        info!("Saved remote '{}' ({})", config.name, config.url);
        Ok(())
    }

    /// Renames this remote, moving its tracking refs along.
    ///
    /// Returns the fetch refspecs that were left unchanged and need manual
    /// attention; an empty list means everything was migrated.
    pub fn rename(&mut self, new_name: &str) -> Result<Vec<String>> {
        let repo = self.repo.clone();
        repo.rename_remote(self, new_name)
    }

    /// Lists the remote's advertised refs.
    pub fn ls(&self) -> Result<RemoteHeads> {
        self.ls_with(FetchOptions::default())
    }

    /// Lists the remote's advertised refs, authenticating with `options`.
    pub fn ls_with(&self, options: FetchOptions) -> Result<RemoteHeads> {
        RemoteHeads::open(self, options)
    }

    /// Fetches using this remote's own fetch refspecs.
    pub fn fetch(&self, options: FetchOptions) -> Result<FetchOutcome> {
        TransferSession::new(self, None, options)?.run()
    }

    /// Fetches using `refspecs` instead of the remote's own, for this call only.
    pub fn fetch_with_refspecs(
        &self,
        refspecs: &[&str],
        options: FetchOptions,
    ) -> Result<FetchOutcome> {
        TransferSession::new(self, Some(refspecs), options)?.run()
    }
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("push_url", &self.push_url)
            .field("refspecs", &self.refspecs)
            .field("autotag", &self.autotag)
            .finish()
    }
}
