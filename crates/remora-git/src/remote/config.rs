//! Persisted form of a named remote.

use remora_core::{AutotagPolicy, Direction};
use serde::{Deserialize, Serialize};

use crate::refspec::Refspec;

/// A named remote as configuration stores keep it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Unique name within the repository.
    pub name: String,

    /// Fetch url.
    pub url: String,

    /// Push url; pushes use `url` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,

    /// Fetch refspecs, in order.
    #[serde(default)]
    pub fetch: Vec<String>,

    /// Push refspecs, in order.
    #[serde(default)]
    pub push: Vec<String>,

    /// Tag-following policy.
    #[serde(default)]
    pub autotag: AutotagPolicy,
}

impl RemoteConfig {
    /// Creates a config with the default fetch refspec for `name`.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            fetch: vec![Self::default_fetch_refspec(&name)],
            name,
            url: url.into(),
            push_url: None,
            push: Vec::new(),
            autotag: AutotagPolicy::default(),
        }
    }

    /// The refspec `git remote add` installs: `+refs/heads/*:refs/remotes/<name>/*`.
    pub fn default_fetch_refspec(name: &str) -> String {
        format!("+refs/heads/*:refs/remotes/{}/*", name)
    }

    /// Returns this config under `new_name`, with fetch refspecs migrated.
    ///
    /// The second element lists the fetch refspecs that could not be
    /// rewritten mechanically; they are kept unchanged.
    pub fn renamed(&self, new_name: &str) -> (RemoteConfig, Vec<String>) {
        let mut fetch = Vec::with_capacity(self.fetch.len());
        let mut unmigrated = Vec::new();

        for raw in &self.fetch {
            let migrated = Refspec::parse(raw, Direction::Fetch)
                .ok()
                .and_then(|spec| spec.renamed(&self.name, new_name));

            match migrated {
                Some(spec) => fetch.push(spec.as_str().to_string()),
                None => {
                    fetch.push(raw.clone());
                    unmigrated.push(raw.clone());
                },
            }
        }

        let config = RemoteConfig {
            name: new_name.to_string(),
            fetch,
            ..self.clone()
        };
        (config, unmigrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_installs_default_refspec() {
        let config = RemoteConfig::new("origin", "https://host/repo.git");
        assert_eq!(config.fetch, vec!["+refs/heads/*:refs/remotes/origin/*"]);
        assert!(config.push.is_empty());
        assert_eq!(config.autotag, AutotagPolicy::Auto);
    }

    #[test]
    fn test_renamed_migrates_default() {
        let config = RemoteConfig::new("origin", "https://host/repo.git");
        let (renamed, unmigrated) = config.renamed("upstream");

        assert_eq!(renamed.name, "upstream");
        assert_eq!(renamed.url, config.url);
        assert_eq!(renamed.fetch, vec!["+refs/heads/*:refs/remotes/upstream/*"]);
        assert!(unmigrated.is_empty());
    }

    #[test]
    fn test_renamed_reports_custom_refspecs() {
        let mut config = RemoteConfig::new("origin", "https://host/repo.git");
        config.fetch.push("refs/heads/*:refs/mirror/*".to_string());

        let (renamed, unmigrated) = config.renamed("upstream");
        assert_eq!(unmigrated, vec!["refs/heads/*:refs/mirror/*"]);
        assert_eq!(renamed.fetch[1], "refs/heads/*:refs/mirror/*");
    }

    #[test]
    fn test_serde_camel_case() {
        let mut config = RemoteConfig::new("origin", "https://host/repo.git");
        config.push_url = Some("ssh://git@host/repo.git".to_string());

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["pushUrl"], "ssh://git@host/repo.git");
        assert_eq!(json["autotag"], "auto");

        let minimal: RemoteConfig =
            serde_json::from_str(r#"{"name":"o","url":"https://h/r.git"}"#).unwrap();
        assert!(minimal.fetch.is_empty());
        assert_eq!(minimal.push_url, None);
    }
}
