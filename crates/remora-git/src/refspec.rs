//! Refspec parsing and the per-remote refspec lists.

use std::fmt;

use remora_core::{Direction, RemoraError, Result};

/// A parsed refspec: `[+]<source>[:<destination>]`.
///
/// Sources and destinations may carry a single `*` glob. The textual form is
/// kept exactly as it was given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Refspec {
    raw: String,
    source: String,
    destination: Option<String>,
    force: bool,
    direction: Direction,
}

impl Refspec {
    /// Parses and validates a refspec for the given direction.
    ///
    /// Syntax is checked by `gix`'s refspec parser; on top of that the
    /// spec must be non-empty, contain no whitespace, not be negative, and
    /// carry at most one glob on each side (the same number on both).
    pub fn parse(input: &str, direction: Direction) -> Result<Self> {
        let invalid = |message: &str| RemoraError::validation("refspec", input, message);

        if input.is_empty() {
            return Err(invalid("refspec cannot be empty"));
        }
        if input.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("refspec contains whitespace or control characters"));
        }
        if input.starts_with('^') {
            return Err(invalid("negative refspecs are not supported"));
        }

        let operation = match direction {
            Direction::Fetch => gix::refspec::parse::Operation::Fetch,
            Direction::Push => gix::refspec::parse::Operation::Push,
        };
        gix::refspec::parse(input.into(), operation)
            .map_err(|e| RemoraError::validation("refspec", input, e.to_string()))?;

        let (force, body) = match input.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let (source, destination) = match body.split_once(':') {
            Some((src, dst)) => (src, (!dst.is_empty()).then(|| dst.to_string())),
            None => (body, None),
        };

        if source.is_empty() && direction == Direction::Fetch {
            return Err(invalid("fetch refspec needs a source pattern"));
        }

        let source_globs = source.matches('*').count();
        if source_globs > 1 {
            return Err(invalid("source pattern may contain at most one '*'"));
        }
        if let Some(dst) = &destination {
            let destination_globs = dst.matches('*').count();
            if destination_globs != source_globs {
                return Err(invalid("source and destination must both or neither be patterns"));
            }
        }

        Ok(Self {
            raw: input.to_string(),
            source: source.to_string(),
            destination,
            force,
            direction,
        })
    }

    /// Returns the refspec as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Returns true if non-fast-forward updates are permitted.
    pub fn is_force(&self) -> bool {
        self.force
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns true if the source side is a glob pattern.
    pub fn is_pattern(&self) -> bool {
        self.source.contains('*')
    }

    /// Returns true if `name` matches the source pattern.
    pub fn matches_source(&self, name: &str) -> bool {
        match_pattern(&self.source, name).is_some()
    }

    /// Maps a source ref name onto the destination side.
    ///
    /// Returns `None` when the name does not match or the refspec has no
    /// destination.
    pub fn transform(&self, name: &str) -> Option<String> {
        let captured = match_pattern(&self.source, name)?;
        let destination = self.destination.as_ref()?;
        Some(match destination.split_once('*') {
            Some((prefix, suffix)) => format!("{}{}{}", prefix, captured, suffix),
            None => destination.clone(),
        })
    }

    /// Rewrites a destination living under `refs/remotes/<old>/` to the new
    /// remote name. Returns `None` when the refspec cannot be migrated that way.
    pub fn renamed(&self, old_remote: &str, new_remote: &str) -> Option<Refspec> {
        let old_prefix = format!("refs/remotes/{}/", old_remote);
        let rest = self.destination.as_deref()?.strip_prefix(&old_prefix)?;
        let destination = format!("refs/remotes/{}/{}", new_remote, rest);
        let raw = format!(
            "{}{}:{}",
            if self.force { "+" } else { "" },
            self.source,
            destination
        );

        Some(Self {
            raw,
            source: self.source.clone(),
            destination: Some(destination),
            force: self.force,
            direction: self.direction,
        })
    }
}

impl fmt::Display for Refspec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Matches `name` against a pattern with at most one `*`, returning the
/// captured portion (empty for exact matches).
fn match_pattern<'a>(pattern: &str, name: &'a str) -> Option<&'a str> {
    match pattern.split_once('*') {
        None => (pattern == name).then_some(""),
        Some((prefix, suffix)) => {
            if name.len() < prefix.len() + suffix.len() {
                return None;
            }
            name.strip_prefix(prefix)?.strip_suffix(suffix)
        },
    }
}

/// Ordered fetch and push refspecs of one remote.
///
/// Adding validates eagerly; nothing here persists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefspecSet {
    fetch: Vec<Refspec>,
    push: Vec<Refspec>,
}

impl RefspecSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from stored refspec strings.
    pub fn from_strings<S: AsRef<str>>(fetch: &[S], push: &[S]) -> Result<Self> {
        let mut set = Self::new();
        for spec in fetch {
            set.add(Direction::Fetch, spec.as_ref())?;
        }
        for spec in push {
            set.add(Direction::Push, spec.as_ref())?;
        }
        Ok(set)
    }

    /// Validates `spec` and appends it to the list for `direction`.
    pub fn add(&mut self, direction: Direction, spec: &str) -> Result<()> {
        let refspec = Refspec::parse(spec, direction)?;
        match direction {
            Direction::Fetch => self.fetch.push(refspec),
            Direction::Push => self.push.push(refspec),
        }
        Ok(())
    }

    pub fn add_fetch(&mut self, spec: &str) -> Result<()> {
        self.add(Direction::Fetch, spec)
    }

    pub fn add_push(&mut self, spec: &str) -> Result<()> {
        self.add(Direction::Push, spec)
    }

    /// Drops the refspecs of both directions.
    pub fn clear(&mut self) {
        self.fetch.clear();
        self.push.clear();
    }

    /// Returns the refspecs for `direction`.
    pub fn get(&self, direction: Direction) -> &[Refspec] {
        match direction {
            Direction::Fetch => &self.fetch,
            Direction::Push => &self.push,
        }
    }

    /// Returns the refspec strings for `direction`, in insertion order.
    pub fn list(&self, direction: Direction) -> Vec<String> {
        self.get(direction)
            .iter()
            .map(|spec| spec.as_str().to_string())
            .collect()
    }

    pub fn fetch(&self) -> &[Refspec] {
        &self.fetch
    }

    pub fn push(&self) -> &[Refspec] {
        &self.push
    }

    /// Replaces the fetch refspecs wholesale.
    pub fn set_fetch(&mut self, specs: Vec<Refspec>) {
        self.fetch = specs;
    }

    pub fn is_empty(&self) -> bool {
        self.fetch.is_empty() && self.push.is_empty()
    }
}
