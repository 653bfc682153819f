//! Input checks run before any storage or network access.

use remora_core::{RemoraError, Result};

const FORBIDDEN: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

/// Checks that `name` can be used as a remote name.
///
/// The name ends up inside ref names (`refs/remotes/<name>/...`), so it
/// follows the same character rules.
pub fn validate_remote_name(name: &str) -> Result<()> {
    let reject = |message: &str| Err(RemoraError::validation("name", name, message));

    if name.is_empty() {
        return reject("remote name cannot be empty");
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return reject("remote name cannot contain whitespace or control characters");
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN.contains(c)) {
        return reject(&format!("remote name cannot contain '{}'", c));
    }
    if name.contains("..") {
        return reject("remote name cannot contain '..'");
    }
    if name.starts_with(['/', '.']) || name.ends_with(['/', '.']) {
        return reject("remote name cannot start or end with '/' or '.'");
    }
    if name.contains("//") || name.ends_with(".lock") {
        return reject("remote name is not a valid ref component");
    }
    Ok(())
}
