//! Path validation — confine model-supplied paths to a workspace.
//!
//! Paths are resolved to an absolute, symlink-free form before any check, and
//! comparisons are component-wise, so `/etc-backup` is not mistaken for a
//! child of `/etc`.

use std::path::{Component, Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside the workspace root")]
    OutsideRoot { path: String },

    #[error("Path '{path}' matches forbidden pattern '{pattern}'")]
    ForbiddenPath { path: String, pattern: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Failed to resolve path '{path}': {reason}")]
    ResolveFailed { path: String, reason: String },
}

/// Where tools may read and write.
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    root: Option<PathBuf>,
    forbidden: Vec<(String, PathBuf)>,
}

impl PathPolicy {
    /// A policy with no root and nothing forbidden.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Build a policy. Relative paths given to [`check`](Self::check) are
    /// resolved against `root` when one is set.
    pub fn new(root: Option<&str>, forbidden: &[String]) -> Self {
        let root = root.map(|r| resolve_existing_prefix(&PathBuf::from(expand_tilde(r))));
        let forbidden = forbidden
            .iter()
            .map(|pattern| {
                let resolved = resolve_existing_prefix(&PathBuf::from(expand_tilde(pattern)));
                (pattern.clone(), resolved)
            })
            .collect();
        Self { root, forbidden }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Validate `path` and return its resolved absolute form.
    ///
    /// Checks, in order: no `..` components, forbidden prefixes, workspace root.
    pub fn check(&self, path: &str) -> Result<PathBuf, PathValidationError> {
        let raw = Path::new(path);

        if raw.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PathValidationError::PathTraversal { path: path.into() });
        }

        let joined = match (&self.root, raw.is_absolute()) {
            (Some(root), false) => root.join(raw),
            _ => std::path::absolute(raw).map_err(|e| PathValidationError::ResolveFailed {
                path: path.into(),
                reason: e.to_string(),
            })?,
        };
        let resolved = resolve_existing_prefix(&joined);

        for (pattern, forbidden) in &self.forbidden {
            if resolved.starts_with(forbidden) {
                tracing::debug!(path, pattern = %pattern, "Path rejected by forbidden pattern");
                return Err(PathValidationError::ForbiddenPath {
                    path: path.into(),
                    pattern: pattern.clone(),
                });
            }
        }

        if let Some(root) = &self.root
            && !resolved.starts_with(root)
        {
            return Err(PathValidationError::OutsideRoot { path: path.into() });
        }

        Ok(resolved)
    }
}

/// Canonicalize the longest existing ancestor of `path` and re-append the rest.
///
/// Lets a not-yet-created file resolve through a symlinked parent directory.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return tail.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name);
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Expand ~ to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = home_dir()
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

fn home_dir() -> Option<String> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok()
    }
}
