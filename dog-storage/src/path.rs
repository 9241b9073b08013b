use serde::Serialize;

use crate::StorageConfig;

const LEGACY_MEDIA_SEGMENT: &str = "/media/";

/// A store key rooted under exactly one environment segment.
///
/// Only the resolver and the gateway construct these, so the type is
/// serialize-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResolvedPath(String);

impl ResolvedPath {
    /// Wrap a key the store reports having written under a resolved directory
    pub(crate) fn from_store(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ResolvedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ResolvedPath> for String {
    fn from(path: ResolvedPath) -> Self {
        path.0
    }
}

impl PartialEq<str> for ResolvedPath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResolvedPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Maps application-facing paths onto environment-rooted store keys.
///
/// The resolver is idempotent: feeding a resolved path back in yields the
/// same key, so callers may pass either form.
#[derive(Debug, Clone)]
pub struct PathResolver {
    active_root: String,
    known_roots: [String; 2],
}

impl PathResolver {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            active_root: trim_separators(config.active_root()).to_string(),
            known_roots: [
                trim_separators(&config.live_root).to_string(),
                trim_separators(&config.staging_root).to_string(),
            ],
        }
    }

    /// The root segment new paths are placed under
    pub fn active_root(&self) -> &str {
        &self.active_root
    }

    /// Resolve a logical path; `None` is treated as empty
    pub fn resolve_opt(&self, logical: Option<&str>) -> ResolvedPath {
        self.resolve(logical.unwrap_or_default())
    }

    pub fn resolve(&self, logical: &str) -> ResolvedPath {
        // Pad with separators so a `media` segment at either end is caught too.
        let mut path = format!("/{}/", logical);
        while path.contains(LEGACY_MEDIA_SEGMENT) {
            path = path.replace(LEGACY_MEDIA_SEGMENT, "/");
        }

        let relative = self.strip_root(trim_separators(&path));
        ResolvedPath(format!("{}/{}", self.active_root, relative))
    }

    /// Resolve `directory` joined with `file_name`
    pub fn resolve_in(&self, directory: &str, file_name: &str) -> ResolvedPath {
        self.resolve(&join(directory, file_name))
    }

    fn strip_root<'a>(&self, path: &'a str) -> &'a str {
        for root in &self.known_roots {
            if root.is_empty() {
                continue;
            }
            if path == root {
                return "";
            }
            if let Some(rest) = path.strip_prefix(root.as_str()).and_then(|r| r.strip_prefix('/')) {
                return trim_separators(rest);
            }
        }
        path
    }
}

/// Join a directory and a file name with a single separator
pub(crate) fn join(directory: &str, file_name: &str) -> String {
    let directory = directory.trim_end_matches('/');
    let file_name = file_name.trim_start_matches('/');
    if directory.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", directory, file_name)
    }
}

fn trim_separators(path: &str) -> &str {
    path.trim_matches('/')
}
