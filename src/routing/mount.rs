//! Mount point handling.
//!
//! The proxy either lives under a fixed prefix (`/stream`) or takes over the
//! whole path space (`/`). Everything after the mount point is the encoded
//! upstream URL.

/// Normalised mount prefix. Empty for the catch-all mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    prefix: String,
}

impl MountPoint {
    /// Normalise a configured mount path: trailing slashes are dropped and
    /// `/` becomes the catch-all mount.
    pub fn new(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        let prefix = if trimmed.is_empty() || trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        Self { prefix }
    }

    pub fn is_catch_all(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Route for the mount point itself (`/stream` or `/`).
    pub fn root_route(&self) -> String {
        if self.is_catch_all() {
            "/".to_string()
        } else {
            self.prefix.clone()
        }
    }

    /// Wildcard route capturing everything below the mount point.
    pub fn wildcard_route(&self) -> String {
        format!("{}/{{*target}}", self.prefix)
    }

    /// Return the part of `path` after the mount point, or `None` when the
    /// path is not below it. Matching happens on whole path segments.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}
