//! Discovery of host paths mounted into default-image containers.
//!
//! Discovery runs once at startup. Each candidate that exists on the host is
//! bind-mounted read-only at the same path; a symlinked candidate also gets
//! its resolved target mounted so links inside the container keep working.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use berth_common::config::BerthConfig;
use berth_common::types::MountSpec;

/// Shared Java locations mounted alongside the Java home.
const JAVA_SHARED_PATHS: [&str; 2] = ["/usr/share/java", "/usr/share/javazi-1.8"];

/// Finds the read-only bind mounts for default-image launches.
#[derive(Debug, Clone, Default)]
pub struct MountDiscovery {
    candidates: Vec<PathBuf>,
    java: bool,
}

impl MountDiscovery {
    /// Creates a discovery over explicit candidates.
    #[must_use]
    pub const fn new(candidates: Vec<PathBuf>, java: bool) -> Self {
        Self { candidates, java }
    }

    /// Creates a discovery from the operator configuration.
    #[must_use]
    pub fn from_config(config: &BerthConfig) -> Self {
        Self::new(config.default_mounts.clone(), config.java_mounts)
    }

    /// Returns the mounts for paths that currently exist, without duplicates.
    #[must_use]
    pub fn discover(&self) -> Vec<MountSpec> {
        let mut paths = Vec::new();
        if self.java {
            paths.extend(java_paths());
        }
        for candidate in &self.candidates {
            paths.extend(existing_with_target(candidate));
        }

        let mut seen = HashSet::new();
        let mounts: Vec<MountSpec> = paths
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .map(|p| MountSpec::read_only_bind(p.to_string_lossy()))
            .collect();
        tracing::info!(count = mounts.len(), "default mounts discovered");
        mounts
    }
}

/// The path itself when it exists, plus its resolved target when it is a link.
fn existing_with_target(path: &Path) -> Vec<PathBuf> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "mount candidate absent");
        return Vec::new();
    }
    let mut found = vec![path.to_path_buf()];
    let is_link = path
        .symlink_metadata()
        .is_ok_and(|m| m.file_type().is_symlink());
    if is_link {
        if let Ok(target) = path.canonicalize() {
            found.push(target);
        }
    }
    found
}

/// Java home of a resolved `java` binary: two levels above `bin/java`.
fn java_home(binary: &Path) -> Option<PathBuf> {
    binary.ancestors().nth(2).map(Path::to_path_buf)
}

fn java_paths() -> Vec<PathBuf> {
    let Ok(binary) = which::which("java") else {
        tracing::debug!("no java on PATH");
        return Vec::new();
    };
    let Ok(resolved) = binary.canonicalize() else {
        return Vec::new();
    };
    if !resolved.is_file() {
        return Vec::new();
    }
    let mut paths: Vec<PathBuf> = java_home(&resolved).into_iter().collect();
    paths.extend(
        JAVA_SHARED_PATHS
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.exists()),
    );
    paths
}
