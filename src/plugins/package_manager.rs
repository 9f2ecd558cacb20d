//! Package manager preference detection
//!
//! Walks a directory and its ancestors looking for the marks each package
//! manager leaves behind. The nearest directory with any mark decides.
//!
//! # Example
//!
//! ```no_run
//! use registry_publisher::core::PackageManagerDetector;
//! use registry_publisher::plugins::LockfileDetector;
//! use std::path::Path;
//!
//! # async fn example() {
//! let pm = LockfileDetector::new().preferred(Path::new(".")).await;
//! println!("{:?}", pm);
//! # }
//! ```

use crate::core::traits::{PackageManager, PackageManagerDetector};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// Files that identify a package manager, in lookup order
const LOCKFILES: &[(&str, PackageManager)] = &[
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("pnpm-workspace.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    (".yarnrc.yml", PackageManager::Yarn),
    ("package-lock.json", PackageManager::Npm),
    ("npm-shrinkwrap.json", PackageManager::Npm),
];

#[derive(Debug, Deserialize)]
struct PackageJsonManager {
    #[serde(rename = "packageManager")]
    package_manager: Option<String>,
}

/// Detector backed by `packageManager` fields and lockfiles
#[derive(Debug, Default, Clone)]
pub struct LockfileDetector;

impl LockfileDetector {
    pub fn new() -> Self {
        Self
    }

    /// `packageManager` field of `dir/package.json` (e.g. `pnpm@8.6.0`)
    async fn from_manifest(dir: &Path) -> Option<PackageManager> {
        let content = fs::read_to_string(dir.join("package.json")).await.ok()?;
        let manifest: PackageJsonManager = serde_json::from_str(&content).ok()?;
        let declared = manifest.package_manager?;
        let name = declared.split('@').next().unwrap_or_default();

        match name {
            "npm" => Some(PackageManager::Npm),
            "pnpm" => Some(PackageManager::Pnpm),
            "yarn" => Some(PackageManager::Yarn),
            _ => None,
        }
    }

    async fn from_lockfiles(dir: &Path) -> Option<PackageManager> {
        for (file, pm) in LOCKFILES {
            if fs::metadata(dir.join(file)).await.is_ok() {
                return Some(*pm);
            }
        }
        None
    }
}

#[async_trait]
impl PackageManagerDetector for LockfileDetector {
    async fn preferred(&self, cwd: &Path) -> Option<PackageManager> {
        for dir in cwd.ancestors() {
            if let Some(pm) = Self::from_manifest(dir).await {
                log::debug!("{} declares packageManager {}", dir.display(), pm);
                return Some(pm);
            }
            if let Some(pm) = Self::from_lockfiles(dir).await {
                log::debug!("found {} lockfile in {}", pm, dir.display());
                return Some(pm);
            }
        }
        None
    }
}
