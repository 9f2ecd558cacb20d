//! Core traits and types for publish orchestration
//!
//! This module defines the capabilities the orchestrator depends on
//! (spawning the package manager, detecting which package manager a
//! directory prefers, asking the operator for a one-time password) and the
//! data shapes that flow between them.

use crate::core::error::PublishError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Packages
// ============================================================================

/// Two-factor policy a package can declare for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TwoFactorPolicy {
    Required,
    NotRequired,
}

impl TwoFactorPolicy {
    pub fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }
}

/// Package to query or publish
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Package-level registry override (`publishConfig.registry`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Package-level access (`publishConfig.access`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_factor: Option<TwoFactorPolicy>,
}

impl PackageDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Terminal result of one publish call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub published: bool,
}

// ============================================================================
// Package managers
// ============================================================================

/// Package manager a directory is set up for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Pnpm,
    Yarn,
}

impl PackageManager {
    /// Executable name
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides which package manager a directory prefers
#[async_trait]
pub trait PackageManagerDetector: Send + Sync {
    /// `None` when nothing in the directory points at a package manager
    async fn preferred(&self, cwd: &Path) -> Option<PackageManager>;
}

// ============================================================================
// Processes
// ============================================================================

/// One external tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables overridden for the child only; the rest is inherited
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a finished process
///
/// The exit code is informational only: package managers exit non-zero on
/// some successful publishes and zero on some failed ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Spawns external tools
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, PublishError>;
}

// ============================================================================
// Operator interaction
// ============================================================================

/// Asks the operator a single-line question
#[async_trait]
pub trait OtpPrompter: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let invocation = Invocation::new("npm", ["publish", "--json"])
            .current_dir("/tmp/pkg")
            .env("npm_config_registry", "https://registry.npmjs.org");

        assert_eq!(invocation.program, "npm");
        assert_eq!(invocation.args, vec!["publish", "--json"]);
        assert_eq!(invocation.cwd, Some(PathBuf::from("/tmp/pkg")));
        assert_eq!(invocation.env.len(), 1);
        assert_eq!(invocation.display(), "npm publish --json");
    }

    #[test]
    fn test_package_manager_names() {
        assert_eq!(PackageManager::Npm.as_str(), "npm");
        assert_eq!(PackageManager::Pnpm.to_string(), "pnpm");
        assert_eq!(PackageManager::Yarn.as_str(), "yarn");
    }

    #[test]
    fn test_two_factor_policy_serialization() {
        let json = serde_json::to_string(&TwoFactorPolicy::NotRequired).unwrap();
        assert_eq!(json, r#""not-required""#);
        assert!(TwoFactorPolicy::Required.is_required());
        assert!(!TwoFactorPolicy::NotRequired.is_required());
    }

    #[test]
    fn test_descriptor_serialization_skips_empty_fields() {
        let descriptor = PackageDescriptor::new("pkg-a");
        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(json, r#"{"name":"pkg-a"}"#);
    }
}
