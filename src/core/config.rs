//! Configuration structures and types for registry-publisher
//!
//! This module provides type-safe configuration management with serde support.

use crate::core::gate::{INFO_REQUEST_LIMIT, PUBLISH_LIMIT, PublishGates};
use crate::core::registry::REGISTRY_ENV_VAR;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default dist-tag
pub const DEFAULT_TAG: &str = "latest";

/// Variables set by CI providers that do not export `CI`
const CI_VENDOR_VARS: &[&str] = &[
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "TF_BUILD",
    "JENKINS_URL",
    "BITBUCKET_BUILD_NUMBER",
    "BUILDKITE",
];

/// Root configuration object
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublisherConfig {
    /// Registry override applied to every package without its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// npm dist-tag (default: "latest")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Package access level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,

    /// Concurrency limits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<ConcurrencyConfig>,
}

impl PublisherConfig {
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(DEFAULT_TAG)
    }

    /// Gates sized from the configured limits
    pub fn gates(&self) -> PublishGates {
        let concurrency = self.concurrency.clone().unwrap_or_default();
        PublishGates::new(
            concurrency.info_requests.unwrap_or(INFO_REQUEST_LIMIT),
            concurrency.publishes.unwrap_or(PUBLISH_LIMIT),
        )
    }
}

/// npm package access level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Public,
    Restricted,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Restricted => "restricted",
        }
    }
}

impl std::str::FromStr for Access {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Access::Public),
            "restricted" => Ok(Access::Restricted),
            other => Err(format!("unknown access level: {}", other)),
        }
    }
}

/// Concurrency limits
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConcurrencyConfig {
    /// Concurrent registry info queries (default: 40)
    #[serde(skip_serializing_if = "Option::is_none", rename = "infoRequests")]
    pub info_requests: Option<usize>,

    /// Concurrent publishes (default: 10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publishes: Option<usize>,
}

/// Ambient environment the orchestrator reads once per run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    /// Value of `npm_config_registry`
    pub registry_override: Option<String>,
    /// Running without an operator; suppresses every OTP prompt
    pub is_ci: bool,
}

impl RuntimeEnv {
    pub fn from_env(env: &HashMap<String, String>) -> Self {
        Self {
            registry_override: env
                .get(REGISTRY_ENV_VAR)
                .filter(|v| !v.trim().is_empty())
                .cloned(),
            is_ci: is_ci(env),
        }
    }

    /// Snapshot of the process environment
    pub fn from_process() -> Self {
        Self::from_env(&std::env::vars().collect())
    }
}

/// Whether `env` describes a continuous-integration context
pub fn is_ci(env: &HashMap<String, String>) -> bool {
    if let Some(ci) = env.get("CI") {
        let ci = ci.trim().to_ascii_lowercase();
        return !(ci.is_empty() || ci == "false" || ci == "0");
    }

    CI_VENDOR_VARS.iter().any(|var| env.contains_key(*var))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = PublisherConfig::default();
        assert_eq!(config.tag(), "latest");

        let gates = config.gates();
        assert_eq!(gates.info.capacity(), 40);
        assert_eq!(gates.publish.capacity(), 10);
        assert_eq!(gates.otp.capacity(), 1);
    }

    #[test]
    fn test_configured_gates() {
        let config = PublisherConfig {
            concurrency: Some(ConcurrencyConfig {
                info_requests: Some(4),
                publishes: None,
            }),
            ..Default::default()
        };

        let gates = config.gates();
        assert_eq!(gates.info.capacity(), 4);
        assert_eq!(gates.publish.capacity(), 10);
    }

    #[test]
    fn test_yaml_round_trip_field_names() {
        let yaml = "registry: https://registry.example.com\ntag: next\naccess: restricted\nconcurrency:\n  infoRequests: 8\n  publishes: 2\n";
        let config: PublisherConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.registry.as_deref(), Some("https://registry.example.com"));
        assert_eq!(config.tag(), "next");
        assert_eq!(config.access, Some(Access::Restricted));
        assert_eq!(config.concurrency.unwrap().info_requests, Some(8));
    }

    #[test]
    fn test_access_from_str() {
        assert_eq!("public".parse::<Access>(), Ok(Access::Public));
        assert_eq!("restricted".parse::<Access>(), Ok(Access::Restricted));
        assert!("private".parse::<Access>().is_err());
    }

    #[test]
    fn test_ci_detection() {
        assert!(is_ci(&env(&[("CI", "true")])));
        assert!(is_ci(&env(&[("CI", "1")])));
        assert!(!is_ci(&env(&[("CI", "false")])));
        assert!(!is_ci(&env(&[("CI", "0")])));
        assert!(is_ci(&env(&[("GITHUB_ACTIONS", "true")])));
        assert!(!is_ci(&env(&[("HOME", "/root")])));
    }

    #[test]
    fn test_explicit_ci_false_wins_over_vendor_vars() {
        assert!(!is_ci(&env(&[("CI", "false"), ("GITHUB_ACTIONS", "true")])));
    }

    #[test]
    fn test_runtime_env() {
        let runtime = RuntimeEnv::from_env(&env(&[
            ("npm_config_registry", "https://registry.example.com"),
            ("CI", "true"),
        ]));
        assert_eq!(
            runtime.registry_override.as_deref(),
            Some("https://registry.example.com")
        );
        assert!(runtime.is_ci);

        let runtime = RuntimeEnv::from_env(&env(&[("npm_config_registry", " ")]));
        assert!(runtime.registry_override.is_none());
        assert!(!runtime.is_ci);
    }
}
