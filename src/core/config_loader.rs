//! Configuration file loader for registry-publisher
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration file name
const CONFIG_FILENAME: &str = ".publish-config.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PublisherConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.publish-config.yaml)
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublisherConfig, PublishError> {
        let mut configs = vec![PublisherConfig::default()];

        if let Some(project_config) = Self::load_config_file(&options.project_path).await? {
            configs.push(project_config);
        }

        if let Some(env_config) = Self::load_env_config(&options.env)? {
            configs.push(env_config);
        }

        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let mut config = Self::merge_configs(configs);
        if let Some(registry) = &config.registry {
            config.registry = Some(Self::expand_string(registry, &options.env));
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load ./.publish-config.yaml if present
    async fn load_config_file(project_path: &Path) -> Result<Option<PublisherConfig>, PublishError> {
        let file_path = project_path.join(CONFIG_FILENAME);
        if fs::metadata(&file_path).await.is_err() {
            return Ok(None);
        }

        let content = fs::read_to_string(&file_path)
            .await
            .map_err(|e| PublishError::Config(format!("Failed to read config file: {}", e)))?;

        let config: PublisherConfig = serde_yaml::from_str(&content)
            .map_err(|e| PublishError::Config(format!("Failed to parse YAML config: {}", e)))?;

        log::debug!("loaded {}", file_path.display());
        Ok(Some(config))
    }

    /// Load configuration from environment variables
    fn load_env_config(
        env: &HashMap<String, String>,
    ) -> Result<Option<PublisherConfig>, PublishError> {
        let mut config = PublisherConfig::default();
        let mut has_changes = false;

        // PUBLISH_TAG -> tag
        if let Some(tag) = env.get("PUBLISH_TAG") {
            config.tag = Some(tag.clone());
            has_changes = true;
        }

        // PUBLISH_ACCESS -> access
        if let Some(access) = env.get("PUBLISH_ACCESS") {
            config.access = Some(access.parse().map_err(PublishError::Config)?);
            has_changes = true;
        }

        // PUBLISH_INFO_CONCURRENCY / PUBLISH_CONCURRENCY -> concurrency
        let limit = |key: &str| -> Result<Option<usize>, PublishError> {
            env.get(key)
                .map(|v| {
                    v.trim()
                        .parse::<usize>()
                        .map_err(|e| PublishError::Config(format!("{}: {}", key, e)))
                })
                .transpose()
        };
        let info_requests = limit("PUBLISH_INFO_CONCURRENCY")?;
        let publishes = limit("PUBLISH_CONCURRENCY")?;
        if info_requests.is_some() || publishes.is_some() {
            config.concurrency = Some(ConcurrencyConfig {
                info_requests,
                publishes,
            });
            has_changes = true;
        }

        Ok(if has_changes { Some(config) } else { None })
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<PublisherConfig>) -> PublisherConfig {
        let mut result = PublisherConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut PublisherConfig, source: PublisherConfig) {
        if source.registry.is_some() {
            target.registry = source.registry;
        }
        if source.tag.is_some() {
            target.tag = source.tag;
        }
        if source.access.is_some() {
            target.access = source.access;
        }
        if let Some(source_concurrency) = source.concurrency {
            let concurrency = target.concurrency.get_or_insert_with(Default::default);
            if source_concurrency.info_requests.is_some() {
                concurrency.info_requests = source_concurrency.info_requests;
            }
            if source_concurrency.publishes.is_some() {
                concurrency.publishes = source_concurrency.publishes;
            }
        }
    }

    /// Expand ${VAR} references; unknown variables are left in place
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        let Ok(env_var_regex) = Regex::new(ENV_VAR_PATTERN) else {
            return input.to_string();
        };

        env_var_regex
            .replace_all(input, |cap: &regex::Captures| match env.get(&cap[1]) {
                Some(value) => value.clone(),
                None => {
                    log::warn!("Environment variable {} not found", &cap[1]);
                    cap[0].to_string()
                }
            })
            .into_owned()
    }

    /// Validate configuration
    pub fn validate(config: &PublisherConfig) -> Result<(), PublishError> {
        if let Some(registry) = &config.registry
            && !(registry.starts_with("http://") || registry.starts_with("https://"))
        {
            return Err(PublishError::Config(format!(
                "registry must be an http(s) URL, got {}",
                registry
            )));
        }

        if let Some(tag) = &config.tag
            && tag.trim().is_empty()
        {
            return Err(PublishError::Config("tag must not be empty".to_string()));
        }

        if let Some(concurrency) = &config.concurrency
            && (concurrency.info_requests == Some(0) || concurrency.publishes == Some(0))
        {
            return Err(PublishError::Config(
                "concurrency limits must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
