//! Error handling for publish orchestration
//!
//! This module provides the error type shared by the orchestrator, the
//! process executor and the configuration loader, with recovery guidance
//! using the thiserror crate for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for publish orchestration
#[derive(Error, Debug)]
pub enum PublishError {
    // Process errors
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    #[error("Failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },

    // Output errors
    #[error("Error parsing JSON output of {context}: {message}\n{output}")]
    JsonParse {
        context: String,
        message: String,
        output: String,
    },

    // Registry errors
    #[error("Received an unknown error code: {code} for npm info \"{package}\"")]
    UnknownRegistryError {
        package: String,
        code: String,
        summary: Option<String>,
        detail: Option<String>,
    },

    // Operator interaction
    #[error("Failed to read one-time password: {0}")]
    Prompt(String),

    // Configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid package manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },
}

impl PublishError {
    /// Check if this error is recoverable
    ///
    /// An unknown registry error is not: it means "not published" cannot be
    /// told apart from "registry broken", so the whole run must stop.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::UnknownRegistryError { .. } | Self::CommandNotAllowed(_)
        )
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::CommandNotAllowed(_) => {
                vec!["Only npm, pnpm and yarn can be used as publish tools"]
            }
            Self::InvalidWorkingDirectory(_) => vec!["Check the package directory path"],
            Self::Spawn { .. } => vec![
                "Make sure the package manager is installed and on PATH",
                "Check the permissions of the package directory",
            ],
            Self::JsonParse { .. } => vec![
                "Inspect the tool output above for the real failure",
                "Check that lifecycle scripts do not swallow the --json output",
            ],
            Self::UnknownRegistryError { .. } => vec![
                "Check the registry status",
                "Verify the registry URL and your credentials",
                "Re-run the publish once the registry responds normally",
            ],
            Self::Prompt(_) => vec![
                "Run the publish from an interactive terminal",
                "Pass the one-time password with --otp",
            ],
            Self::Config(_) => vec!["Check .publish-config.yaml and the environment"],
            Self::Manifest { .. } => vec!["Check that package.json is valid JSON with a name"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::CommandNotAllowed(_) => "COMMAND_NOT_ALLOWED",
            Self::InvalidWorkingDirectory(_) => "INVALID_WORKING_DIRECTORY",
            Self::Spawn { .. } => "SPAWN_FAILED",
            Self::JsonParse { .. } => "JSON_PARSE",
            Self::UnknownRegistryError { .. } => "UNKNOWN_REGISTRY_ERROR",
            Self::Prompt(_) => "PROMPT_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Manifest { .. } => "INVALID_MANIFEST",
        }
    }
}
