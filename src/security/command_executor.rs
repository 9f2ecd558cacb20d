//! SafeCommandExecutor: whitelisted package-manager execution
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only npm, pnpm and yarn can execute
//! - **Injection prevention**: Uses `tokio::process::Command`, never a shell
//! - **Argument sanitization**: Arguments passed as Vec, never interpolated into shell strings
//! - **Working directory validation**: Validates existence before execution
//! - **Scoped environment**: Overrides apply to the child process only
//!
//! There is deliberately no timeout: a publish waiting on registry I/O runs
//! to completion or failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use registry_publisher::core::{CommandRunner, Invocation};
//! use registry_publisher::security::SafeCommandExecutor;
//!
//! # async fn example() -> Result<(), registry_publisher::core::PublishError> {
//! let executor = SafeCommandExecutor::new();
//! let output = executor.run(&Invocation::new("npm", ["--version"])).await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

use crate::core::error::PublishError;
use crate::core::traits::{CommandOutput, CommandRunner, Invocation};
use crate::security::two_factor::redact_args;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Allowed commands whitelist for security.
const ALLOWED_COMMANDS: &[&str] = &["npm", "pnpm", "yarn"];

/// Process runner used outside of tests
#[derive(Debug, Default, Clone)]
pub struct SafeCommandExecutor;

impl SafeCommandExecutor {
    pub fn new() -> Self {
        Self
    }

    fn validate(invocation: &Invocation) -> Result<(), PublishError> {
        if !ALLOWED_COMMANDS.contains(&invocation.program.as_str()) {
            return Err(PublishError::CommandNotAllowed(invocation.program.clone()));
        }

        if let Some(cwd) = &invocation.cwd
            && !cwd.is_dir()
        {
            return Err(PublishError::InvalidWorkingDirectory(cwd.clone()));
        }

        Ok(())
    }

    // Windows-specific: npm, yarn, etc. are .cmd files, not .exe
    #[cfg(target_os = "windows")]
    fn program_name(command: &str) -> String {
        format!("{}.cmd", command)
    }

    #[cfg(not(target_os = "windows"))]
    fn program_name(command: &str) -> String {
        command.to_string()
    }
}

#[async_trait]
impl CommandRunner for SafeCommandExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, PublishError> {
        Self::validate(invocation)?;

        log::debug!(
            "spawning {} {}",
            invocation.program,
            redact_args(&invocation.args)
        );

        let mut command = Command::new(Self::program_name(&invocation.program));
        command
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        let output = command.output().await.map_err(|e| PublishError::Spawn {
            program: invocation.program.clone(),
            message: e.to_string(),
        })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        log::debug!("{} exited with {:?}", invocation.program, result.code);
        Ok(result)
    }
}
