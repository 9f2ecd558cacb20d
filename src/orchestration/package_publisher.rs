//! Package Publisher - runs one package's publish through its package manager
//!
//! Manages the publish of a single package:
//! - Publish tool detection per attempt
//! - Argument construction per tool variant
//! - Output parsing that tolerates lifecycle-script noise
//! - The OTP retry protocol
//!
//! Retries happen inside [`PackagePublisher::publish`] after the gates have
//! admitted the package, so a package waiting on its operator never queues
//! behind other pending publishes again.

use crate::core::config::{PublisherConfig, RuntimeEnv};
use crate::core::error::PublishError;
use crate::core::gate::PublishGates;
use crate::core::output::{RegistryError, parse_json_output};
use crate::core::registry::{REGISTRY_ENV_VAR, resolve_registry};
use crate::core::traits::{
    CommandOutput, CommandRunner, Invocation, OtpPrompter, PackageManagerDetector,
    PublishOutcome,
};
use crate::plugins::package_manager::LockfileDetector;
use crate::plugins::publish_tool::{PublishTool, detect_publish_tool};
use crate::security::command_executor::SafeCommandExecutor;
use crate::security::two_factor::{
    OTP_DETAIL_MARKER, OTP_FLAG, OtpState, TerminalPrompter, get_otp_code,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-package publish options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// Package directory
    pub cwd: PathBuf,
    /// `public` or `restricted`
    pub access: Option<String>,
    /// dist-tag
    pub tag: String,
}

/// Main single-package publish orchestrator
///
/// Cloning is cheap and clones share gates, so every clone counts against
/// the same limits.
#[derive(Clone)]
pub struct PackagePublisher {
    pub(crate) runner: Arc<dyn CommandRunner>,
    detector: Arc<dyn PackageManagerDetector>,
    prompter: Arc<dyn OtpPrompter>,
    pub(crate) gates: PublishGates,
    pub(crate) env: RuntimeEnv,
}

impl PackagePublisher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        detector: Arc<dyn PackageManagerDetector>,
        prompter: Arc<dyn OtpPrompter>,
        gates: PublishGates,
        env: RuntimeEnv,
    ) -> Self {
        Self {
            runner,
            detector,
            prompter,
            gates,
            env,
        }
    }

    /// Publisher wired to real processes, lockfiles and the terminal
    ///
    /// `npm_config_registry` from the process environment wins over the
    /// configured registry.
    pub fn from_config(config: &PublisherConfig) -> Self {
        let mut env = RuntimeEnv::from_process();
        if env.registry_override.is_none() {
            env.registry_override = config.registry.clone();
        }

        Self::new(
            Arc::new(SafeCommandExecutor::new()),
            Arc::new(LockfileDetector::new()),
            Arc::new(TerminalPrompter::new()),
            config.gates(),
            env,
        )
    }

    pub fn env(&self) -> &RuntimeEnv {
        &self.env
    }

    pub fn gates(&self) -> &PublishGates {
        &self.gates
    }

    /// Publish `name` from `opts.cwd`.
    ///
    /// Admitted by the info gate, then the publish gate. Registry errors
    /// come back as `published: false`; spawn, prompt and output-parsing
    /// failures come back as `Err`.
    pub async fn publish(
        &self,
        name: &str,
        opts: &PublishOptions,
        otp: &OtpState,
    ) -> Result<PublishOutcome, PublishError> {
        self.gates
            .info
            .run(|| {
                self.gates
                    .publish
                    .run(|| self.internal_publish(name, opts, otp))
            })
            .await
    }

    async fn internal_publish(
        &self,
        name: &str,
        opts: &PublishOptions,
        otp: &OtpState,
    ) -> Result<PublishOutcome, PublishError> {
        loop {
            let tool =
                detect_publish_tool(&opts.cwd, self.detector.as_ref(), self.runner.as_ref()).await;
            let args = self.build_args(&tool, opts, otp).await?;

            let invocation = Invocation::new(tool.program(), args)
                .current_dir(&opts.cwd)
                .env(
                    REGISTRY_ENV_VAR,
                    resolve_registry(None, self.env.registry_override.as_deref()),
                );

            log::info!("publishing \"{}\" with {}", name, tool.program());
            let output = self.runner.run(&invocation).await?;
            let payload = parse_publish_output(&output, &format!("{} publish", tool.program()))?;

            let Some(error) = RegistryError::from_payload(&payload) else {
                return Ok(PublishOutcome { published: true });
            };

            if is_otp_error(&error) && !self.env.is_ci {
                if otp.has_token() {
                    log::warn!("one-time password for \"{}\" was rejected", name);
                    otp.clear_token();
                }
                otp.mark_required();
                continue;
            }

            log::error!(
                "an error occurred while publishing \"{}\": {} {}",
                name,
                error.code,
                error.summary.as_deref().unwrap_or_default()
            );
            if let Some(detail) = &error.detail {
                log::error!("{}", detail);
            }
            return Ok(PublishOutcome { published: false });
        }
    }

    async fn build_args(
        &self,
        tool: &PublishTool,
        opts: &PublishOptions,
        otp: &OtpState,
    ) -> Result<Vec<String>, PublishError> {
        let mut args = tool.publish_command(&opts.cwd);

        if let Some(access) = &opts.access {
            args.push("--access".to_string());
            args.push(access.clone());
        }

        args.push("--tag".to_string());
        args.push(opts.tag.clone());

        if !self.env.is_ci && otp.is_required().await {
            let code = get_otp_code(otp, &self.gates.otp, self.prompter.as_ref()).await?;
            args.push(OTP_FLAG.to_string());
            args.push(code);
        }

        args.extend(tool.trailing_flags());
        Ok(args)
    }
}

/// Missing OTP, or an OTP the registry refused
fn is_otp_error(error: &RegistryError) -> bool {
    match error.code.as_str() {
        "EOTP" => true,
        "E401" => error
            .detail
            .as_deref()
            .is_some_and(|detail| detail.contains(OTP_DETAIL_MARKER)),
        _ => false,
    }
}

/// npm 7+ prints `--json` errors to stderr, so stderr is the fallback when
/// stdout carries no object at all.
fn parse_publish_output(output: &CommandOutput, context: &str) -> Result<Value, PublishError> {
    if !output.stdout.contains('{') && output.stderr.contains('{') {
        return parse_json_output(&output.stderr, context);
    }
    parse_json_output(&output.stdout, context)
}
