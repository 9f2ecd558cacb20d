//! Batch Publisher - publishes a set of packages in one session
//!
//! Features:
//! - One OTP session shared by every package
//! - Versions already on the registry are skipped
//! - All packages run concurrently, bounded by the publisher's gates
//! - Detailed reporting for each package
//!
//! An unknown registry error from any info query aborts the whole run.

use crate::core::error::PublishError;
use crate::core::traits::PackageDescriptor;
use crate::orchestration::package_publisher::{PackagePublisher, PublishOptions};
use crate::security::two_factor::{OtpState, get_token_is_required};
use futures::future::try_join_all;
use std::fmt;
use std::path::PathBuf;

/// A package and the directory it is published from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishablePackage {
    pub descriptor: PackageDescriptor,
    pub dir: PathBuf,
}

/// Batch publishing options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPublishOptions {
    /// dist-tag for every package
    pub tag: String,

    /// Access for packages that do not declare their own
    pub access: Option<String>,

    /// One-time password supplied up front
    pub otp: Option<String>,
}

impl Default for BatchPublishOptions {
    fn default() -> Self {
        Self {
            tag: crate::core::config::DEFAULT_TAG.to_string(),
            access: None,
            otp: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagePublishStatus {
    Published,
    Failed,
    AlreadyPublished,
}

/// Result for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePublishResult {
    pub name: String,
    pub version: Option<String>,
    pub status: PackagePublishStatus,
    /// Spawn, prompt or output failure behind a `Failed` status
    pub error: Option<String>,
}

impl PackagePublishResult {
    fn new(pkg: &PackageDescriptor, status: PackagePublishStatus) -> Self {
        Self {
            name: pkg.name.clone(),
            version: pkg.version.clone(),
            status,
            error: None,
        }
    }

    fn label(&self) -> String {
        match &self.version {
            Some(version) => format!("{}@{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

/// Batch publish result, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPublishResult {
    pub results: Vec<PackagePublishResult>,
}

impl BatchPublishResult {
    fn with_status(&self, status: PackagePublishStatus) -> Vec<&PackagePublishResult> {
        self.results.iter().filter(|r| r.status == status).collect()
    }

    pub fn succeeded(&self) -> Vec<&PackagePublishResult> {
        self.with_status(PackagePublishStatus::Published)
    }

    pub fn failed(&self) -> Vec<&PackagePublishResult> {
        self.with_status(PackagePublishStatus::Failed)
    }

    pub fn skipped(&self) -> Vec<&PackagePublishResult> {
        self.with_status(PackagePublishStatus::AlreadyPublished)
    }

    /// True when nothing failed
    pub fn success(&self) -> bool {
        self.failed().is_empty()
    }
}

impl fmt::Display for BatchPublishResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "📊 Publish Summary")?;
        writeln!(f, "{}", "=".repeat(60))?;

        writeln!(f, "\n✅ Published: {}", self.succeeded().len())?;
        for result in self.succeeded() {
            writeln!(f, "   - {}", result.label())?;
        }

        writeln!(f, "\n❌ Failed: {}", self.failed().len())?;
        for result in self.failed() {
            match &result.error {
                Some(error) => writeln!(f, "   - {}: {}", result.label(), error)?,
                None => writeln!(f, "   - {}", result.label())?,
            }
        }

        if !self.skipped().is_empty() {
            writeln!(f, "\n⏭️  Already published: {}", self.skipped().len())?;
            for result in self.skipped() {
                writeln!(f, "   - {}", result.label())?;
            }
        }

        writeln!(f, "\n{}", "=".repeat(60))?;
        write!(
            f,
            "Overall Status: {}",
            if self.success() { "✅ SUCCESS" } else { "❌ FAILED" }
        )
    }
}

/// BatchPublisher - publishes many packages through one [`PackagePublisher`]
pub struct BatchPublisher {
    publisher: PackagePublisher,
}

impl BatchPublisher {
    pub fn new(publisher: PackagePublisher) -> Self {
        Self { publisher }
    }

    /// OTP state shared by every package of a session
    ///
    /// An explicit OTP marks the session as requiring one. In CI nobody can
    /// answer a prompt, so the requirement is not probed at all.
    pub fn session_otp_state(&self, otp: Option<String>) -> OtpState {
        if let Some(token) = otp {
            return OtpState::with_token(token);
        }

        let env = self.publisher.env();
        if env.is_ci {
            return OtpState::known(false);
        }

        OtpState::new(get_token_is_required(
            self.publisher.runner.clone(),
            env.registry_override.clone(),
        ))
    }

    /// Publish every package whose version is not yet on its registry
    pub async fn publish_packages(
        &self,
        packages: &[PublishablePackage],
        options: &BatchPublishOptions,
    ) -> Result<BatchPublishResult, PublishError> {
        if packages.is_empty() {
            return Ok(BatchPublishResult::default());
        }

        log::info!("publishing {} packages", packages.len());
        let session = self.session_otp_state(options.otp.clone());

        let results = try_join_all(
            packages
                .iter()
                .map(|pkg| self.publish_one(pkg, options, &session)),
        )
        .await?;

        Ok(BatchPublishResult { results })
    }

    async fn publish_one(
        &self,
        pkg: &PublishablePackage,
        options: &BatchPublishOptions,
        session: &OtpState,
    ) -> Result<PackagePublishResult, PublishError> {
        let descriptor = &pkg.descriptor;
        let info = self.publisher.info_allow_404(descriptor).await?;

        if let Some(version) = &descriptor.version
            && info.published
            && info.has_version(version)
        {
            log::info!("{}@{} is already published", descriptor.name, version);
            return Ok(PackagePublishResult::new(
                descriptor,
                PackagePublishStatus::AlreadyPublished,
            ));
        }

        // A package-level policy only applies when no OTP was given up front.
        // It decides the requirement; the token stays the session's.
        let own_state = match descriptor.two_factor {
            Some(policy) if options.otp.is_none() => {
                Some(session.with_requirement(policy.is_required()))
            }
            _ => None,
        };
        let otp = own_state.as_ref().unwrap_or(session);

        let opts = PublishOptions {
            cwd: pkg.dir.clone(),
            access: descriptor.access.clone().or_else(|| options.access.clone()),
            tag: options.tag.clone(),
        };

        match self.publisher.publish(&descriptor.name, &opts, otp).await {
            Ok(outcome) if outcome.published => {
                log::info!("published {}", descriptor.name);
                Ok(PackagePublishResult::new(
                    descriptor,
                    PackagePublishStatus::Published,
                ))
            }
            Ok(_) => Ok(PackagePublishResult::new(
                descriptor,
                PackagePublishStatus::Failed,
            )),
            Err(e) if !e.is_recoverable() => Err(e),
            Err(e) => {
                log::error!("failed to publish {}: {}", descriptor.name, e);
                Ok(PackagePublishResult {
                    error: Some(e.to_string()),
                    ..PackagePublishResult::new(descriptor, PackagePublishStatus::Failed)
                })
            }
        }
    }
}
