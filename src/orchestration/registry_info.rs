//! Registry metadata lookups
//!
//! Info queries always go through `npm info`, whichever tool publishes the
//! package, since every supported registry speaks the npm metadata protocol.

use crate::core::error::PublishError;
use crate::core::output::{RegistryError, parse_json_output};
use crate::core::registry::resolve_registry;
use crate::core::traits::{Invocation, PackageDescriptor};
use crate::orchestration::package_publisher::PackagePublisher;
use serde_json::{Map, Value};

/// Answer of one info query
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryQueryResult {
    Info(Value),
    Error(RegistryError),
}

impl RegistryQueryResult {
    fn from_payload(payload: Value) -> Self {
        match RegistryError::from_payload(&payload) {
            Some(error) => RegistryQueryResult::Error(error),
            None => RegistryQueryResult::Info(payload),
        }
    }
}

/// Whether a package exists on its registry, with its metadata when it does
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfoStatus {
    pub published: bool,
    pub pkg_info: Value,
}

impl PackageInfoStatus {
    fn not_published() -> Self {
        Self {
            published: false,
            pkg_info: Value::Object(Map::new()),
        }
    }

    /// Whether the registry already lists `version`.
    ///
    /// `versions` is usually an array, but a package with a single release
    /// may report it as a bare string.
    pub fn has_version(&self, version: &str) -> bool {
        match self.pkg_info.get("versions") {
            Some(Value::Array(versions)) => versions.iter().any(|v| v.as_str() == Some(version)),
            Some(Value::String(only)) => only == version,
            _ => false,
        }
    }
}

impl PackagePublisher {
    /// Query the registry for `pkg`, admitted by the info gate.
    ///
    /// Blank output is how npm reports a package that was never published,
    /// so it maps to `E404`.
    pub async fn get_package_info(
        &self,
        pkg: &PackageDescriptor,
    ) -> Result<RegistryQueryResult, PublishError> {
        self.gates
            .info
            .run(|| async {
                let registry = resolve_registry(
                    pkg.registry.as_deref(),
                    self.env.registry_override.as_deref(),
                );
                let invocation = Invocation::new(
                    "npm",
                    [
                        "info".to_string(),
                        pkg.name.clone(),
                        "--registry".to_string(),
                        registry,
                        "--json".to_string(),
                    ],
                );

                let output = self.runner.run(&invocation).await?;
                if output.stdout.trim().is_empty() {
                    return Ok(RegistryQueryResult::Error(RegistryError::new("E404")));
                }

                let payload = parse_json_output(&output.stdout, "npm info")?;
                Ok::<_, PublishError>(RegistryQueryResult::from_payload(payload))
            })
            .await
    }

    /// Like [`get_package_info`](Self::get_package_info), with a missing
    /// package as a normal answer.
    ///
    /// Any other registry error means "not published" cannot be told apart
    /// from "registry broken", and comes back as
    /// [`PublishError::UnknownRegistryError`].
    pub async fn info_allow_404(
        &self,
        pkg: &PackageDescriptor,
    ) -> Result<PackageInfoStatus, PublishError> {
        match self.get_package_info(pkg).await? {
            RegistryQueryResult::Info(pkg_info) => Ok(PackageInfoStatus {
                published: true,
                pkg_info,
            }),
            RegistryQueryResult::Error(error) if error.code == "E404" => {
                log::warn!("Received 404 for npm info \"{}\"", pkg.name);
                Ok(PackageInfoStatus::not_published())
            }
            RegistryQueryResult::Error(error) => {
                log::error!(
                    "Received an unknown error code: {} for npm info \"{}\"",
                    error.code,
                    pkg.name
                );
                if let Some(summary) = &error.summary {
                    log::error!("{}", summary);
                }
                if let Some(detail) = &error.detail {
                    log::error!("{}", detail);
                }

                Err(PublishError::UnknownRegistryError {
                    package: pkg.name.clone(),
                    code: error.code,
                    summary: error.summary,
                    detail: error.detail,
                })
            }
        }
    }
}
