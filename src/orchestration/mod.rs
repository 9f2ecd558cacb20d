//! Orchestration layer for package publishing
//!
//! This module provides the high-level components that drive the package
//! manager: a single-package publisher with the OTP retry protocol, registry
//! info queries, and a batch publisher for whole release sessions.

pub mod batch_publisher;
pub mod package_publisher;
pub mod registry_info;

// Re-export main types for convenience
pub use batch_publisher::{
    BatchPublishOptions, BatchPublishResult, BatchPublisher, PackagePublishResult,
    PackagePublishStatus, PublishablePackage,
};
pub use package_publisher::{PackagePublisher, PublishOptions};
pub use registry_info::{PackageInfoStatus, RegistryQueryResult};
