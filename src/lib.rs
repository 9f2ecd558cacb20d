//! Publish orchestration for npm-compatible registries
//!
//! Drives npm, pnpm or yarn to publish packages concurrently, bounded by
//! concurrency gates, and handles the one-time-password protocol registries
//! use for two-factor authentication.

pub mod core;
pub mod orchestration;
pub mod plugins;
pub mod security;

pub use crate::core::*;
pub use orchestration::{
    BatchPublishOptions, BatchPublishResult, BatchPublisher, PackagePublisher, PublishOptions,
    PublishablePackage,
};
pub use security::{OtpState, SafeCommandExecutor};
