//! `package.json` reading
//!
//! Only the fields that influence a publish are read: `name`, `version` and
//! `publishConfig.{registry, access}`.

use crate::core::error::PublishError;
use crate::core::traits::PackageDescriptor;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
    #[serde(rename = "publishConfig", default)]
    publish_config: PublishConfig,
}

#[derive(Debug, Default, Deserialize)]
struct PublishConfig {
    registry: Option<String>,
    access: Option<String>,
}

/// Descriptor for the package in `dir`
pub async fn read_package_descriptor(dir: &Path) -> Result<PackageDescriptor, PublishError> {
    let path = dir.join("package.json");
    let manifest_error = |message: String| PublishError::Manifest {
        path: path.clone(),
        message,
    };

    let content = fs::read_to_string(&path)
        .await
        .map_err(|e| manifest_error(e.to_string()))?;
    let manifest: PackageJson =
        serde_json::from_str(&content).map_err(|e| manifest_error(e.to_string()))?;

    let name = manifest
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| manifest_error("missing \"name\"".to_string()))?;

    Ok(PackageDescriptor {
        name,
        version: manifest.version,
        registry: manifest.publish_config.registry,
        access: manifest.publish_config.access,
        two_factor: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_publish_fields() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("package.json"),
            r#"{
                "name": "@scope/pkg-a",
                "version": "1.2.3",
                "publishConfig": {"registry": "https://npm.example.com", "access": "public"}
            }"#,
        )
        .unwrap();

        let descriptor = read_package_descriptor(temp_dir.path()).await.unwrap();
        assert_eq!(descriptor.name, "@scope/pkg-a");
        assert_eq!(descriptor.version.as_deref(), Some("1.2.3"));
        assert_eq!(descriptor.registry.as_deref(), Some("https://npm.example.com"));
        assert_eq!(descriptor.access.as_deref(), Some("public"));
        assert_eq!(descriptor.two_factor, None);
    }

    #[tokio::test]
    async fn test_minimal_manifest() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("package.json"), r#"{"name":"pkg-a"}"#).unwrap();

        let descriptor = read_package_descriptor(temp_dir.path()).await.unwrap();
        assert_eq!(descriptor, PackageDescriptor::new("pkg-a"));
    }

    #[tokio::test]
    async fn test_missing_name() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("package.json"), r#"{"version":"1.0.0"}"#).unwrap();

        let err = read_package_descriptor(temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, PublishError::Manifest { .. }));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_package_descriptor(temp_dir.path()).await.is_err());

        std::fs::write(temp_dir.path().join("package.json"), "{not json").unwrap();
        let err = read_package_descriptor(temp_dir.path()).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_MANIFEST");
    }
}
