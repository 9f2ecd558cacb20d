//! Effective registry resolution

/// Canonical public npm registry
pub const NPM_REGISTRY: &str = "https://registry.npmjs.org";

/// Yarn's public mirror of the npm registry.
///
/// Yarn sets `npm_config_registry` to this mirror for child processes, which
/// serves stale package info, so it is always mapped back to [`NPM_REGISTRY`].
pub const YARN_MIRROR_REGISTRY: &str = "https://registry.yarnpkg.com";

/// Environment variable npm, pnpm and yarn read the registry from
pub const REGISTRY_ENV_VAR: &str = "npm_config_registry";

/// Compute the registry a package should be queried and published against.
///
/// The package-level override (`publishConfig.registry`) wins over the
/// environment override.
pub fn resolve_registry(package_override: Option<&str>, env_override: Option<&str>) -> String {
    let registry = package_override
        .or(env_override)
        .map(str::trim)
        .filter(|r| !r.is_empty());

    match registry {
        Some(r) if r.trim_end_matches('/') != YARN_MIRROR_REGISTRY => r.to_string(),
        _ => NPM_REGISTRY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_override_wins() {
        let registry = resolve_registry(
            Some("https://npm.pkg.github.com"),
            Some("https://registry.example.com"),
        );
        assert_eq!(registry, "https://npm.pkg.github.com");
    }

    #[test]
    fn test_env_override_used_when_package_has_none() {
        let registry = resolve_registry(None, Some("https://registry.example.com"));
        assert_eq!(registry, "https://registry.example.com");
    }

    #[test]
    fn test_defaults_to_npm() {
        assert_eq!(resolve_registry(None, None), NPM_REGISTRY);
        assert_eq!(resolve_registry(Some(""), None), NPM_REGISTRY);
    }

    #[test]
    fn test_yarn_mirror_maps_to_npm() {
        assert_eq!(resolve_registry(None, Some(YARN_MIRROR_REGISTRY)), NPM_REGISTRY);
        assert_eq!(resolve_registry(Some(YARN_MIRROR_REGISTRY), None), NPM_REGISTRY);
        assert_eq!(
            resolve_registry(None, Some("https://registry.yarnpkg.com/")),
            NPM_REGISTRY
        );
    }

    #[test]
    fn test_package_mirror_override_does_not_fall_through_to_env() {
        let registry = resolve_registry(
            Some(YARN_MIRROR_REGISTRY),
            Some("https://registry.example.com"),
        );
        assert_eq!(registry, NPM_REGISTRY);
    }
}
