//! Publish tool variants and their detection
//!
//! The package manager a directory prefers decides which executable runs
//! the publish. pnpm and yarn are probed for their major version because the
//! command line differs between major lines.

use crate::core::traits::{CommandRunner, Invocation, PackageManager, PackageManagerDetector};
use semver::Version;
use std::path::Path;

/// Executable that performs a publish, with its version-dependent switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTool {
    Npm,
    Pnpm {
        /// pnpm 5+ refuses to publish from a dirty or non-default branch
        should_add_no_git_checks: bool,
    },
    Yarn {
        /// Yarn 2+ ("berry") publishes through `yarn npm publish`
        berry: bool,
    },
}

impl PublishTool {
    pub fn program(&self) -> &'static str {
        match self {
            PublishTool::Npm => "npm",
            PublishTool::Pnpm { .. } => "pnpm",
            PublishTool::Yarn { .. } => "yarn",
        }
    }

    /// Leading arguments: optional namespace, `publish`, target, `--json`
    pub fn publish_command(&self, target: &Path) -> Vec<String> {
        let mut args = match self {
            PublishTool::Yarn { berry: true } => vec!["npm".to_string()],
            PublishTool::Npm | PublishTool::Pnpm { .. } | PublishTool::Yarn { berry: false } => {
                Vec::new()
            }
        };
        args.push("publish".to_string());
        args.push(target.display().to_string());
        args.push("--json".to_string());
        args
    }

    /// Flags appended after every other publish flag
    pub fn trailing_flags(&self) -> Vec<String> {
        match self {
            PublishTool::Pnpm {
                should_add_no_git_checks: true,
            } => vec!["--no-git-checks".to_string()],
            PublishTool::Pnpm {
                should_add_no_git_checks: false,
            }
            | PublishTool::Npm
            | PublishTool::Yarn { .. } => Vec::new(),
        }
    }
}

/// Major version printed by `<tool> --version`, or `None` on any failure
async fn probe_major_version(runner: &dyn CommandRunner, tool: &str, cwd: &Path) -> Option<u64> {
    let invocation = Invocation::new(tool, ["--version"]).current_dir(cwd);

    let output = match runner.run(&invocation).await {
        Ok(output) => output,
        Err(e) => {
            log::warn!("could not run {} --version: {}", tool, e);
            return None;
        }
    };

    let raw = output.stdout.trim();
    match Version::parse(raw.trim_start_matches('v')) {
        Ok(version) => Some(version.major),
        Err(e) => {
            log::warn!("could not parse {} version {:?}: {}", tool, raw, e);
            None
        }
    }
}

/// Decide which tool publishes from `cwd`. Never fails.
pub async fn detect_publish_tool(
    cwd: &Path,
    detector: &dyn PackageManagerDetector,
    runner: &dyn CommandRunner,
) -> PublishTool {
    let tool = match detector.preferred(cwd).await {
        Some(PackageManager::Pnpm) => PublishTool::Pnpm {
            should_add_no_git_checks: probe_major_version(runner, "pnpm", cwd)
                .await
                .is_some_and(|major| major >= 5),
        },
        Some(PackageManager::Yarn) => PublishTool::Yarn {
            berry: probe_major_version(runner, "yarn", cwd)
                .await
                .is_some_and(|major| major >= 2),
        },
        Some(PackageManager::Npm) | None => PublishTool::Npm,
    };

    log::debug!("publishing from {} with {:?}", cwd.display(), tool);
    tool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{FixedDetector, ScriptedRunner, stdout};
    use std::path::PathBuf;

    async fn detect(pm: Option<PackageManager>, runner: &ScriptedRunner) -> PublishTool {
        detect_publish_tool(Path::new("/repo/pkg"), &FixedDetector(pm), runner).await
    }

    #[tokio::test]
    async fn test_npm_needs_no_probe() {
        let runner = ScriptedRunner::new();
        assert_eq!(detect(Some(PackageManager::Npm), &runner).await, PublishTool::Npm);
        assert_eq!(detect(None, &runner).await, PublishTool::Npm);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_modern_pnpm_adds_no_git_checks() {
        let runner = ScriptedRunner::new().on("pnpm --version", stdout("8.6.12\n"));
        assert_eq!(
            detect(Some(PackageManager::Pnpm), &runner).await,
            PublishTool::Pnpm {
                should_add_no_git_checks: true
            }
        );
        assert_eq!(runner.calls()[0].cwd, Some(PathBuf::from("/repo/pkg")));
    }

    #[tokio::test]
    async fn test_old_pnpm_keeps_git_checks() {
        let runner = ScriptedRunner::new().on("pnpm --version", stdout("4.14.4\n"));
        assert_eq!(
            detect(Some(PackageManager::Pnpm), &runner).await,
            PublishTool::Pnpm {
                should_add_no_git_checks: false
            }
        );
    }

    #[tokio::test]
    async fn test_pnpm_probe_failure_degrades() {
        let runner = ScriptedRunner::new().fail("pnpm --version", "not found");
        assert_eq!(
            detect(Some(PackageManager::Pnpm), &runner).await,
            PublishTool::Pnpm {
                should_add_no_git_checks: false
            }
        );

        let runner = ScriptedRunner::new().on("pnpm --version", stdout("garbage"));
        assert_eq!(
            detect(Some(PackageManager::Pnpm), &runner).await,
            PublishTool::Pnpm {
                should_add_no_git_checks: false
            }
        );
    }

    #[tokio::test]
    async fn test_yarn_berry_detection() {
        let runner = ScriptedRunner::new().on("yarn --version", stdout("4.1.0\n"));
        assert_eq!(
            detect(Some(PackageManager::Yarn), &runner).await,
            PublishTool::Yarn { berry: true }
        );

        let runner = ScriptedRunner::new().on("yarn --version", stdout("1.22.19\n"));
        assert_eq!(
            detect(Some(PackageManager::Yarn), &runner).await,
            PublishTool::Yarn { berry: false }
        );
    }

    #[tokio::test]
    async fn test_yarn_probe_failure_degrades() {
        let runner = ScriptedRunner::new().fail("yarn --version", "not found");
        assert_eq!(
            detect(Some(PackageManager::Yarn), &runner).await,
            PublishTool::Yarn { berry: false }
        );
    }

    #[test]
    fn test_publish_command_per_tool() {
        let target = Path::new("/repo/pkg");
        assert_eq!(
            PublishTool::Npm.publish_command(target),
            vec!["publish", "/repo/pkg", "--json"]
        );
        assert_eq!(
            PublishTool::Yarn { berry: true }.publish_command(target),
            vec!["npm", "publish", "/repo/pkg", "--json"]
        );
        assert_eq!(
            PublishTool::Yarn { berry: false }.publish_command(target),
            vec!["publish", "/repo/pkg", "--json"]
        );
    }

    #[test]
    fn test_trailing_flags() {
        assert_eq!(
            PublishTool::Pnpm {
                should_add_no_git_checks: true
            }
            .trailing_flags(),
            vec!["--no-git-checks"]
        );
        assert!(PublishTool::Npm.trailing_flags().is_empty());
        assert!(PublishTool::Yarn { berry: true }.trailing_flags().is_empty());
    }
}
