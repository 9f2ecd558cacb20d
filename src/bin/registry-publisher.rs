//! Registry Publisher CLI
//!
//! Publishes packages to npm-compatible registries

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use registry_publisher::{
    Access, BatchPublishOptions, BatchPublisher, ConfigLoadOptions, ConfigLoader, PackagePublisher,
    PublishError, PublishablePackage, PublisherConfig, read_package_descriptor,
};
use std::path::PathBuf;
use std::process;

/// Publish packages to npm-compatible registries
#[derive(Parser)]
#[command(name = "registry-publisher")]
#[command(version)]
#[command(about = "Publish packages to npm-compatible registries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish every package whose version is not on its registry yet
    Publish {
        /// Package directories (each with a package.json)
        #[arg(value_name = "PACKAGE_DIR", required = true)]
        dirs: Vec<PathBuf>,

        /// Publish with tag
        #[arg(long)]
        tag: Option<String>,

        /// Access level (public|restricted)
        #[arg(long)]
        access: Option<String>,

        /// 2FA one-time password
        #[arg(long)]
        otp: Option<String>,
    },

    /// Show what the registry knows about a package
    Info {
        /// Package directory (defaults to current directory)
        #[arg(value_name = "PACKAGE_DIR")]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{}", e);
            if let Some(publish_error) = e.downcast_ref::<PublishError>() {
                eprintln!("\nError code: {}", publish_error.code());
                if !publish_error.is_recoverable() {
                    eprintln!("The run was stopped; remaining packages were not published.");
                }
                for action in publish_error.suggested_actions() {
                    eprintln!("  - {}", action);
                }
            }
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish {
            dirs,
            tag,
            access,
            otp,
        } => publish_command(dirs, tag, access, otp).await,
        Commands::Info { dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            info_command(dir).await
        }
    }
}

async fn load_config(cli_args: PublisherConfig) -> Result<PublisherConfig> {
    let options = ConfigLoadOptions {
        project_path: std::env::current_dir().context("Failed to read current directory")?,
        cli_args: Some(cli_args),
        env: std::env::vars().collect(),
    };
    Ok(ConfigLoader::load(options).await?)
}

async fn load_package(dir: PathBuf) -> Result<PublishablePackage> {
    // The target path is resolved against the child's working directory,
    // which is the package directory itself.
    let dir = tokio::fs::canonicalize(&dir)
        .await
        .with_context(|| format!("Package directory not found: {}", dir.display()))?;
    let descriptor = read_package_descriptor(&dir).await?;
    Ok(PublishablePackage { descriptor, dir })
}

async fn publish_command(
    dirs: Vec<PathBuf>,
    tag: Option<String>,
    access: Option<String>,
    otp: Option<String>,
) -> Result<i32> {
    println!("\n📦 registry-publisher\n");

    let access = access
        .map(|a| a.parse::<Access>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let config = load_config(PublisherConfig {
        tag,
        access,
        ..Default::default()
    })
    .await?;

    let mut packages = Vec::with_capacity(dirs.len());
    for dir in dirs {
        packages.push(load_package(dir).await?);
    }

    let options = BatchPublishOptions {
        tag: config.tag().to_string(),
        access: config.access.map(|a| a.as_str().to_string()),
        otp,
    };

    let batch = BatchPublisher::new(PackagePublisher::from_config(&config));
    let result = batch.publish_packages(&packages, &options).await?;

    println!("\n{}\n", result);
    Ok(if result.success() { 0 } else { 1 })
}

async fn info_command(dir: PathBuf) -> Result<i32> {
    let config = load_config(PublisherConfig::default()).await?;
    let package = load_package(dir).await?;

    let publisher = PackagePublisher::from_config(&config);
    let status = publisher.info_allow_404(&package.descriptor).await?;

    if !status.published {
        println!("{} is not published", package.descriptor.name);
        return Ok(0);
    }

    println!("{}", serde_json::to_string_pretty(&status.pkg_info)?);
    if let Some(version) = &package.descriptor.version {
        let state = if status.has_version(version) {
            "already published"
        } else {
            "not published yet"
        };
        println!("\n{}@{} is {}", package.descriptor.name, version, state);
    }
    Ok(0)
}
