use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use kodegen_bundler_cert::config::{ApiKeyConfig, CertConfig};
use kodegen_bundler_cert::output::print_summary;
use kodegen_bundler_cert::validation::{check_dependencies, expand_tilde_path, validate_p8_file};
use kodegen_bundler_cert::{AppleAPIClient, Keychain, LifecycleResolver, ResolutionOutcome};
use kodegen_bundler_cert::{error, success, warn};

// Status lines go to stderr; stdout only carries the CER_* result lines so
// callers can capture them directly.

#[derive(Parser)]
#[command(name = "kodegen_cert")]
#[command(version, about = "Reuse or create a code signing certificate")]
struct Cli {
    /// Path to config file (TOML)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Team member username used to authenticate
    #[arg(long, short = 'u')]
    username: Option<String>,

    /// Use a development certificate instead of production
    #[arg(long)]
    development: bool,

    /// Revoke expired certificates before looking for a usable one
    #[arg(long)]
    revoke_expired: bool,

    /// Create a new certificate even if an installed one exists
    #[arg(long)]
    force: bool,

    /// Directory for the CSR, private key and certificate files
    #[arg(long, short = 'o')]
    output_path: Option<PathBuf>,

    /// Keychain to search and import into
    #[arg(long)]
    keychain: Option<String>,

    /// Common name for new signing requests
    #[arg(long)]
    common_name: Option<String>,

    /// App Store Connect Issuer ID
    #[arg(long, requires_all = ["key_id", "private_key"])]
    issuer_id: Option<String>,

    /// App Store Connect Key ID
    #[arg(long, requires_all = ["issuer_id", "private_key"])]
    key_id: Option<String>,

    /// Path to .p8 private key file
    #[arg(long, requires_all = ["issuer_id", "key_id"])]
    private_key: Option<PathBuf>,

    /// Account is in the Enterprise (in-house) program
    #[arg(long)]
    enterprise: bool,

    /// Verbose output
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(cli).await?;
    config.validate()?;

    print_summary(&config, env!("CARGO_PKG_VERSION"));

    let api = config.api.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "App Store Connect API credentials required.\n\
             Pass --issuer-id/--key-id/--private-key, add an [api] section to the config file,\n\
             or export APPLE_API_KEY and APPLE_API_ISSUER"
        )
    })?;

    // ===== PRE-FLIGHT VALIDATION (before any remote change) =====
    validate_p8_file(&api.private_key_path).await?;
    check_dependencies().await?;
    let keychain = Keychain::new(&config.keychain);
    keychain.ensure_accessible().await?;
    // ===== END PRE-FLIGHT VALIDATION =====

    let client = AppleAPIClient::from_config(&api, &config.common_name).await?;
    let resolver = LifecycleResolver::new(client, keychain);

    let resolution = match resolver.resolve(&config).await {
        Ok(resolution) => resolution,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };

    if !resolution.revocations.failures.is_empty() {
        warn!(
            "{} expired certificate(s) could not be revoked",
            resolution.revocations.failures.len()
        );
    }

    match resolution.outcome {
        ResolutionOutcome::Reused => success!(
            "Using installed {} certificate {}",
            resolution.class,
            resolution.certificate_id
        ),
        ResolutionOutcome::Created => success!(
            "Created {} certificate {}",
            resolution.class,
            resolution.certificate_id
        ),
    }

    println!("CER_CERTIFICATE_ID={}", resolution.certificate_id);
    println!("CER_FILE_PATH={}", resolution.file_path.display());

    Ok(())
}

/// Merge config file, CLI flags and environment (CLI wins, then file, then env)
async fn build_config(cli: Cli) -> Result<CertConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = expand_tilde_path(&path.to_string_lossy())?;
            CertConfig::load(&path).await?
        }
        None => CertConfig::new(String::new(), "."),
    };

    if let Some(username) = cli.username {
        config.username = username;
    }
    if let Some(output_path) = cli.output_path {
        config.output_path = output_path;
    }
    if let Some(keychain) = cli.keychain {
        config.keychain = keychain;
    }
    if let Some(common_name) = cli.common_name {
        config.common_name = common_name;
    }
    config.development |= cli.development;
    config.revoke_expired |= cli.revoke_expired;
    config.force |= cli.force;
    config.verbose |= cli.verbose;

    if let (Some(issuer_id), Some(key_id), Some(private_key_path)) =
        (cli.issuer_id, cli.key_id, cli.private_key)
    {
        config.api = Some(ApiKeyConfig {
            issuer_id,
            key_id,
            private_key_path,
            enterprise: false,
        });
    }
    if config.api.is_none() {
        config.api = ApiKeyConfig::from_env();
    }

    if let Some(api) = config.api.as_mut() {
        api.enterprise |= cli.enterprise;
        api.private_key_path = expand_tilde_path(&api.private_key_path.to_string_lossy())?;
    }
    config.output_path = expand_tilde_path(&config.output_path.to_string_lossy())?;

    Ok(config)
}
