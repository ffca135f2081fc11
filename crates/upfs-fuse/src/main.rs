//! upfs binary.
//!
//! Mounts Up Bank accounts as a filesystem.
//!
//! ## Usage
//!
//! ```bash
//! # Live API, token from ./token (or UP_TOKEN)
//! upfs /mnt/up
//!
//! # Built-in demo data, no token needed
//! upfs /mnt/up --demo
//!
//! # Fund allocations from two specific accounts
//! upfs /mnt/up --pool-account <ID> --pool-account <ID>
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use fuser::MountOption;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use upfs_client::UpClient;
use upfs_fuse::config::{self, TOKEN_ENV};
use upfs_fuse::{Cli, FuseAdapter, MountConfig, SourceConfig};
use upfs_kernel::{AccountSource, FundPool, MemorySource, RemoteError, UpFilesystem};

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = MountConfig::from_cli(cli, std::env::var(TOKEN_ENV).ok())
        .context("invalid configuration")?;

    // FUSE callbacks block on this runtime from fuser's session thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("upfs-io")
        .build()
        .context("failed to start tokio runtime")?;

    let source = build_source(&config)?;
    let pool = runtime.block_on(seed_pool(&*source, &config))?;
    tracing::info!(total = %pool.total(), accounts = pool.snapshot().len(), "fund pool seeded");

    let fs = UpFilesystem::new(source, Arc::new(pool));
    let adapter = FuseAdapter::new(Arc::new(fs), runtime.handle().clone(), config.timeout);

    tracing::info!(mountpoint = %config.mountpoint.display(), demo = config.is_demo(), "mounting");
    let options = [
        MountOption::FSName("upfs".to_string()),
        MountOption::NoExec,
        MountOption::NoAtime,
    ];
    fuser::mount2(adapter, &config.mountpoint, &options)
        .with_context(|| format!("failed to mount on {}", config.mountpoint.display()))?;

    tracing::info!("unmounted");
    Ok(())
}

fn build_source(config: &MountConfig) -> Result<Arc<dyn AccountSource>> {
    let source: Arc<dyn AccountSource> = match &config.source {
        SourceConfig::Demo => Arc::new(MemorySource::demo()),
        SourceConfig::Live { token, api_base } => Arc::new(
            UpClient::with_base_url(token.as_str(), api_base.as_str())
                .and_then(|client| {
                    client
                        .with_page_size(config.page_size)
                        .with_timeout(config.timeout)
                })
                .context("failed to build HTTP client")?,
        ),
    };
    Ok(source)
}

/// Check the token, then seed the pool from live balances.
async fn seed_pool(source: &dyn AccountSource, config: &MountConfig) -> Result<FundPool> {
    match source.ping().await {
        Ok(user) => tracing::info!(user = %user, "authorized"),
        Err(RemoteError::NotAuthorized) => bail!("the token is invalid"),
        Err(e) => return Err(e).context("cannot reach the Up API"),
    }

    let accounts = source.accounts().await.context("failed to list accounts")?;
    let funding = config::pool_accounts(&accounts, &config.pool_accounts)?;
    for account in &funding {
        if account.balance.minor() < 0 {
            tracing::warn!(
                account = %account.id,
                balance = %account.balance,
                "overdrawn account contributes nothing"
            );
        }
    }
    Ok(FundPool::from_accounts(&funding))
}
