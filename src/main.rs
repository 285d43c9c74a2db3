use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lsd_coordinator::chain::{ChainClient, ChainOps};
use lsd_coordinator::config::Config;
use lsd_coordinator::factory::FactoryHandle;
use lsd_coordinator::modules::build_registry;
use lsd_coordinator::scheduler::Scheduler;
use lsd_coordinator::wallet::Wallet;

#[derive(Debug, Parser)]
#[command(name = "coordinator", about = "Liquid-staking coordinator daemon")]
struct Cli {
    /// Log transactions instead of broadcasting them.
    #[arg(long)]
    dry_run: bool,

    /// Override the tick period in seconds.
    #[arg(long)]
    checks_period: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut cfg = Config::from_env().context("configuration")?;
    if let Some(period) = cli.checks_period {
        cfg.checks_period_secs = period;
        cfg.validate().context("configuration")?;
    }

    let wallet = Arc::new(Wallet::from_mnemonic(&cfg.mnemonic, &cfg.address_prefix)?);
    info!(address = %wallet.address(), "coordinator wallet loaded");

    let rpc_timeout = Duration::from_secs(cfg.rpc_timeout_secs);
    let hub: Arc<dyn ChainOps> = Arc::new(
        ChainClient::connect(&cfg.hub_rpc, rpc_timeout)?
            .with_signer(
                wallet,
                &cfg.hub_chain_id,
                &cfg.hub_fee_denom,
                cfg.fee_amount(),
                cfg.gas_limit,
            )?
            .with_dry_run(cli.dry_run),
    );
    let target: Arc<dyn ChainOps> = Arc::new(ChainClient::connect(&cfg.target_rpc, rpc_timeout)?);

    let factory = Arc::new(
        FactoryHandle::connect(hub.clone(), &cfg.factory_contract)
            .await
            .context("factory handshake")?,
    );
    let factory_state = factory.state()?;

    let registry = build_registry(&cfg, &factory_state, hub.clone(), target)?;
    info!(
        modules = registry.len(),
        period_secs = cfg.checks_period_secs,
        dry_run = cli.dry_run,
        "starting scheduler"
    );

    let scheduler = Scheduler::new(
        registry,
        hub,
        factory,
        Duration::from_secs(cfg.checks_period_secs),
        &cfg.hub_fee_denom,
    );

    tokio::select! {
        res = scheduler.run() => {
            if let Err(e) = res {
                error!(error = %e, "scheduler stopped");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    Ok(())
}
