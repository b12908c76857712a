//! GRE Tunnel Coordinator Daemon Entry Point

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gretun_common::{NetworkInterfaceProvisioner, ShellProvisioner};
use gretun_server::config::DEFAULT_CONFIG_PATH;
use gretun_server::lifecycle::wait_for_signal;
use gretun_server::{ControlServer, LifecycleCoordinator, RegistrationProtocol, ServerConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gretund", version)]
#[command(about = "Hands out GRE tunnels to registering peers", long_about = None)]
struct Args {
    /// Configuration file (built-in defaults are used if it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the control-plane listen address
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Override this host's tunnel endpoint address
    #[arg(long)]
    local_endpoint: Option<IpAddr>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!("gretund failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = ServerConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(local_endpoint) = args.local_endpoint {
        config.local_endpoint = local_endpoint;
    }
    config.validate()?;

    let pool = config.build_pool().into_shared();
    let provisioner: Arc<dyn NetworkInterfaceProvisioner> =
        Arc::new(ShellProvisioner::new(config.use_sudo));
    let protocol = Arc::new(RegistrationProtocol::new(pool.clone(), provisioner.clone()));
    let coordinator = LifecycleCoordinator::new(pool, provisioner);

    let server = ControlServer::bind(config.listen_addr, protocol).await?;
    info!(
        local_endpoint = %config.local_endpoint,
        pool_size = config.tunnels.len(),
        "GRE tunnel server running"
    );

    server
        .run(async move {
            wait_for_signal().await;
            let report = coordinator.shutdown().await;
            if report.is_clean() {
                info!(destroyed = report.destroyed.len(), "All tunnels destroyed");
            } else {
                warn!(failed = ?report.failed, "Some tunnels could not be destroyed");
            }
        })
        .await?;

    info!("gretund exiting");
    Ok(())
}
