//! GRE Tunnel Peer Entry Point

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use gretun_client::{discover_local_address, ClientRegistrar, HttpControlPlane, DEFAULT_TIMEOUT};
use gretun_common::control::DEFAULT_CONTROL_PORT;
use gretun_common::{ShellProvisioner, DEFAULT_PREFIX_LEN};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    /// Register with the coordinator and bring the tunnel up
    Reg,
    /// Unregister with the coordinator and tear the tunnel down
    Unreg,
    /// Tear the local tunnel down without contacting the coordinator
    Destroy,
}

#[derive(Parser, Debug)]
#[command(name = "gretun", version)]
#[command(about = "Requests a GRE tunnel from a gretun coordinator", long_about = None)]
struct Args {
    #[arg(value_enum)]
    action: Action,

    /// Coordinator address
    #[arg(short, long, default_value = "10.5.0.18")]
    server: IpAddr,

    /// Coordinator control-plane port
    #[arg(short, long, default_value_t = DEFAULT_CONTROL_PORT)]
    port: u16,

    /// Run `ip` directly instead of through sudo
    #[arg(long)]
    no_sudo: bool,

    /// Prefix length of the tunnel address
    #[arg(long, default_value_t = DEFAULT_PREFIX_LEN)]
    prefix_len: u8,

    /// Control request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!("gretun failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    // Teardown only needs the interface name.
    let local: IpAddr = match args.action {
        Action::Destroy => Ipv4Addr::UNSPECIFIED.into(),
        Action::Reg | Action::Unreg => discover_local_address()?.into(),
    };

    let control = HttpControlPlane::new(
        SocketAddr::new(args.server, args.port),
        Duration::from_secs(args.timeout_secs),
    )?;
    let registrar = ClientRegistrar::new(
        Arc::new(control),
        Arc::new(ShellProvisioner::new(!args.no_sudo)),
        args.server,
        local,
    )
    .with_prefix_len(args.prefix_len);

    match args.action {
        Action::Reg => {
            let address = registrar.register().await?;
            info!(local = %local, address = %address, "Tunnel to {} established", args.server);
        }
        Action::Unreg => registrar.unregister().await?,
        Action::Destroy => registrar.destroy().await?,
    }
    Ok(())
}
