//! Gateway run command.

use clap::Args;
use fleetgate_core::config::Config;
use fleetgate_gateway::executor::{HttpExecutor, RequestExecutor};
use fleetgate_gateway::tools::{register_builtin, RemoteToolHandler, ToolRegistry};
use fleetgate_gateway::{Gateway, ToolEngine};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Gateway run arguments. Flags override the config file.
#[derive(Args)]
pub struct RunArgs {
    /// Bind mode (loopback, lan)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port number
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Authentication token for non-loopback connections
    #[arg(long, env = "FLEETGATE_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Base URL of the remote fleet API
    #[arg(long, env = "FLEETGATE_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Bearer token for the remote fleet API
    #[arg(long, env = "FLEETGATE_REMOTE_TOKEN")]
    pub remote_token: Option<String>,

    /// Close streams idle longer than this many seconds (0 disables)
    #[arg(long)]
    pub idle_timeout: Option<u64>,
}

/// Start the gateway and block until shutdown completes.
pub async fn run_gateway(config_path: Option<&Path>, args: RunArgs) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(config_path)?;

    if let Some(bind) = args.bind {
        config.gateway.bind = bind.parse()?;
    }
    if let Some(port) = args.port {
        config.gateway.port = port;
    }
    if let Some(token) = args.auth_token {
        config.gateway.auth_token = Some(token);
    }
    if let Some(url) = args.remote_url {
        config.remote.base_url = Some(url);
    }
    if let Some(token) = args.remote_token {
        config.remote.api_token = Some(token);
    }
    if let Some(idle) = args.idle_timeout {
        config.gateway.idle_timeout_secs = idle;
    }
    config.validate()?;

    let tools = Arc::new(ToolRegistry::new());
    register_builtin(&tools).await;

    if let Some(base_url) = config.remote.base_url.clone() {
        info!(remote = %base_url, "registering remote fleet tools");
        let mut executor = HttpExecutor::new(base_url);
        if let Some(token) = config.remote.api_token.clone() {
            executor = executor.with_token(token);
        }
        register_remote_tools(&tools, Arc::new(executor)).await;
    }

    let gateway = Gateway::new(config.gateway.clone(), Arc::new(ToolEngine::new(tools)));
    let report = gateway.run(shutdown_signal()).await?;

    if !report.is_clean() {
        warn!(failed = report.failed, "shutdown left transports unsettled");
        anyhow::bail!(
            "{} transport(s) failed to close within the teardown budget",
            report.failed
        );
    }

    info!("gateway stopped cleanly");
    Ok(())
}

/// Bridge the remote fleet endpoints into the tool table.
async fn register_remote_tools(tools: &Arc<ToolRegistry>, executor: Arc<dyn RequestExecutor>) {
    tools
        .register(
            "device.list",
            Arc::new(RemoteToolHandler::new(executor.clone(), "GET", "/api/devices")),
        )
        .await;
    tools
        .register(
            "device.describe",
            Arc::new(RemoteToolHandler::new(
                executor.clone(),
                "GET",
                "/api/devices/describe",
            )),
        )
        .await;
    tools
        .register(
            "device.restart",
            Arc::new(RemoteToolHandler::new(
                executor,
                "POST",
                "/api/devices/restart",
            )),
        )
        .await;
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
