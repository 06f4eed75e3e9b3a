//! Subcommand implementations.

use aero_client::{ControlPlane, PanelClient};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::applier::NftApplier;
use crate::compiler::RuleCompiler;
use crate::config::AgentConfig;
use crate::scheduler::{SchedulerSettings, SyncScheduler};
use crate::stats::{ProcfsProbe, StatsCollector};
use crate::sysctl;

pub fn load_config(path: &Path) -> Result<AgentConfig> {
    AgentConfig::load(path).with_context(|| format!("cannot start with config {}", path.display()))
}

fn panel_client(config: &AgentConfig) -> Result<PanelClient> {
    PanelClient::builder(&config.panel_url, &config.node_id, &config.token)
        .timeout(config.request_timeout())
        .build()
        .context("failed to build panel client")
}

/// Run the sync loop until Ctrl-C or SIGTERM.
pub async fn run(config_path: &Path, config: &AgentConfig) -> Result<()> {
    info!(
        panel = %config.panel_url,
        node = %config.node_id,
        config = %config_path.display(),
        "configuration loaded"
    );

    sysctl::enable_ip_forward();

    let scheduler = SyncScheduler::new(
        panel_client(config)?,
        NftApplier::new(&config.nft_bin, &config.rules_path).with_timeout(config.apply_timeout()),
        RuleCompiler::new(&config.table_name),
        StatsCollector::new(ProcfsProbe),
        &config.node_id,
        &config.token,
        SchedulerSettings {
            default_interval: config.default_interval(),
            resync_ceiling: config.resync_ceiling(),
        },
    );

    scheduler.run_until(shutdown_signal()).await;
    info!("agent stopped");
    Ok(())
}

/// Load the config and print what the agent would run with.
pub fn validate(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    println!("config:         {}", config_path.display());
    println!("panel:          {}", config.panel_url);
    println!("node:           {}", config.node_id);
    println!("nft binary:     {}", config.nft_bin);
    println!("rules file:     {}", config.rules_path.display());
    println!("table:          ip {}", config.table_name);
    println!("interval:       {}s", config.default_interval_secs);
    println!("resync ceiling: {}s", config.resync_ceiling_secs);
    println!("timeout:        {}s", config.request_timeout_secs);
    println!("apply timeout:  {}s", config.apply_timeout_secs);
    match config.log_file() {
        Some(path) => println!("log file:       {}", path.display()),
        None => println!("log file:       (stdout only)"),
    }
    Ok(())
}

/// Download the node's rules and print the compiled document without loading it.
pub async fn render(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let client = panel_client(&config)?;

    let rules = client
        .fetch_rule_set()
        .await
        .context("failed to download rules")?;
    let document = RuleCompiler::new(&config.table_name).compile(&rules);

    print!("{document}");
    Ok(())
}

/// Sample telemetry over one second and print it as heartbeat JSON.
pub async fn stats() -> Result<()> {
    let mut collector = StatsCollector::new(ProcfsProbe);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let stats = collector.sample();

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C"),
        () = terminate => info!("received SIGTERM"),
    }
}
