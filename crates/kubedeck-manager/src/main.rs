#![warn(missing_docs)]

use anyhow::Result;
use clap::Parser;
use kubedeck_catalog::CatalogRegistry;
use kubedeck_manager::cli::{Cli, Command};
use kubedeck_manager::{
    catalog_entity_from_cluster, AgentConfig, ClusterManager, NetworkNotifier, SessionMap,
};
use kubedeck_store::ClusterStore;
use std::path::Path;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_missing) = AgentConfig::load_or_default(&cli.config)?;

    let filter = match config.log_filter.as_deref() {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    tracing::info!("kubedeck manager agent starting...");
    if config_missing {
        tracing::warn!(
            "Config file not found, using defaults: {}",
            cli.config.display()
        );
    }

    match &cli.command {
        Command::Run => run_agent(config).await,
        Command::CheckConfig => check_config(&cli.config, &config),
    }
}

async fn run_agent(config: AgentConfig) -> Result<()> {
    let store = Arc::new(ClusterStore::new());
    let catalog = Arc::new(CatalogRegistry::new());
    let sessions = Arc::new(SessionMap::new());

    let seeded = config.seed_store(&store);
    for id in &seeded {
        if let Some(record) = store.get(id) {
            catalog.add(catalog_entity_from_cluster(&record));
        }
    }
    tracing::info!(clusters = seeded.len(), "cluster store seeded");

    let manager_config = config.manager_config();
    let notifier = NetworkNotifier::new(manager_config.network_channel_capacity);
    let manager = ClusterManager::new(store, catalog, sessions, manager_config);
    let handle = manager.start(notifier.subscribe());

    // SIGUSR1 and SIGUSR2 stand in for the host's connectivity watcher:
    // they feed offline and online transitions into the manager.
    let mut offline = signal(SignalKind::user_defined1())?;
    let mut online = signal(SignalKind::user_defined2())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = interrupt.recv() => break,
            _ = terminate.recv() => break,
            _ = offline.recv() => {
                notifier.notify_offline();
            }
            _ = online.recv() => {
                notifier.notify_online();
            }
        }
    }

    tracing::info!("shutdown signal received");
    handle.shutdown().await?;
    Ok(())
}

fn check_config(path: &Path, config: &AgentConfig) -> Result<()> {
    println!("Config: {}", path.display());
    println!("Removal linger: {} ms", config.removal_linger_ms);
    println!("Network channel capacity: {}", config.network_channel_capacity);
    println!("Clusters: {}", config.clusters.len());

    for seed in &config.clusters {
        println!(
            "  {:<24} context={} kubeconfig={}",
            seed.name.as_deref().unwrap_or("(unnamed)"),
            seed.context,
            seed.kubeconfig_path.display()
        );
    }

    Ok(())
}
