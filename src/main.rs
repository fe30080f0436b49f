use dotenv::dotenv;
use kubetask::config::Config;
use kubetask::kubernetes::{DryRunLauncher, KubectlLauncher, Launcher};
use kubetask::{definitions, loader, TaskRegistry, TaskScheduler};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::init();
    let registry = TaskRegistry::new();

    // Built-in definitions first; the scan path never removes them.
    let mut pinned = Vec::new();
    for descriptor in definitions::builtin_tasks()? {
        pinned.push(descriptor.identifier.clone());
        registry.register(descriptor).await?;
    }

    // Initial scan of the definitions directory.
    let definitions_dir = PathBuf::from(&config.definitions_dir);
    loader::sync_definitions(&definitions_dir, &registry, &pinned).await?;

    let launcher: Arc<dyn Launcher> = if config.dry_run {
        info!("🧪 Dry-run mode: manifests are rendered but not submitted");
        Arc::new(DryRunLauncher::new())
    } else {
        Arc::new(KubectlLauncher::new(&config.kubectl_bin))
    };

    let scheduler = TaskScheduler::new(registry.clone(), launcher);
    scheduler.start(Duration::from_secs(config.tick_seconds));

    // Periodic rescan keeps the registry in line with the scan path.
    {
        let registry = registry.clone();
        let pinned = pinned.clone();
        let rescan = Duration::from_secs(config.rescan_seconds);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(rescan);
            ticker.tick().await; // the initial scan already happened
            loop {
                ticker.tick().await;
                if let Err(e) =
                    loader::sync_definitions(&definitions_dir, &registry, &pinned).await
                {
                    error!("❌ Definition rescan failed: {}", e);
                }
            }
        });
    }

    println!("🚀 kubetask started");
    println!("📂 Definitions directory: {}", config.definitions_dir);
    println!("📋 Registered tasks: {}", registry.len().await);
    for task in registry.list().await {
        println!(
            "   - {} (owner: {}, namespace: {}, trigger: {:?})",
            task.identifier, task.owner, task.target_namespace, task.trigger
        );
    }

    tokio::signal::ctrl_c().await?;
    info!("👋 Shutting down");

    Ok(())
}
