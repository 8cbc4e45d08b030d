mod app;
mod releaser;
mod retention_sweep;

use app::App;
use queue_manager_core::domains::queue::QueueRepository;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "queue_manager=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("queue manager starting");

    let config = shared_config::Config::from_env().expect("failed to load configuration");
    let app = App::bootstrap(config).await?;

    tracing::info!("service graph built, starting background tasks");

    let queues: Arc<dyn QueueRepository> = app.queues.clone();
    let releaser_handle = tokio::spawn(releaser::run(app.queue_engine.clone(), queues.clone()));
    let retention_handle = tokio::spawn(retention_sweep::run(app.retention.clone(), queues));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        },
        result = releaser_handle => {
            tracing::error!(?result, "releaser task exited unexpectedly");
        },
        result = retention_handle => {
            tracing::error!(?result, "retention sweep task exited unexpectedly");
        },
    }

    Ok(())
}
