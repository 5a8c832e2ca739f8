use connsync_dispatcher::{
    Config, Dispatcher, Scheduler, aws,
    db::{PgConnectionStore, PgPoolFactory, SharedResource},
    queue::SqsTaskQueue,
    secrets::{SecretResolver, SecretsManagerStore},
    service::TaskPublisher,
};
use mimalloc::MiMalloc;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        connector_id = cfg.connector_id,
        queue = %cfg.queue_endpoint,
        region = %cfg.region,
        schedule = %cfg.schedule,
        timezone = %cfg.timezone,
        secret_id = %cfg.secret_id,
        loglevel = %cfg.loglevel
    );

    let sdk = aws::sdk_config_loader(&cfg.region, cfg.aws_endpoint.as_ref())
        .load()
        .await;
    let secrets = SecretsManagerStore::new(&sdk, cfg.secret_timeout());

    let resource = Arc::new(SharedResource::new(
        SecretResolver::new(Arc::new(secrets)),
        cfg.secret_id.clone(),
        cfg.db_credentials_group.clone(),
        PgPoolFactory {
            max_connections: cfg.pool_max_connections,
            idle_timeout: cfg.pool_idle_timeout(),
            connect_timeout: cfg.pool_connect_timeout(),
        },
    ));
    let connections = PgConnectionStore::new(resource, cfg.query_timeout());

    let queue = SqsTaskQueue::new(
        &sdk,
        &cfg.queue_endpoint,
        cfg.publish_timeout(),
        cfg.publish_max_retries,
    );
    let deadline = SqsTaskQueue::worst_case(cfg.publish_timeout(), cfg.publish_max_retries);
    let publisher = TaskPublisher::new(Arc::new(queue), deadline, cfg.publish_concurrency);

    let dispatcher = Arc::new(Dispatcher::new(
        cfg.connector_id,
        Arc::new(connections),
        publisher,
    ));
    let scheduler = Scheduler::from_config(&cfg, dispatcher)?;

    scheduler.run_until(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
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
                warn!(error = %e, "failed to listen for SIGTERM");
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
