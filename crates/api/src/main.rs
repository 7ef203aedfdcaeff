use leadsync_api::{build_router, AppContext};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = leadsync_infra::config::load()?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let ctx = AppContext::new(config)?;
    let mut worker = ctx.make_worker();
    worker.start().await?;

    let app = build_router(ctx);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "leadsync listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    worker.stop().await?;
    tracing::info!("leadsync shut down");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown signal handler");
    }
    tracing::info!("shutdown signal received");
}
