use medical_report_service::{
    AppState, ServiceConfig, build_oracle, build_router, init_tracing, spawn_session_sweeper,
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    init_tracing(&config.log_format);

    // One oracle handle for the whole process; it is read-only and shared by all requests
    let oracle = build_oracle(&config)?;

    let state = AppState::new(oracle);
    spawn_session_sweeper(state.session_storage.clone(), config.session_ttl);
    let app = build_router(state);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    let addr = listener.local_addr()?;

    info!("Medical Report Analyzer starting on {}", addr);
    info!("Browser UI: http://{}/", addr);
    info!("API description: http://{}/api", addr);
    info!("Health check endpoint: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
