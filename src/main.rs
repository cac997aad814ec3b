use std::sync::Arc;

use mediagrab::{AppConfig, AppState, ServerError, YtDlp, router};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "mediagrab=info,tower_http=info".to_string()),
        )
        .init();

    if let Err(error) = run().await {
        eprintln!("Server error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = AppConfig::from_env()?;

    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .map_err(|source| ServerError::CreateDir {
            path: config.download_dir.clone(),
            source,
        })?;

    let engine = YtDlp::new(&config.yt_dlp_bin, &config.download_dir)
        .with_timeout(config.engine_timeout);
    let state = AppState::new(Arc::new(engine), &config);
    let app = router(state, &config.allowed_origins);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;

    info!(
        "Serving on http://{}, downloads in {:?}, {} engine job(s) at a time",
        config.bind_addr, config.download_dir, config.max_concurrent_jobs
    );

    axum::serve(listener, app).await.map_err(ServerError::Serve)
}
