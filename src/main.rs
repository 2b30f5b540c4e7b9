use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use signal_desk::api::routes::{router, ApiState};
use signal_desk::config::Config;
use signal_desk::db::SignalStore;
use signal_desk::engine::RandomModel;
use signal_desk::error::Result;
use signal_desk::telegram;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let store = SignalStore::connect(&cfg.db_path).await?;

    // --- Companion bot ---
    match cfg.telegram_token.clone() {
        Some(token) => {
            let webapp_url = cfg.webapp_url.clone();
            tokio::spawn(async move { telegram::run_bot(token, webapp_url).await });
        }
        None => warn!("TELEGRAM_BOT_TOKEN not set, companion bot disabled"),
    }

    // --- HTTP API server ---
    let api_state = ApiState::new(store, Arc::new(RandomModel::new()));
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
