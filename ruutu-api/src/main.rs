use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ruutu_api::{app, Config, HighscoreStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ruutu_api=debug")),
        )
        .init();

    let config = Config::parse();

    let store = HighscoreStore::open(&config.db)?;
    info!(db = %config.db.display(), retain = config.retain, "Highscore store ready");

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!(addr = %listener.local_addr()?, "Highscore server listening");
    axum::serve(listener, app(store, config.retain)).await?;
    Ok(())
}
