use std::sync::{Arc, Mutex};
use std::time::Duration;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use courtslot::config::AppConfig;
use courtslot::db;
use courtslot::handlers;
use courtslot::services::booking::BookingService;
use courtslot::services::directory::SqliteDirectory;
use courtslot::services::payment::midtrans::MidtransGateway;
use courtslot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let db = Arc::new(Mutex::new(conn));

    if !config.verify_signatures() {
        tracing::warn!(
            "MIDTRANS_SERVER_KEY is not set, notification signatures will not be checked"
        );
    }

    let gateway_timeout = Duration::from_secs(config.gateway_timeout_secs);
    let gateway = MidtransGateway::new(
        config.midtrans_server_key.clone(),
        config.midtrans_base_url.clone(),
        gateway_timeout,
    )?;
    tracing::info!("using Midtrans gateway (url: {})", config.midtrans_base_url);

    let directory = Arc::new(SqliteDirectory::new(db.clone()));
    let bookings = BookingService::new(
        db,
        Arc::new(gateway),
        directory.clone(),
        directory,
        gateway_timeout,
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        bookings,
    });

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
