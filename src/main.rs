use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use medidirect::config::AppConfig;
use medidirect::db;
use medidirect::services::messaging::twilio::TwilioSmsProvider;
use medidirect::services::messaging::{MessagingProvider, NoopMessaging};
use medidirect::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;

    let mut conn = db::init_db(&config.database_url)?;
    if let Some(seed) = &config.directory_seed {
        db::directory::import_directory_file(&mut conn, Path::new(seed))?;
    }

    let messaging: Box<dyn MessagingProvider> = if config.twilio_configured() {
        tracing::info!("sending booking notifications via Twilio");
        Box::new(TwilioSmsProvider::from_config(&config))
    } else {
        tracing::info!("Twilio not configured, booking notifications are logged only");
        Box::new(NoopMessaging)
    };

    let state = Arc::new(AppState::new(conn, config.clone(), messaging)?);
    let app = medidirect::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
