use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::models::BookingEvent;
use crate::services::lifecycle::BookingLifecycle;
use crate::services::messaging::MessagingProvider;

const EVENT_BUFFER: usize = 256;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub lifecycle: BookingLifecycle,
    pub messaging: Box<dyn MessagingProvider>,
    pub events_tx: broadcast::Sender<BookingEvent>,
}

impl AppState {
    pub fn new(
        conn: Connection,
        config: AppConfig,
        messaging: Box<dyn MessagingProvider>,
    ) -> anyhow::Result<Self> {
        let lifecycle = BookingLifecycle::from_config(&config)?;
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            lifecycle,
            messaging,
            events_tx,
        })
    }
}
