use std::path::PathBuf;

use chatterbox_database::Database;
use chatterbox_llm::LlmService;
use chatterbox_utils::protocol::ServerEvent;
use tokio::sync::broadcast;
use tracing::debug;

pub type Error = anyhow::Error;

/// Buffered real-time events per subscriber before it starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Where uploads go and how large they may be.
#[derive(Clone, Debug)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

/// Shared state handed to every request handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub db: Database,
    pub llm: Option<LlmService>,
    pub uploads: UploadSettings,
    events: broadcast::Sender<ServerEvent>,
}

impl AppState {
    pub fn new(db: Database, llm: Option<LlmService>, uploads: UploadSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            db,
            llm,
            uploads,
            events,
        }
    }

    /// Fan an event out to every connected real-time client.
    pub fn publish(&self, event: ServerEvent) {
        // Err only means nobody is listening right now.
        if let Ok(receivers) = self.events.send(event) {
            debug!(receivers, "published real-time event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }
}
