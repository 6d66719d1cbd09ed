//! Presentation layer server
//!
//! Serves the browser UI, a WebSocket that carries presenter signals out and
//! user requests in, and a couple of health endpoints.

pub mod health;
pub mod websocket;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use crossbeam_channel::Sender;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use websocket::{UiPresenter, WsIncoming, WsOutgoing};

use crate::Result;
use crate::assistant::{ListenerRequest, ReadinessGate};
use crate::db::CommandRepo;

/// Buffered outbound events per subscriber
const EVENT_CAPACITY: usize = 64;

/// Shared state for UI handlers
#[derive(Clone)]
pub struct UiState {
    pub gate: Arc<ReadinessGate>,
    pub events: broadcast::Sender<WsOutgoing>,
    pub requests: Sender<ListenerRequest>,
    pub store: CommandRepo,
    pub assistant_name: String,
    pub voice_enabled: bool,
}

impl UiState {
    /// Presenter that publishes to every connected browser
    #[must_use]
    pub fn presenter(&self) -> UiPresenter {
        UiPresenter::new(self.events.clone())
    }
}

/// Configuration for building a UI server
pub struct UiServerBuilder {
    port: u16,
    static_dir: Option<PathBuf>,
    gate: Arc<ReadinessGate>,
    requests: Sender<ListenerRequest>,
    store: CommandRepo,
    events: Option<broadcast::Sender<WsOutgoing>>,
    assistant_name: String,
    voice_enabled: bool,
}

impl UiServerBuilder {
    #[must_use]
    pub fn new(
        port: u16,
        gate: Arc<ReadinessGate>,
        requests: Sender<ListenerRequest>,
        store: CommandRepo,
    ) -> Self {
        Self {
            port,
            static_dir: None,
            gate,
            requests,
            store,
            events: None,
            assistant_name: crate::config::DEFAULT_ASSISTANT_NAME.to_string(),
            voice_enabled: false,
        }
    }

    /// Serve static files from this directory, falling back to `index.html`
    #[must_use]
    pub fn static_dir(mut self, dir: PathBuf) -> Self {
        self.static_dir = Some(dir);
        self
    }

    /// Reuse an existing event channel
    #[must_use]
    pub fn events(mut self, events: broadcast::Sender<WsOutgoing>) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    #[must_use]
    pub const fn voice_enabled(mut self, enabled: bool) -> Self {
        self.voice_enabled = enabled;
        self
    }

    #[must_use]
    pub fn build(self) -> UiServer {
        let events = self.events.unwrap_or_else(event_channel);

        UiServer {
            state: Arc::new(UiState {
                gate: self.gate,
                events,
                requests: self.requests,
                store: self.store,
                assistant_name: self.assistant_name,
                voice_enabled: self.voice_enabled,
            }),
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// Create the outbound event channel shared by presenter and server
#[must_use]
pub fn event_channel() -> broadcast::Sender<WsOutgoing> {
    broadcast::channel(EVENT_CAPACITY).0
}

/// UI server
pub struct UiServer {
    state: Arc<UiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl UiServer {
    #[must_use]
    pub fn state(&self) -> Arc<UiState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(websocket::router(self.state.clone()))
            .merge(health::router(self.state.clone()));

        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the UI server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind UI server: {e}")))?;

        tracing::info!(port = self.port, "UI server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("UI server error: {e}")))?;

        Ok(())
    }

    /// Run the UI server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
