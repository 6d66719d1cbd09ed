//! Daemon - the desktop assistant service
//!
//! Starts the UI server on the tokio runtime and the listener on its own OS
//! thread. The listener waits for the frontend, then runs the wake word loop;
//! typed commands from the UI are served on the same thread.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::assistant::{
    Dispatcher, Launcher, ListenerRequest, LoopExit, Readiness, ReadinessGate, SharedPresenter,
    SpeechIo, SystemLauncher, Voice, WakeWordLoop, serve_requests,
};
use crate::db::CommandRepo;
use crate::ui::{self, UiPresenter, UiServerBuilder};
use crate::voice::{MicrophoneStream, SpeechToText, TranscriptKeywordDetector};
use crate::{Config, Error, Result};

/// The Jarvis daemon
pub struct Daemon {
    config: Config,
    store: CommandRepo,
    gate: Arc<ReadinessGate>,
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// # Errors
    ///
    /// Returns error if the command store cannot be opened
    pub fn new(config: Config) -> Result<Self> {
        let store = CommandRepo::open(&config.db_path)?;
        tracing::info!(path = %config.db_path.display(), "command store opened");

        Ok(Self {
            config,
            store,
            gate: Arc::new(ReadinessGate::new()),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Gate the listener waits on
    #[must_use]
    pub fn gate(&self) -> Arc<ReadinessGate> {
        Arc::clone(&self.gate)
    }

    /// Run until Ctrl-C or the UI server fails
    ///
    /// # Errors
    ///
    /// Returns error if the UI server fails or the listener thread cannot
    /// be started
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            name = %self.config.assistant_name,
            wake_words = ?self.config.wake_words,
            voice = self.config.voice.enabled,
            "starting assistant"
        );

        let (request_tx, request_rx) = crossbeam_channel::unbounded::<ListenerRequest>();
        let events = ui::event_channel();
        let presenter: SharedPresenter = Arc::new(UiPresenter::new(events.clone()));

        let server = UiServerBuilder::new(
            self.config.ui.port,
            Arc::clone(&self.gate),
            request_tx.clone(),
            self.store.clone(),
        )
        .static_dir(self.config.ui.static_dir.clone())
        .events(events)
        .assistant_name(self.config.assistant_name.clone())
        .voice_enabled(self.config.voice.enabled)
        .build();
        let server_task = server.spawn();

        let index_url = self.config.ui.index_url();
        tracing::info!(url = %index_url, "UI available");

        let listener = spawn_listener(
            self.config.clone(),
            self.store.clone(),
            presenter,
            Arc::clone(&self.gate),
            request_rx,
        )?;

        if self.config.ui.open_browser {
            tokio::task::spawn_blocking(move || {
                if let Err(e) = SystemLauncher::new().open_url(&index_url) {
                    tracing::warn!(error = %e, "could not open the UI in a browser");
                }
            });
        }

        let outcome = tokio::select! {
            joined = server_task => match joined {
                Ok(result) => result,
                Err(e) => Err(Error::Config(format!("UI server task failed: {e}"))),
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                }
                tracing::info!("shutdown requested");
                Ok(())
            }
        };

        stop_listener(&self.gate, &request_tx, listener).await;
        tracing::info!("daemon stopped");
        outcome
    }
}

/// Close the gate, ask the loop to stop, and wait for the thread
async fn stop_listener(
    gate: &ReadinessGate,
    requests: &Sender<ListenerRequest>,
    listener: JoinHandle<()>,
) {
    gate.close();
    let _ = requests.send(ListenerRequest::Shutdown);

    match tokio::task::spawn_blocking(move || listener.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => tracing::error!("listener thread panicked"),
        Err(e) => tracing::error!(error = %e, "failed to join listener thread"),
    }
}

fn spawn_listener(
    config: Config,
    store: CommandRepo,
    presenter: SharedPresenter,
    gate: Arc<ReadinessGate>,
    requests: Receiver<ListenerRequest>,
) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("listener".to_string())
        .spawn(move || run_listener(&config, store, presenter, &gate, &requests))
        .map_err(Error::Io)
}

/// Listener thread body
///
/// Audio devices and blocking HTTP clients are created here, never on the
/// async runtime.
fn run_listener(
    config: &Config,
    store: CommandRepo,
    presenter: SharedPresenter,
    gate: &Arc<ReadinessGate>,
    requests: &Receiver<ListenerRequest>,
) {
    match gate.await_ready_timeout(config.ready_timeout) {
        Readiness::Ready => {}
        Readiness::TimedOut => tracing::warn!("frontend not ready, starting without it"),
        Readiness::Closed => return,
    }

    let mut voice = SpeechIo::from_config(config, Arc::clone(&presenter));
    let dispatcher = Dispatcher::new(
        store,
        Box::new(SystemLauncher::new()),
        presenter,
        &config.assistant_name,
    );

    voice.chime();

    if config.voice.enabled {
        match SpeechToText::from_config(&config.voice, &config.api_keys) {
            Ok(stt) => {
                let detector = TranscriptKeywordDetector::new(config.wake_words.clone(), stt);
                let report = WakeWordLoop::new(
                    detector,
                    &mut voice,
                    &dispatcher,
                    Arc::clone(gate),
                    requests.clone(),
                )
                .run(MicrophoneStream::open);

                if report.exit == LoopExit::Shutdown {
                    return;
                }
                tracing::warn!("wake word listener closed, typed commands still served");
            }
            Err(e) => tracing::warn!(error = %e, "wake word detection unavailable"),
        }
    } else {
        tracing::info!("voice disabled, serving typed commands only");
    }

    serve_requests(&mut voice, &dispatcher, requests);
}
