//! Assistant core
//!
//! Everything between "a keyword was heard" and "an application opened":
//! the readiness gate, the wake word loop, the capture-and-dispatch cycle
//! and the intent dispatcher. The listener side is synchronous and runs on a
//! dedicated thread; the UI talks to it through [`Presenter`] and a request
//! channel.

mod cycle;
mod dispatcher;
mod intent;
mod launcher;
mod listener;
mod readiness;
mod speech;

use std::sync::Arc;

pub use cycle::{CycleOutcome, capture_and_dispatch, dispatch_text};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use intent::{Intent, IntentRules, extract_search_term, extract_target_name};
pub use launcher::{SystemLauncher, first_video_id, youtube_search_url};
pub use listener::{ListenerPhase, ListenerRequest, LoopExit, LoopReport, WakeWordLoop, serve_requests};
pub use readiness::{ListenerState, Readiness, ReadinessGate};
pub use speech::SpeechIo;

use crate::Result;

/// Spoken when capture or recognition fails
pub const NOT_HEARD_REPLY: &str = "Sorry, I didn't catch that.";

/// Shown while a captured utterance is being transcribed
pub const RECOGNIZING_MESSAGE: &str = "Recognizing...";

/// Presentation-layer signals
///
/// Implementations must not block; the listener thread calls these inline.
pub trait Presenter: Send + Sync {
    /// Show a line of text to the user
    fn display_message(&self, text: &str);

    /// Return the UI to its resting state
    fn show_idle(&self);

    /// The assistant is about to capture an utterance
    fn notify_listening(&self);
}

/// Shared handle to the active presenter
pub type SharedPresenter = Arc<dyn Presenter>;

/// Presenter that only writes to the log, used by CLI commands
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn display_message(&self, text: &str) {
        tracing::info!(message = %text, "display");
    }

    fn show_idle(&self) {
        tracing::debug!("idle");
    }

    fn notify_listening(&self) {
        tracing::debug!("listening");
    }
}

/// Speech output
pub trait Speaker {
    /// Say `text` aloud, blocking until playback ends
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// Result of a single listen attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcription {
    /// Normalized utterance, possibly empty
    Text(String),
    /// Nothing usable was captured before the limits elapsed
    CaptureFailed,
    /// The recognition service rejected or failed the request
    ServiceError(String),
}

impl Transcription {
    /// Wrap a raw transcript, normalizing it for dispatch
    #[must_use]
    pub fn from_transcript(raw: &str) -> Self {
        Self::Text(normalize_utterance(raw))
    }
}

/// Speech input and output together
pub trait Voice: Speaker {
    /// Capture one utterance and transcribe it
    fn listen(&mut self) -> Transcription;

    /// Play the activation sound
    fn chime(&mut self) {}
}

/// Side effects of dispatching: processes, browser tabs, media
pub trait Launcher: Send {
    /// Spawn a detached process; `argv[0]` is the program
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LaunchFailure`] if the process cannot start
    fn launch(&self, argv: &[&str]) -> Result<()>;

    /// Open a URL in the default browser
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LaunchFailure`] if no opener succeeds
    fn open_url(&self, url: &str) -> Result<()>;

    /// Find and start playback of `query` on `YouTube`
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be opened
    fn play_media(&self, query: &str) -> Result<()>;
}

/// Lowercase and trim a transcript, dropping trailing sentence punctuation
#[must_use]
pub fn normalize_utterance(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_lowercase()
}
