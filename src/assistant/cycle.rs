//! One capture-and-dispatch cycle

use super::dispatcher::{DispatchOutcome, Dispatcher};
use super::{NOT_HEARD_REPLY, Transcription, Voice, normalize_utterance};

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The utterance reached the dispatcher
    Dispatched(DispatchOutcome),
    /// Capture or recognition failed; the user was told
    NotHeard,
    /// Recognition returned an empty transcript
    Empty,
}

/// Listen once and dispatch whatever was said
///
/// Capture and recognition failures are answered with an apology and never
/// reach the dispatcher. An empty transcript is dropped silently.
pub fn capture_and_dispatch<V: Voice>(voice: &mut V, dispatcher: &Dispatcher) -> CycleOutcome {
    let presenter = dispatcher.presenter();
    presenter.notify_listening();

    match voice.listen() {
        Transcription::Text(text) if text.is_empty() => {
            tracing::debug!("empty transcript, nothing to dispatch");
            presenter.show_idle();
            CycleOutcome::Empty
        }
        Transcription::Text(text) => {
            tracing::info!(utterance = %text, "heard");
            CycleOutcome::Dispatched(dispatcher.dispatch(&text, voice))
        }
        Transcription::CaptureFailed => {
            tracing::info!("nothing captured");
            apologize(voice, dispatcher)
        }
        Transcription::ServiceError(e) => {
            tracing::warn!(error = %e, "speech recognition failed");
            apologize(voice, dispatcher)
        }
    }
}

/// Dispatch a typed command, bypassing capture
pub fn dispatch_text<V: Voice>(voice: &mut V, dispatcher: &Dispatcher, text: &str) -> CycleOutcome {
    let utterance = normalize_utterance(text);
    if utterance.is_empty() {
        dispatcher.presenter().show_idle();
        return CycleOutcome::Empty;
    }

    dispatcher.presenter().display_message(&utterance);
    CycleOutcome::Dispatched(dispatcher.dispatch(&utterance, voice))
}

fn apologize<V: Voice>(voice: &mut V, dispatcher: &Dispatcher) -> CycleOutcome {
    if let Err(e) = voice.speak(NOT_HEARD_REPLY) {
        tracing::warn!(error = %e, "speech output failed");
    }
    dispatcher.presenter().show_idle();
    CycleOutcome::NotHeard
}
