//! Wake word loop
//!
//! Owns the audio stream and keyword detector on the listener thread. Both
//! are locals of [`WakeWordLoop::run`], so they are released on every exit
//! path.

use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};

use super::cycle::{CycleOutcome, capture_and_dispatch, dispatch_text};
use super::dispatcher::Dispatcher;
use super::readiness::ReadinessGate;
use super::Voice;
use crate::Result;
use crate::voice::{AudioInput, KeywordDetector};

/// Requests from the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerRequest {
    /// Run a capture cycle as if a wake word fired
    Trigger,
    /// Dispatch typed text
    Text(String),
    /// Stop the loop
    Shutdown,
}

/// Wake word loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPhase {
    Idle,
    StreamOpen,
    Listening,
    Triggered,
    Closed,
}

/// Why the loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// Shutdown was requested
    Shutdown,
    /// The stream or detector failed
    StreamFailure(String),
}

/// Summary returned when the loop ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    pub exit: LoopExit,
    /// Capture cycles run, whether by wake word or request
    pub cycles: usize,
}

type Observer = Box<dyn FnMut(ListenerPhase) + Send>;

/// Clears the listening flag when dropped
struct ListeningGuard<'a>(&'a ReadinessGate);

impl<'a> ListeningGuard<'a> {
    fn new(gate: &'a ReadinessGate) -> Self {
        gate.set_listening(true);
        Self(gate)
    }
}

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.set_listening(false);
    }
}

/// Keyword-triggered listener
///
/// Borrows the voice and dispatcher so the caller can keep serving typed
/// commands after the stream closes.
pub struct WakeWordLoop<'a, D, V> {
    detector: D,
    voice: &'a mut V,
    dispatcher: &'a Dispatcher,
    gate: Arc<ReadinessGate>,
    requests: Receiver<ListenerRequest>,
    phase: ListenerPhase,
    cycles: usize,
    observer: Option<Observer>,
}

impl<'a, D: KeywordDetector, V: Voice> WakeWordLoop<'a, D, V> {
    #[must_use]
    pub fn new(
        detector: D,
        voice: &'a mut V,
        dispatcher: &'a Dispatcher,
        gate: Arc<ReadinessGate>,
        requests: Receiver<ListenerRequest>,
    ) -> Self {
        Self {
            detector,
            voice,
            dispatcher,
            gate,
            requests,
            phase: ListenerPhase::Idle,
            cycles: 0,
            observer: None,
        }
    }

    /// Called on every phase transition
    #[must_use]
    pub fn with_observer(mut self, observer: impl FnMut(ListenerPhase) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    #[must_use]
    pub const fn phase(&self) -> ListenerPhase {
        self.phase
    }

    /// Open the stream with `open` and listen until shutdown or failure
    ///
    /// `open` receives the detector's sample rate and frame length. The
    /// loop consumes itself; the detector and stream are dropped before this
    /// returns.
    pub fn run<I, F>(mut self, open: F) -> LoopReport
    where
        I: AudioInput,
        F: FnOnce(u32, usize) -> Result<I>,
    {
        let sample_rate = self.detector.sample_rate();
        let frame_length = self.detector.frame_length();

        let mut stream = match open(sample_rate, frame_length) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "failed to open audio stream");
                return self.finish(LoopExit::StreamFailure(e.to_string()));
            }
        };
        self.transition(ListenerPhase::StreamOpen);
        tracing::info!(sample_rate, frame_length, "listening for wake word");

        loop {
            if let Some(exit) = self.drain_requests(&mut stream) {
                return self.finish(exit);
            }
            if self.gate.is_closed() {
                return self.finish(LoopExit::Shutdown);
            }

            self.transition(ListenerPhase::Listening);
            let frame = {
                let _listening = ListeningGuard::new(&self.gate);
                stream.read_frame()
            };

            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "audio stream failed");
                    return self.finish(LoopExit::StreamFailure(e.to_string()));
                }
            };

            if frame.len() != frame_length {
                tracing::warn!(got = frame.len(), expected = frame_length, "short frame skipped");
                self.transition(ListenerPhase::StreamOpen);
                continue;
            }

            match self.detector.process(&frame) {
                Ok(Some(index)) => {
                    tracing::info!(keyword = index, "wake word fired");
                    self.voice.chime();
                    self.triggered_cycle(&mut stream);
                }
                Ok(None) => self.transition(ListenerPhase::StreamOpen),
                Err(e) => {
                    tracing::error!(error = %e, "keyword detector failed");
                    return self.finish(LoopExit::StreamFailure(e.to_string()));
                }
            }
        }
    }

    /// Handle queued requests; returns an exit if shutdown was asked for
    fn drain_requests<I: AudioInput>(&mut self, stream: &mut I) -> Option<LoopExit> {
        loop {
            match self.requests.try_recv() {
                Ok(ListenerRequest::Shutdown) => return Some(LoopExit::Shutdown),
                Ok(ListenerRequest::Trigger) => {
                    self.voice.chime();
                    self.triggered_cycle(stream);
                }
                Ok(ListenerRequest::Text(text)) => {
                    let outcome = dispatch_text(self.voice, self.dispatcher, &text);
                    tracing::debug!(outcome = ?outcome, "text command handled");
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    fn triggered_cycle<I: AudioInput>(&mut self, stream: &mut I) {
        self.transition(ListenerPhase::Triggered);
        self.cycles += 1;

        let outcome = capture_and_dispatch(self.voice, self.dispatcher);
        tracing::debug!(outcome = ?outcome, "cycle finished");

        // Audio queued while the cycle ran belongs to the command, not to
        // the next wake word
        stream.discard_pending();
        self.detector.reset();
        self.transition(ListenerPhase::StreamOpen);
    }

    fn transition(&mut self, phase: ListenerPhase) {
        if self.phase == phase {
            return;
        }
        tracing::trace!(from = ?self.phase, to = ?phase, "listener transition");
        self.phase = phase;
        if let Some(observer) = self.observer.as_mut() {
            observer(phase);
        }
    }

    fn finish(mut self, exit: LoopExit) -> LoopReport {
        self.transition(ListenerPhase::Closed);
        self.gate.set_listening(false);
        tracing::info!(exit = ?exit, cycles = self.cycles, "listener stopped");
        LoopReport {
            exit,
            cycles: self.cycles,
        }
    }
}

/// Serve UI requests without a microphone
///
/// Typed commands are dispatched; capture requests are answered with a
/// message since there is no audio input.
pub fn serve_requests<V: Voice>(
    voice: &mut V,
    dispatcher: &Dispatcher,
    requests: &Receiver<ListenerRequest>,
) -> usize {
    let mut handled = 0;

    while let Ok(request) = requests.recv() {
        match request {
            ListenerRequest::Shutdown => break,
            ListenerRequest::Trigger => {
                dispatcher.presenter().display_message("Voice input is unavailable.");
                dispatcher.presenter().show_idle();
            }
            ListenerRequest::Text(text) => {
                if matches!(
                    dispatch_text(voice, dispatcher, &text),
                    CycleOutcome::Dispatched(_)
                ) {
                    handled += 1;
                }
            }
        }
    }

    tracing::info!(handled, "request loop stopped");
    handled
}
