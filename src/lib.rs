//! Jarvis Desk - wake-word desktop voice assistant
//!
//! This library provides the core functionality for the assistant:
//! - Voice processing (wake word detection, utterance capture, STT, TTS)
//! - Intent dispatch to system programs, web shortcuts and `YouTube`
//! - A persistent command store
//! - A local web UI that mirrors what the assistant says and hears
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Browser UI (/ws)                    │
//! │   frontend_ready  │  mic  │  command  │  messages   │
//! └────────────────────┬────────────────────────────────┘
//!                      │ broadcast / crossbeam
//! ┌────────────────────▼────────────────────────────────┐
//! │              Listener thread                         │
//! │   Readiness gate │ Wake word loop │ Capture cycle   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Dispatcher                           │
//! │   Command store  │  Processes  │  Browser  │  Media │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod setup;
pub mod ui;
pub mod voice;

pub use assistant::{
    DispatchOutcome, Dispatcher, Intent, ListenerRequest, Presenter, ReadinessGate, Transcription,
};
pub use config::Config;
pub use daemon::Daemon;
pub use db::{CommandKind, CommandRepo, DbConn, DbPool};
pub use error::{Error, Result};
