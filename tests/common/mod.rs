//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use jarvis_desk::assistant::{
    Dispatcher, Launcher, Presenter, ReadinessGate, Speaker, Transcription, Voice,
};
use jarvis_desk::db::{self, CommandRepo};
use jarvis_desk::voice::{AudioInput, KeywordDetector};
use jarvis_desk::{Error, Result};

/// Set up an in-memory command store
#[must_use]
pub fn setup_test_store() -> CommandRepo {
    CommandRepo::new(db::init_memory().expect("failed to init test db"))
}

/// Ordered record of everything the assistant did
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Presenter that writes `display:`, `idle` and `listening` entries
pub struct RecordingPresenter(pub Journal);

impl Presenter for RecordingPresenter {
    fn display_message(&self, text: &str) {
        self.0.lock().unwrap().push(format!("display:{text}"));
    }

    fn show_idle(&self) {
        self.0.lock().unwrap().push("idle".to_string());
    }

    fn notify_listening(&self) {
        self.0.lock().unwrap().push("listening".to_string());
    }
}

/// Launcher that writes `launch:`, `url:` and `media:` entries
pub struct RecordingLauncher {
    pub journal: Journal,
    pub fail: bool,
}

impl RecordingLauncher {
    fn record(&self, entry: String) -> Result<()> {
        if self.fail {
            return Err(Error::LaunchFailure("scripted failure".to_string()));
        }
        self.journal.lock().unwrap().push(entry);
        Ok(())
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, argv: &[&str]) -> Result<()> {
        self.record(format!("launch:{}", argv.join("|")))
    }

    fn open_url(&self, url: &str) -> Result<()> {
        self.record(format!("url:{url}"))
    }

    fn play_media(&self, query: &str) -> Result<()> {
        self.record(format!("media:{query}"))
    }
}

/// Voice that replays scripted transcriptions and writes `say:` entries
pub struct ScriptedVoice {
    pub journal: Journal,
    pub heard: VecDeque<Transcription>,
    pub listens: usize,
    pub chimes: usize,
}

impl ScriptedVoice {
    pub fn new(journal: &Journal, heard: Vec<Transcription>) -> Self {
        Self {
            journal: Arc::clone(journal),
            heard: heard.into(),
            listens: 0,
            chimes: 0,
        }
    }
}

impl Speaker for ScriptedVoice {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.journal.lock().unwrap().push(format!("say:{text}"));
        Ok(())
    }
}

impl Voice for ScriptedVoice {
    fn listen(&mut self) -> Transcription {
        self.listens += 1;
        self.heard.pop_front().unwrap_or(Transcription::CaptureFailed)
    }

    fn chime(&mut self) {
        self.chimes += 1;
    }
}

/// Dispatcher over `store` that records into `journal`
pub fn dispatcher(store: CommandRepo, journal: &Journal, launch_fails: bool) -> Dispatcher {
    Dispatcher::new(
        store,
        Box::new(RecordingLauncher {
            journal: Arc::clone(journal),
            fail: launch_fails,
        }),
        Arc::new(RecordingPresenter(Arc::clone(journal))),
        "jarvis",
    )
}

/// Frame length used by the scripted detector and input
pub const TEST_FRAME: usize = 4;

/// Audio input replaying frames, then failing like an unplugged device
pub struct ScriptedInput {
    pub frames: VecDeque<Vec<i16>>,
    pub gate: Arc<ReadinessGate>,
    pub listening_during_reads: Arc<Mutex<Vec<bool>>>,
    pub discards: Arc<AtomicUsize>,
    pub released: Arc<AtomicBool>,
}

impl ScriptedInput {
    pub fn new(frame_count: usize, gate: &Arc<ReadinessGate>) -> Self {
        Self {
            frames: (0..frame_count).map(|_| vec![0; TEST_FRAME]).collect(),
            gate: Arc::clone(gate),
            listening_during_reads: Arc::new(Mutex::new(Vec::new())),
            discards: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl AudioInput for ScriptedInput {
    fn read_frame(&mut self) -> Result<Vec<i16>> {
        self.listening_during_reads
            .lock()
            .unwrap()
            .push(self.gate.is_listening());
        self.frames
            .pop_front()
            .ok_or_else(|| Error::StreamFailure("device unplugged".to_string()))
    }

    fn discard_pending(&mut self) {
        self.discards.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for ScriptedInput {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Detector that fires keyword 0 on chosen frame numbers (1-based)
pub struct ScriptedDetector {
    pub fire_on: Vec<usize>,
    pub seen: usize,
    pub resets: Arc<AtomicUsize>,
    pub released: Arc<AtomicBool>,
}

impl ScriptedDetector {
    pub fn new(fire_on: Vec<usize>) -> Self {
        Self {
            fire_on,
            seen: 0,
            resets: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl KeywordDetector for ScriptedDetector {
    fn sample_rate(&self) -> u32 {
        16000
    }

    fn frame_length(&self) -> usize {
        TEST_FRAME
    }

    fn process(&mut self, frame: &[i16]) -> Result<Option<usize>> {
        assert_eq!(frame.len(), TEST_FRAME);
        self.seen += 1;
        Ok(self.fire_on.contains(&self.seen).then_some(0))
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for ScriptedDetector {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
