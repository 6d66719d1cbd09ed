//! Capture cycle and wake word loop integration tests
//!
//! Runs the listener against scripted audio, detector and voice; no audio
//! hardware or network is involved.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use jarvis_desk::assistant::{
    CycleOutcome, DispatchOutcome, ListenerPhase, ListenerRequest, LoopExit, ReadinessGate,
    Transcription, WakeWordLoop, capture_and_dispatch, serve_requests,
};
use jarvis_desk::db::CommandKind;
use jarvis_desk::Error;

mod common;
use common::{
    ScriptedDetector, ScriptedInput, ScriptedVoice, dispatcher, entries, journal,
    setup_test_store,
};

fn store_with_notepad() -> jarvis_desk::CommandRepo {
    let store = setup_test_store();
    store.add(CommandKind::System, "notepad", "notepad").unwrap();
    store
}

#[test]
fn test_capture_failure_is_not_dispatched() {
    let log = journal();
    let d = dispatcher(store_with_notepad(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![Transcription::CaptureFailed]);

    let outcome = capture_and_dispatch(&mut voice, &d);

    assert_eq!(outcome, CycleOutcome::NotHeard);
    assert_eq!(
        entries(&log),
        ["listening", "say:Sorry, I didn't catch that.", "idle"]
    );
}

#[test]
fn test_service_error_is_not_dispatched() {
    let log = journal();
    let d = dispatcher(store_with_notepad(), &log, false);
    let mut voice = ScriptedVoice::new(
        &log,
        vec![Transcription::ServiceError("503".to_string())],
    );

    assert_eq!(capture_and_dispatch(&mut voice, &d), CycleOutcome::NotHeard);
    assert!(!entries(&log).iter().any(|e| e.starts_with("launch:")));
}

#[test]
fn test_empty_transcript_is_silent() {
    let log = journal();
    let d = dispatcher(store_with_notepad(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![Transcription::Text(String::new())]);

    assert_eq!(capture_and_dispatch(&mut voice, &d), CycleOutcome::Empty);
    assert_eq!(entries(&log), ["listening", "idle"]);
}

#[test]
fn test_heard_command_is_dispatched() {
    let log = journal();
    let d = dispatcher(store_with_notepad(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![Transcription::from_transcript("Open Notepad.")]);

    let outcome = capture_and_dispatch(&mut voice, &d);

    assert_eq!(
        outcome,
        CycleOutcome::Dispatched(DispatchOutcome::Launched {
            name: "notepad".to_string()
        })
    );
    assert_eq!(
        entries(&log),
        ["listening", "say:Opening notepad", "launch:notepad", "idle"]
    );
}

#[test]
fn test_wake_word_runs_one_cycle_then_stream_failure_closes() {
    let log = journal();
    let d = dispatcher(store_with_notepad(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![Transcription::Text("open notepad".to_string())]);
    let gate = Arc::new(ReadinessGate::new());
    let (_tx, rx) = crossbeam_channel::unbounded();

    let detector = ScriptedDetector::new(vec![3]);
    let detector_released = Arc::clone(&detector.released);
    let resets = Arc::clone(&detector.resets);

    let input = ScriptedInput::new(5, &gate);
    let input_released = Arc::clone(&input.released);
    let discards = Arc::clone(&input.discards);
    let listening = Arc::clone(&input.listening_during_reads);

    let phases = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::clone(&phases);

    let report = WakeWordLoop::new(detector, &mut voice, &d, Arc::clone(&gate), rx)
        .with_observer(move |p| observed.lock().unwrap().push(p))
        .run(|rate, frame| {
            assert_eq!((rate, frame), (16000, common::TEST_FRAME));
            Ok(input)
        });

    assert!(matches!(report.exit, LoopExit::StreamFailure(_)));
    assert_eq!(report.cycles, 1);
    assert_eq!(voice.chimes, 1);
    assert_eq!(voice.listens, 1);
    assert!(entries(&log).contains(&"launch:notepad".to_string()));

    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(discards.load(Ordering::SeqCst), 1);
    assert!(detector_released.load(Ordering::SeqCst));
    assert!(input_released.load(Ordering::SeqCst));

    // Six reads: five frames then the failing one, all flagged as listening
    assert_eq!(*listening.lock().unwrap(), vec![true; 6]);
    assert!(!gate.is_listening());

    let phases = phases.lock().unwrap();
    assert_eq!(phases.first(), Some(&ListenerPhase::StreamOpen));
    assert_eq!(phases.last(), Some(&ListenerPhase::Closed));
    let triggered = phases
        .iter()
        .position(|p| *p == ListenerPhase::Triggered)
        .unwrap();
    assert_eq!(phases[triggered - 1], ListenerPhase::Listening);
    assert_eq!(phases[triggered + 1], ListenerPhase::StreamOpen);
}

#[test]
fn test_stream_open_failure_releases_detector() {
    let log = journal();
    let d = dispatcher(setup_test_store(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![]);
    let gate = Arc::new(ReadinessGate::new());
    let (_tx, rx) = crossbeam_channel::unbounded();

    let detector = ScriptedDetector::new(vec![]);
    let released = Arc::clone(&detector.released);

    let phases = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::clone(&phases);

    let report = WakeWordLoop::new(detector, &mut voice, &d, gate, rx)
        .with_observer(move |p| observed.lock().unwrap().push(p))
        .run(|_, _| -> jarvis_desk::Result<ScriptedInput> {
            Err(Error::StreamFailure("no input device".to_string()))
        });

    assert_eq!(
        report.exit,
        LoopExit::StreamFailure("audio stream failure: no input device".to_string())
    );
    assert_eq!(report.cycles, 0);
    assert!(released.load(Ordering::SeqCst));
    assert_eq!(*phases.lock().unwrap(), [ListenerPhase::Closed]);
}

#[test]
fn test_shutdown_request_stops_before_reading() {
    let log = journal();
    let d = dispatcher(setup_test_store(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![]);
    let gate = Arc::new(ReadinessGate::new());
    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(ListenerRequest::Shutdown).unwrap();

    let input = ScriptedInput::new(3, &gate);
    let reads = Arc::clone(&input.listening_during_reads);
    let released = Arc::clone(&input.released);

    let report = WakeWordLoop::new(ScriptedDetector::new(vec![]), &mut voice, &d, gate, rx)
        .run(|_, _| Ok(input));

    assert_eq!(report.exit, LoopExit::Shutdown);
    assert!(reads.lock().unwrap().is_empty());
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn test_closed_gate_stops_the_loop() {
    let log = journal();
    let d = dispatcher(setup_test_store(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![]);
    let gate = Arc::new(ReadinessGate::new());
    gate.close();
    let (_tx, rx) = crossbeam_channel::unbounded();

    let input = ScriptedInput::new(3, &gate);
    let report = WakeWordLoop::new(ScriptedDetector::new(vec![]), &mut voice, &d, gate, rx)
        .run(|_, _| Ok(input));

    assert_eq!(report.exit, LoopExit::Shutdown);
}

#[test]
fn test_requests_are_served_between_frames() {
    let log = journal();
    let d = dispatcher(store_with_notepad(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![Transcription::CaptureFailed]);
    let gate = Arc::new(ReadinessGate::new());
    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(ListenerRequest::Text("Open Notepad".to_string())).unwrap();
    tx.send(ListenerRequest::Trigger).unwrap();
    tx.send(ListenerRequest::Shutdown).unwrap();

    let input = ScriptedInput::new(3, &gate);
    let discards = Arc::clone(&input.discards);

    let report = WakeWordLoop::new(ScriptedDetector::new(vec![]), &mut voice, &d, gate, rx)
        .run(|_, _| Ok(input));

    assert_eq!(report.exit, LoopExit::Shutdown);
    assert_eq!(report.cycles, 1);
    assert_eq!(voice.listens, 1);
    assert_eq!(voice.chimes, 1);
    assert_eq!(discards.load(Ordering::SeqCst), 1);
    assert_eq!(
        entries(&log),
        [
            "display:open notepad",
            "say:Opening notepad",
            "launch:notepad",
            "idle",
            "listening",
            "say:Sorry, I didn't catch that.",
            "idle",
        ]
    );
}

#[test]
fn test_mic_button_chimes_like_the_wake_word() {
    let log = journal();
    let d = dispatcher(store_with_notepad(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![Transcription::Text("open notepad".to_string())]);
    let gate = Arc::new(ReadinessGate::new());
    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(ListenerRequest::Trigger).unwrap();
    tx.send(ListenerRequest::Shutdown).unwrap();

    let input = ScriptedInput::new(3, &gate);
    let report = WakeWordLoop::new(ScriptedDetector::new(vec![]), &mut voice, &d, gate, rx)
        .run(|_, _| Ok(input));

    assert_eq!(report.exit, LoopExit::Shutdown);
    assert_eq!(report.cycles, 1);
    assert_eq!((voice.chimes, voice.listens), (1, 1));
    assert_eq!(
        entries(&log),
        ["listening", "say:Opening notepad", "launch:notepad", "idle"]
    );
}

#[test]
fn test_request_loop_without_microphone() {
    let log = journal();
    let d = dispatcher(store_with_notepad(), &log, false);
    let mut voice = ScriptedVoice::new(&log, vec![]);
    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(ListenerRequest::Trigger).unwrap();
    tx.send(ListenerRequest::Text("open notepad".to_string())).unwrap();
    tx.send(ListenerRequest::Text("   ".to_string())).unwrap();
    tx.send(ListenerRequest::Shutdown).unwrap();

    let handled = serve_requests(&mut voice, &d, &rx);

    assert_eq!(handled, 1);
    assert_eq!(voice.listens, 0);
    let log = entries(&log);
    assert_eq!(log[0], "display:Voice input is unavailable.");
    assert!(log.contains(&"launch:notepad".to_string()));
}
