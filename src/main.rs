use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jarvis_desk::assistant::{
    CycleOutcome, Dispatcher, LogPresenter, SharedPresenter, SpeechIo, SystemLauncher,
    dispatch_text,
};
use jarvis_desk::db::{CommandKind, CommandRepo};
use jarvis_desk::voice::{AudioCapture, AudioPlayback, PLAYBACK_SAMPLE_RATE, TextToSpeech, rms_energy};
use jarvis_desk::{Config, Daemon};

/// Jarvis - voice-activated desktop assistant
#[derive(Parser)]
#[command(name = "jarvis", version, about)]
struct Cli {
    /// Port for the UI server (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice features (typed commands only)
    #[arg(long, env = "JARVIS_DISABLE_VOICE")]
    disable_voice: bool,

    /// Don't open the UI in a browser on startup
    #[arg(long)]
    no_browser: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Register a system or web command
    #[command(group(ArgGroup::new("kind").required(true).args(["web", "system"])))]
    AddCommand {
        /// Target is a URL opened in the browser
        #[arg(long)]
        web: bool,
        /// Target is a program line spawned as a process
        #[arg(long)]
        system: bool,
        /// Spoken name, e.g. "notepad"
        name: String,
        /// Program line or URL
        target: String,
    },
    /// List registered commands
    ListCommands,
    /// Dispatch a typed command once, without the UI
    Say {
        /// Command text, e.g. "open notepad"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,jarvis_desk=info",
        1 => "info,jarvis_desk=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::AddCommand {
                web,
                system: _,
                name,
                target,
            } => add_command(web, &name, &target),
            Command::ListCommands => list_commands(),
            Command::Say { text } => say(text.join(" "), cli.disable_voice),
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(text),
            Command::Setup => jarvis_desk::setup::run_setup(),
        };
    }

    let mut config = Config::load_with_options(cli.disable_voice)?;
    if let Some(port) = cli.port {
        config.ui.port = port;
    }
    if cli.no_browser {
        config.ui.open_browser = false;
    }
    tracing::debug!(?config, "loaded configuration");

    let daemon = Daemon::new(config)?;

    let config = daemon.config();
    if config.voice.enabled {
        tracing::info!(
            "jarvis ready - say \"{}\" once the UI is open",
            config.wake_words.join("\" or \"")
        );
    } else {
        tracing::info!("jarvis ready (voice disabled, typed commands only)");
    }

    daemon.run().await?;

    Ok(())
}

/// Run blocking work on a plain thread, away from the async runtime
///
/// Blocking HTTP clients must not be created or dropped inside the runtime.
fn on_thread<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    std::thread::spawn(f)
        .join()
        .map_err(|_| anyhow::anyhow!("worker thread panicked"))?
}

fn open_store() -> anyhow::Result<CommandRepo> {
    let config = Config::load()?;
    Ok(CommandRepo::open(&config.db_path)?)
}

/// Register a command
fn add_command(web: bool, name: &str, target: &str) -> anyhow::Result<()> {
    let kind = if web { CommandKind::Web } else { CommandKind::System };
    let store = open_store()?;
    let entry = store.add(kind, name, target)?;

    println!("{} command \"{}\" -> {}", entry.kind, entry.name, entry.target);
    Ok(())
}

/// Print every registered command
fn list_commands() -> anyhow::Result<()> {
    let store = open_store()?;

    for kind in [CommandKind::System, CommandKind::Web] {
        let entries = store.list(kind)?;
        println!("{kind} commands ({}):", entries.len());
        for entry in entries {
            println!("  {:<20} {}", entry.name, entry.target);
        }
    }

    Ok(())
}

/// Dispatch one typed command and report the outcome
fn say(text: String, disable_voice: bool) -> anyhow::Result<()> {
    let config = Config::load_with_options(disable_voice)?;

    let outcome = on_thread(move || {
        let presenter: SharedPresenter = std::sync::Arc::new(LogPresenter);
        let store = CommandRepo::open(&config.db_path)?;
        let mut voice = SpeechIo::from_config(&config, std::sync::Arc::clone(&presenter));
        let dispatcher = Dispatcher::new(
            store,
            Box::new(SystemLauncher::new()),
            presenter,
            &config.assistant_name,
        );
        Ok(dispatch_text(&mut voice, &dispatcher, &text))
    })?;

    match outcome {
        CycleOutcome::Dispatched(result) => {
            if let Some(e) = result.failure() {
                return Err(e.into());
            }
            println!("{result:?}");
        }
        CycleOutcome::Empty | CycleOutcome::NotHeard => println!("nothing to do"),
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let frequency = 440.0_f32;
    let num_samples = PLAYBACK_SAMPLE_RATE as usize * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {PLAYBACK_SAMPLE_RATE} Hz...", samples.len());
    playback.play(samples)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test TTS output with the configured provider
fn test_tts(text: String) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;

    let mp3_data = on_thread(move || {
        let tts = TextToSpeech::from_config(&config.voice, &config.api_keys)?;
        println!("Synthesizing speech...");
        Ok(tts.synthesize(&text)?)
    })?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    AudioPlayback::new()?.play_mp3(&mp3_data)?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
