//! Intent dispatcher
//!
//! Maps an utterance to an action and reports what happened. Failures are
//! spoken, never propagated: the listener keeps running whatever the
//! outcome.

use super::intent::{Intent, IntentRules};
use super::{Launcher, Presenter, SharedPresenter, Speaker};
use crate::Error;
use crate::db::{CommandKind, CommandRepo};

const LAUNCH_FAILED_REPLY: &str = "Unable to open the app.";
const NOT_FOUND_REPLY: &str = "App not found in system or web commands.";
const LOOKUP_FAILED_REPLY: &str = "Something went wrong!";
const NOT_UNDERSTOOD_REPLY: &str = "Sorry, I couldn't understand the command.";
const MEDIA_FAILED_REPLY: &str = "Sorry, I couldn't play that.";

/// What a dispatch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A `YouTube` search was started
    PlayedMedia { query: String },
    /// Media playback could not be started
    MediaFailed { query: String },
    /// A system command was spawned
    Launched { name: String },
    /// A web command was opened in the browser
    OpenedWeb { name: String },
    /// The command exists but could not be started
    LaunchFailed { name: String },
    /// No system or web command has this name
    NotFound { name: String },
    /// Nothing was left after stripping filler words
    EmptyTarget,
    /// The command store failed
    LookupFailed,
    /// No intent rule matched
    NotUnderstood,
}

impl DispatchOutcome {
    /// The failure this outcome was answered for, if any
    ///
    /// Dispatch never raises; callers that need an error, such as the
    /// one-shot CLI, convert here.
    #[must_use]
    pub fn failure(&self) -> Option<Error> {
        match self {
            Self::PlayedMedia { .. } | Self::Launched { .. } | Self::OpenedWeb { .. } => None,
            Self::MediaFailed { query } => Some(Error::LaunchFailure(format!("media: {query}"))),
            Self::LaunchFailed { name } => Some(Error::LaunchFailure(name.clone())),
            Self::NotFound { name } => Some(Error::LookupMiss(name.clone())),
            Self::EmptyTarget => Some(Error::InvalidCommand("no target given".to_string())),
            Self::LookupFailed => Some(Error::Database("command lookup failed".to_string())),
            Self::NotUnderstood => Some(Error::UnhandledIntent("no rule matched".to_string())),
        }
    }
}

/// Owns the command store and the launcher
pub struct Dispatcher {
    store: CommandRepo,
    launcher: Box<dyn Launcher>,
    presenter: SharedPresenter,
    rules: IntentRules,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        store: CommandRepo,
        launcher: Box<dyn Launcher>,
        presenter: SharedPresenter,
        assistant_name: &str,
    ) -> Self {
        Self {
            store,
            launcher,
            presenter,
            rules: IntentRules::new(assistant_name),
        }
    }

    /// Presenter shared with the rest of the listener
    #[must_use]
    pub fn presenter(&self) -> &dyn Presenter {
        self.presenter.as_ref()
    }

    #[must_use]
    pub const fn store(&self) -> &CommandRepo {
        &self.store
    }

    /// Classify and act on `utterance`, speaking through `speaker`
    ///
    /// The presenter is always returned to idle afterwards.
    pub fn dispatch(&self, utterance: &str, speaker: &mut dyn Speaker) -> DispatchOutcome {
        let intent = self.rules.classify(utterance);
        tracing::debug!(utterance = %utterance, intent = ?intent, "dispatching");

        let outcome = match intent {
            Intent::PlayMedia { query } => self.play_media(query, speaker),
            Intent::OpenTarget { name } => self.open_target(name, speaker),
            Intent::Unhandled => {
                tracing::info!(utterance = %utterance, "command not understood");
                say(speaker, NOT_UNDERSTOOD_REPLY);
                DispatchOutcome::NotUnderstood
            }
        };

        self.presenter.show_idle();
        outcome
    }

    fn play_media(&self, query: String, speaker: &mut dyn Speaker) -> DispatchOutcome {
        if query.is_empty() {
            tracing::debug!("media request without a search term");
            return DispatchOutcome::EmptyTarget;
        }

        say(speaker, &format!("Playing {query} on YouTube"));

        match self.launcher.play_media(&query) {
            Ok(()) => DispatchOutcome::PlayedMedia { query },
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "media playback failed");
                say(speaker, MEDIA_FAILED_REPLY);
                DispatchOutcome::MediaFailed { query }
            }
        }
    }

    fn open_target(&self, name: String, speaker: &mut dyn Speaker) -> DispatchOutcome {
        if name.is_empty() {
            tracing::debug!("open request without a target");
            return DispatchOutcome::EmptyTarget;
        }

        let system = match self.store.find(CommandKind::System, &name) {
            Ok(found) => found,
            Err(e) => return lookup_failed(&e, speaker),
        };

        if let Some(target) = system {
            say(speaker, &format!("Opening {name}"));
            let argv: Vec<&str> = target.split_whitespace().collect();
            return match self.launcher.launch(&argv) {
                Ok(()) => DispatchOutcome::Launched { name },
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "system command failed");
                    say(speaker, LAUNCH_FAILED_REPLY);
                    DispatchOutcome::LaunchFailed { name }
                }
            };
        }

        let web = match self.store.find(CommandKind::Web, &name) {
            Ok(found) => found,
            Err(e) => return lookup_failed(&e, speaker),
        };

        if let Some(url) = web {
            say(speaker, &format!("Opening {name}"));
            return match self.launcher.open_url(&url) {
                Ok(()) => DispatchOutcome::OpenedWeb { name },
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "web command failed");
                    say(speaker, LAUNCH_FAILED_REPLY);
                    DispatchOutcome::LaunchFailed { name }
                }
            };
        }

        tracing::info!(name = %name, "no command with this name");
        say(speaker, NOT_FOUND_REPLY);
        DispatchOutcome::NotFound { name }
    }
}

fn lookup_failed(error: &Error, speaker: &mut dyn Speaker) -> DispatchOutcome {
    tracing::error!(error = %error, "command lookup failed");
    say(speaker, LOOKUP_FAILED_REPLY);
    DispatchOutcome::LookupFailed
}

/// Speak, logging instead of failing
fn say(speaker: &mut dyn Speaker, text: &str) {
    if let Err(e) = speaker.speak(text) {
        tracing::warn!(error = %e, text = %text, "speech output failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::Result;
    use crate::assistant::LogPresenter;
    use crate::db;

    #[derive(Default)]
    struct Recorded {
        launched: Vec<Vec<String>>,
        opened: Vec<String>,
    }

    struct FakeLauncher(Arc<Mutex<Recorded>>);

    impl Launcher for FakeLauncher {
        fn launch(&self, argv: &[&str]) -> Result<()> {
            let argv = argv.iter().map(ToString::to_string).collect();
            self.0.lock().unwrap().launched.push(argv);
            Ok(())
        }

        fn open_url(&self, url: &str) -> Result<()> {
            self.0.lock().unwrap().opened.push(url.to_string());
            Ok(())
        }

        fn play_media(&self, query: &str) -> Result<()> {
            self.open_url(&format!("media:{query}"))
        }
    }

    #[derive(Default)]
    struct Transcript(Vec<String>);

    impl Speaker for Transcript {
        fn speak(&mut self, text: &str) -> Result<()> {
            self.0.push(text.to_string());
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let store = CommandRepo::new(db::init_memory().unwrap());
        store
            .add(CommandKind::System, "editor", "gedit --new-window")
            .unwrap();
        let d = Dispatcher::new(
            store,
            Box::new(FakeLauncher(Arc::clone(&recorded))),
            Arc::new(LogPresenter),
            "jarvis",
        );
        (d, recorded)
    }

    #[test]
    fn system_command_is_split_into_argv() {
        let (d, recorded) = dispatcher();
        let mut speech = Transcript::default();

        let outcome = d.dispatch("jarvis open editor", &mut speech);

        assert_eq!(outcome, DispatchOutcome::Launched { name: "editor".to_string() });
        assert_eq!(speech.0, ["Opening editor"]);
        assert_eq!(recorded.lock().unwrap().launched, [["gedit", "--new-window"]]);
    }

    #[test]
    fn empty_media_query_does_nothing() {
        let (d, recorded) = dispatcher();
        let mut speech = Transcript::default();

        assert_eq!(d.dispatch("play on youtube", &mut speech), DispatchOutcome::EmptyTarget);
        assert!(speech.0.is_empty());
        assert!(recorded.lock().unwrap().opened.is_empty());
    }

    #[test]
    fn failures_map_to_error_kinds() {
        assert!(DispatchOutcome::Launched { name: "editor".to_string() }.failure().is_none());
        assert!(matches!(
            DispatchOutcome::NotFound { name: "spotify".to_string() }.failure(),
            Some(Error::LookupMiss(name)) if name == "spotify"
        ));
        assert!(matches!(
            DispatchOutcome::NotUnderstood.failure(),
            Some(Error::UnhandledIntent(_))
        ));
    }
}
