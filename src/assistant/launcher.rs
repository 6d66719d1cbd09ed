//! Process, browser and media launching

use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::Launcher;
use crate::{Error, Result};

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""videoId":"([A-Za-z0-9_-]{11})""#).expect("valid regex")
});

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Launches real processes and the platform browser
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, argv: &[&str]) -> Result<()> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::LaunchFailure("empty command".to_string()))?;

        let resolved = which::which(program)
            .map_err(|e| Error::LaunchFailure(format!("{program}: {e}")))?;

        let mut child = Command::new(&resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::LaunchFailure(format!("{program}: {e}")))?;

        tracing::info!(program = %resolved.display(), pid = child.id(), "process launched");

        // Reap the child so it never lingers as a zombie
        std::thread::spawn(move || {
            let _ = child.wait();
        });

        Ok(())
    }

    fn open_url(&self, url: &str) -> Result<()> {
        open_in_browser(url)
    }

    fn play_media(&self, query: &str) -> Result<()> {
        let url = resolve_video_url(query);
        self.open_url(&url)
    }
}

/// `YouTube` results page for `query`
#[must_use]
pub fn youtube_search_url(query: &str) -> String {
    format!(
        "https://www.youtube.com/results?search_query={}",
        urlencoding::encode(query)
    )
}

/// First video id embedded in a `YouTube` results page
#[must_use]
pub fn first_video_id(html: &str) -> Option<String> {
    VIDEO_ID
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Watch URL of the top result, or the results page if it can't be found
fn resolve_video_url(query: &str) -> String {
    let search_url = youtube_search_url(query);

    let page = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()
        .and_then(|client| client.get(&search_url).send())
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::text);

    match page {
        Ok(html) => match first_video_id(&html) {
            Some(id) => format!("https://www.youtube.com/watch?v={id}"),
            None => {
                tracing::warn!(query = %query, "no video in results, opening search page");
                search_url
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "youtube search failed, opening search page");
            search_url
        }
    }
}

fn open_in_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.arg(url);
        c
    };

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    };

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| Error::LaunchFailure(format!("browser: {e}")))?;

    if !status.success() {
        return Err(Error::LaunchFailure(format!("browser opener exited with {status}")));
    }

    tracing::info!(url = %url, "opened in browser");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_is_encoded() {
        assert_eq!(
            youtube_search_url("lofi beats & chill"),
            "https://www.youtube.com/results?search_query=lofi%20beats%20%26%20chill"
        );
    }

    #[test]
    fn video_id_is_taken_from_results_page() {
        let html = r#"{"foo":1,"videoId":"dQw4w9WgXcQ","x":{"videoId":"aaaaaaaaaaa"}}"#;
        assert_eq!(first_video_id(html).as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(first_video_id("<html></html>"), None);
    }

    #[test]
    fn empty_argv_is_a_launch_failure() {
        let result = SystemLauncher::new().launch(&[]);
        assert!(matches!(result, Err(Error::LaunchFailure(_))));
    }

    #[test]
    fn unknown_program_is_a_launch_failure() {
        let result = SystemLauncher::new().launch(&["definitely-not-a-real-program-xyz"]);
        assert!(matches!(result, Err(Error::LaunchFailure(_))));
    }
}
