//! Intent classification
//!
//! An ordered rule table: the first predicate that matches decides the
//! intent, so media requests win over "open" even when both words appear.

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Play something on `YouTube`
    PlayMedia { query: String },
    /// Launch an application or website by name
    OpenTarget { name: String },
    /// Nothing matched
    Unhandled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntentKind {
    PlayMedia,
    OpenTarget,
}

struct Rule {
    name: &'static str,
    matches: fn(&str) -> bool,
    kind: IntentKind,
}

/// Ordered classification rules
pub struct IntentRules {
    rules: Vec<Rule>,
    assistant_name: String,
}

impl IntentRules {
    /// Default rule set for an assistant called `assistant_name`
    #[must_use]
    pub fn new(assistant_name: &str) -> Self {
        let rules = vec![
            Rule {
                name: "media",
                matches: |u| u.contains("on youtube"),
                kind: IntentKind::PlayMedia,
            },
            Rule {
                name: "open",
                matches: |u| u.contains("open"),
                kind: IntentKind::OpenTarget,
            },
        ];

        Self {
            rules,
            assistant_name: assistant_name.trim().to_lowercase(),
        }
    }

    /// Classify an utterance
    #[must_use]
    pub fn classify(&self, utterance: &str) -> Intent {
        let lowered = utterance.to_lowercase();

        let Some(rule) = self.rules.iter().find(|r| (r.matches)(&lowered)) else {
            return Intent::Unhandled;
        };
        tracing::debug!(rule = rule.name, "intent rule matched");

        match rule.kind {
            IntentKind::PlayMedia => Intent::PlayMedia {
                query: extract_search_term(&lowered, &self.assistant_name),
            },
            IntentKind::OpenTarget => Intent::OpenTarget {
                name: extract_target_name(&lowered, &self.assistant_name),
            },
        }
    }
}

/// Words dropped from the front of a media request
const MEDIA_FILLERS: &[&str] = &["play", "search", "for", "please"];

/// Pull the search term out of a "... on youtube" request
///
/// The assistant name is removed wherever it appears. The term is what
/// follows the last "play" or "search (for)" before "on youtube"; without
/// such a verb, leading filler words are stripped instead. "hey jarvis play
/// lofi beats on youtube" becomes "lofi beats".
#[must_use]
pub fn extract_search_term(utterance: &str, assistant_name: &str) -> String {
    let tokens = tokenize(utterance);
    let name = tokenize(assistant_name);
    let words = without_name(&tokens, &name);

    let end = words
        .windows(2)
        .rposition(|w| w[0] == "on" && w[1] == "youtube")
        .unwrap_or(words.len());
    let request = &words[..end];

    let after_verb = request
        .iter()
        .rposition(|w| *w == "play" || *w == "search")
        .map(|i| {
            let mut rest = &request[i + 1..];
            if request[i] == "search" && rest.first() == Some(&"for") {
                rest = &rest[1..];
            }
            rest
        })
        .filter(|rest| !rest.is_empty());

    let term = after_verb.unwrap_or_else(|| {
        let skip = request
            .iter()
            .take_while(|w| MEDIA_FILLERS.contains(w))
            .count();
        &request[skip..]
    });

    term.join(" ")
}

/// Pull the target name out of an "open ..." request
///
/// Every occurrence of the assistant name and the word "open" is removed,
/// so "open jarvis open calculator" becomes "calculator".
#[must_use]
pub fn extract_target_name(utterance: &str, assistant_name: &str) -> String {
    let tokens = tokenize(utterance);
    let name = tokenize(assistant_name);

    without_name(&tokens, &name)
        .into_iter()
        .filter(|w| *w != "open")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokens with every occurrence of the `name` sequence removed
fn without_name<'a>(tokens: &'a [String], name: &[String]) -> Vec<&'a str> {
    let mut kept = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if !name.is_empty() && tokens[i..].starts_with(name) {
            i += name.len();
            continue;
        }
        kept.push(tokens[i].as_str());
        i += 1;
    }
    kept
}

/// Lowercase words with surrounding sentence punctuation removed
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| matches!(c, ',' | '.' | '!' | '?' | ';' | ':' | '"'))
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}
