//! Heuristic text extraction over game-bot catch notifications.
//!
//! Everything here is pure: the same payload always yields the same hint and
//! subject. The pattern set is fixed:
//!
//! - member reference: `<@id>` or `<@!id>`
//! - fallback name: `Congratulations <name>` (case-insensitive)
//! - subject: `caught [a] [Level N] <name>` up to a line break, `:`, `(`, `!`
//!   or `<` (case-insensitive)
//! - classification: the whole word `caught` or `congratulations`

use std::sync::OnceLock;

use locker_core::{EmbedText, UserId};
use regex::Regex;

/// Subject reported when a notification does not name what was caught.
pub const CATCH_SUBJECT_FALLBACK: &str = "a Pokémon";

fn member_reference_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"<@!?(\d+)>").expect("member reference regex"))
}

fn congratulations_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)Congratulations\s+([^\s!,:]+)").expect("congratulations regex")
    })
}

fn subject_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)caught(?: a)?(?: Level \d+)?\s+([^\n:(!<]+)").expect("subject regex")
    })
}

fn catch_keyword_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\b(caught|congratulations)\b").expect("catch keyword regex")
    })
}

fn angle_markup_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("angle markup regex"))
}

fn short_code_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r":[^:\s>]+:").expect("short code regex"))
}

fn stray_punctuation_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"[^\w\s\-']+").expect("stray punctuation regex"))
}

/// Joins the message body with every embed's title, description and field
/// name/value pairs, space-separated in traversal order. Absent parts are
/// skipped; an empty body still leads the result.
pub fn combined_text(content: &str, embeds: &[EmbedText]) -> String {
    let mut combined = content.to_string();
    for embed in embeds {
        if let Some(title) = embed.title.as_deref().filter(|value| !value.is_empty()) {
            combined.push(' ');
            combined.push_str(title);
        }
        if let Some(description) = embed
            .description
            .as_deref()
            .filter(|value| !value.is_empty())
        {
            combined.push(' ');
            combined.push_str(description);
        }
        for (name, value) in &embed.fields {
            combined.push(' ');
            combined.push_str(name);
            combined.push(' ');
            combined.push_str(value);
        }
    }
    combined
}

/// First direct member reference in `text`.
pub fn extract_identity_hint(text: &str) -> Option<UserId> {
    member_reference_regex()
        .captures_iter(text)
        .find_map(|captures| captures.get(1)?.as_str().parse::<u64>().ok())
        .map(UserId::new)
}

/// Name following "Congratulations", used when no member reference exists.
pub fn extract_fallback_name(text: &str) -> Option<String> {
    congratulations_regex()
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

pub fn extract_subject_name(text: &str) -> String {
    let Some(raw) = subject_regex()
        .captures(text)
        .and_then(|captures| captures.get(1))
    else {
        return CATCH_SUBJECT_FALLBACK.to_string();
    };
    let cleaned = angle_markup_regex().replace_all(raw.as_str().trim(), "");
    let cleaned = short_code_regex().replace_all(&cleaned, "");
    let cleaned = stray_punctuation_regex().replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// True when `text` reads like a catch notification. Callers must also check
/// that the author is the game-bot.
pub fn is_catch_text(text: &str) -> bool {
    catch_keyword_regex().is_match(text)
}
