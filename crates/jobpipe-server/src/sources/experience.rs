//! Entry-level filter applied by every source adapter

use regex::Regex;
use std::sync::OnceLock;

const SENIOR_KEYWORDS: &[&str] = &[
    "senior", "manager", "director", "vp", "principal", "lead", "head", "architect", "partner",
    "chief",
];

const ENTRY_KEYWORDS: &[&str] = &[
    "analyst", "associate", "intern", "trainee", "fresher", "graduate", "entry", "junior",
    "apprentice",
];

fn entry_experience() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b0\s*[-–]\s*[0-2]\s*years?\b|\b1\s*[-–]?\s*[1-2]?\s*years?\b|\bfresher|entry.?level\b")
            .ok()
    })
    .as_ref()
}

fn mentions_entry_experience(text: &str) -> bool {
    entry_experience().is_some_and(|re| re.is_match(text))
}

fn required_experience() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})\s*(?:\+|[-–]\s*\d{1,2})\s*(?:years?|yrs?)\b").ok())
        .as_ref()
}

/// Smallest "N+ years" or "N-M years" minimum found in the text
fn minimum_years(text: &str) -> Option<u32> {
    required_experience()?
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .min()
}

/// Whether a posting looks like a fresher / 0-2 years role.
///
/// Senior title keywords reject, entry title keywords accept. The experience
/// text then accepts on a 0-2 year range and rejects on a stated minimum of
/// three years or more. Anything undecided is kept.
pub fn is_entry_level(title: &str, experience_text: &str) -> bool {
    let title = title.to_lowercase();

    if SENIOR_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        return false;
    }
    if ENTRY_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        return true;
    }
    if mentions_entry_experience(experience_text) {
        return true;
    }

    minimum_years(experience_text).is_none_or(|years| years < 3)
}
