//! Best-effort parsing of model replies. Nothing here fails: text that does
//! not have the expected shape yields partial or empty results.

use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use tracing::warn;

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#+\s*)?(?:\*\*)?(\d{1,2})\.\s*(.*)$")
        .unwrap_or_else(|e| panic!("numbered pattern: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub items: Vec<String>,
}

impl Section {
    /// Items joined into one line of prose.
    pub fn paragraph(&self) -> String {
        self.items.join(" ")
    }
}

/// Splits text on `1.` .. `max.` markers at the start of a line.
///
/// The rest of the marker line becomes the section title and each following
/// non-blank line an item. Text before the first marker is dropped, as are
/// numbers above `max` (those are treated as ordinary item lines).
pub fn numbered_sections(text: &str, max: u32) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();

    for line in text.lines() {
        let marker = NUMBERED.captures(line).and_then(|caps| {
            let n: u32 = caps[1].parse().ok()?;
            (1..=max).contains(&n).then(|| clean_title(&caps[2]))
        });

        if let Some(title) = marker {
            sections.push(Section { title, items: Vec::new() });
            continue;
        }

        let item = line.trim();
        if item.is_empty() {
            continue;
        }
        if let Some(current) = sections.last_mut() {
            current.items.push(item.to_string());
        }
    }

    sections
}

/// First section whose title contains `needle`, ignoring case.
pub fn find_section<'a>(sections: &'a [Section], needle: &str) -> Option<&'a Section> {
    let needle = needle.to_lowercase();
    sections
        .iter()
        .find(|s| s.title.to_lowercase().contains(&needle))
}

pub fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Deserializes the first JSON value embedded in `text`, tolerating code
/// fences and chatter around it. Falls back to `T::default()`.
///
/// Each `{` or `[` is tried in turn as the start of the value, so brackets
/// in leading prose do not hide the JSON that follows.
pub fn json_or_default<T>(text: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let mut last_error = None;
    for candidate in json_candidates(text) {
        match serde_json::from_str(candidate) {
            Ok(value) => return value,
            Err(e) => last_error = Some(e),
        }
    }

    match last_error {
        Some(e) => warn!(error = %e, "model reply was not the expected JSON"),
        None => warn!("no JSON found in model reply"),
    }
    T::default()
}

/// Spans from each opening bracket to the last matching closing bracket.
fn json_candidates(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices(['{', '[']).filter_map(move |(start, open)| {
        let close = if open == "{" { '}' } else { ']' };
        let end = text.rfind(close)?;
        (end > start).then(|| &text[start..=end])
    })
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .replace("**", "")
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_string()
}
