//! Locating element refs in snapshot text by their visible labels.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

// `[ref=e12]` as well as `ref="e12"` / `ref='e12'`.
static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[ref=([A-Za-z0-9_-]+)\]|\bref=["']([A-Za-z0-9_-]+)["']"#).unwrap()
});

// --- Label tables ---
// English first, then Traditional Chinese. Matching is case-insensitive.
// Button labels carry their role so the inbox nav link ("Messages") and
// input placeholders ("傳送訊息...") don't match.

pub const MESSAGE_BUTTON_LABELS: &[&str] = &[
    "button \"Message\"",
    "button \"發送訊息\"",
    "button \"傳送訊息\"",
];

pub const MESSAGE_INPUT_LABELS: &[&str] = &[
    "textbox \"Message",
    "Message...",
    "Write a message",
    "訊息...",
];

pub const SEND_BUTTON_LABELS: &[&str] = &[
    "button \"Send\"",
    "button \"傳送\"",
    "button \"發送\"",
];

pub const CLOSE_BUTTON_LABELS: &[&str] = &["button \"Close\"", "button \"關閉\""];

pub const POST_TILE_LABELS: &[&str] = &[
    "/p/",
    "/reel/",
    "Photo by",
    "Photo shared by",
    "Video by",
    "May be an image",
    "相片",
    "可能是",
];

/// Ref carried by a single snapshot line, if any.
pub fn line_ref(line: &str) -> Option<String> {
    REF_RE.captures(line).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

fn matches_label(line: &str, labels: &[String]) -> bool {
    let lower = line.to_lowercase();
    labels.iter().any(|label| lower.contains(label.as_str()))
}

fn lowered(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_lowercase()).collect()
}

/// Ref of the first line, top to bottom, that mentions any of `labels` and
/// carries a ref. `None` means the control isn't on the page.
pub fn find_ref(snapshot: &str, labels: &[&str]) -> Option<String> {
    let labels = lowered(labels);
    snapshot
        .lines()
        .filter(|line| matches_label(line, &labels))
        .find_map(line_ref)
}

/// Every distinct matching ref in line order, at most `limit`.
pub fn find_refs(snapshot: &str, labels: &[&str], limit: usize) -> Vec<String> {
    let labels = lowered(labels);
    let mut seen = HashSet::new();
    snapshot
        .lines()
        .filter(|line| matches_label(line, &labels))
        .filter_map(line_ref)
        .filter(|r| seen.insert(r.clone()))
        .take(limit)
        .collect()
}
