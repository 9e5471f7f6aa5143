//! Profile extraction from accessibility-tree snapshots.
//!
//! Each field has its own extractor with its own fallbacks. A miss in one
//! never affects another, and a miss is never an error: the field keeps its
//! default.

use std::sync::LazyLock;

use regex::Regex;
use salonscout_common::ExtractedProfile;
use url::Url;

use crate::counts::parse_count;
use crate::refs::line_ref;

// A count mantissa with an optional multiplier: "1,234", "8.9K", "60.3萬".
const NUM: &str = r"(\d[\d,.]*\s*[KkMm萬万]?)";

// English patterns come before Chinese ones. When a snapshot carries both,
// the first pattern in the list that matches anywhere decides the count.
static FOLLOWER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(&format!(r"(?i){NUM}\s+followers\b")).unwrap(),
        Regex::new(&format!(r"{NUM}\s*位?追蹤者")).unwrap(),
    ]
});
static FOLLOWING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(&format!(r"(?i){NUM}\s+following\b")).unwrap(),
        Regex::new(&format!(r"追蹤中\s*{NUM}")).unwrap(),
        Regex::new(&format!(r"{NUM}\s*人\s*追蹤中")).unwrap(),
    ]
});
static POST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(&format!(r"(?i){NUM}\s+posts?\b")).unwrap(),
        Regex::new(&format!(r"{NUM}\s*篇貼文")).unwrap(),
    ]
});

static BIOGRAPHY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)biography\s*[:：]\s*"?([^"\n]+)"?"#).unwrap());
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"heading\s*:?\s*"([^"\n]+)""#).unwrap());
static CAPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:caption|說明|貼文)\s*[:：]\s*"?([^"\n]+)"?"#).unwrap()
});
static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:category|類別)\s*[:：]\s*"?([^"\n]+)"?"#).unwrap());
static EXTERNAL_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:website|external link|/url)\s*[:：]\s*"?(https?://[^\s"\]]+)"#).unwrap()
});
static AUTHOR_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)/url:\s*"?/([A-Za-z0-9._]{1,30})/?"?\s*$"#).unwrap()
});
// "Line" the messaging app, not "online" or "deadline".
static LINE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^a-z])line(?:[^a-z]|$)").unwrap());
static AUTHOR_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"instagram\.com/([A-Za-z0-9._]{1,30})(?:[/?"\s\]]|$)"#).unwrap()
});

/// Tokens that mark a line as probably being the biography.
pub const BIO_TOKENS: &[&str] = &[
    "📍", "✂", "💇", "✨", "📞", "☎", "💈", "預約", "髮", "salon", "hair",
];

/// Any of these in a snapshot means a professional or business account.
pub const BUSINESS_MARKERS: &[&str] = &[
    "Professional dashboard",
    "專業儀表板",
    "Contact",
    "聯絡",
    "Email",
    "電子郵件",
    "Call",
    "撥打",
];

/// Shown only on the logged-out login form.
pub const LOGIN_FORM_MARKERS: &[&str] = &[
    "Phone number, username, or email",
    "手機號碼、用戶名稱或電子郵件",
    "Forgot password?",
    "忘記密碼",
    "button \"Log in\"",
    "button \"登入\"",
];

/// First path segments that are Instagram pages rather than accounts.
const RESERVED_PATHS: &[&str] = &[
    "explore", "p", "reel", "reels", "accounts", "direct", "stories", "tags", "about", "legal",
];

const MAX_CAPTIONS: usize = 3;
const BIO_MIN_CHARS: usize = 30;
const BIO_MAX_CHARS: usize = 500;

/// Parse a profile page snapshot. Total over every input, empty included.
pub fn parse_profile(username: &str, snapshot: &str) -> ExtractedProfile {
    ExtractedProfile {
        username: username.to_string(),
        full_name: extract_full_name(snapshot).unwrap_or_else(|| username.to_string()),
        biography: extract_biography(snapshot).unwrap_or_default(),
        followers_count: first_count(&FOLLOWER_PATTERNS, snapshot),
        follows_count: first_count(&FOLLOWING_PATTERNS, snapshot),
        posts_count: first_count(&POST_PATTERNS, snapshot),
        is_business_account: is_business_account(snapshot),
        business_category: first_capture(&CATEGORY_RE, snapshot),
        external_url: extract_external_url(snapshot),
        recent_post_captions: extract_captions(snapshot),
        raw_snapshot: snapshot.to_string(),
    }
}

fn first_count(patterns: &[Regex], snapshot: &str) -> u64 {
    patterns
        .iter()
        .find_map(|re| re.captures(snapshot))
        .map(|caps| parse_count(&caps[1]))
        .unwrap_or(0)
}

fn first_capture(re: &Regex, snapshot: &str) -> Option<String> {
    re.captures_iter(snapshot)
        .map(|caps| caps[1].trim().to_string())
        .find(|value| !value.is_empty())
}

fn extract_full_name(snapshot: &str) -> Option<String> {
    first_capture(&HEADING_RE, snapshot)
}

fn extract_biography(snapshot: &str) -> Option<String> {
    if let Some(bio) = first_capture(&BIOGRAPHY_RE, snapshot) {
        return Some(bio);
    }

    snapshot
        .lines()
        .filter(|line| line_ref(line).is_none() && !is_control_line(line))
        .map(line_text)
        .filter(|text| !text.contains("/url:") && !text.contains("http"))
        .find(|text| {
            let len = text.chars().count();
            (BIO_MIN_CHARS..=BIO_MAX_CHARS).contains(&len) && has_bio_token(text)
        })
        .map(String::from)
}

fn has_bio_token(text: &str) -> bool {
    let lower = text.to_lowercase();
    BIO_TOKENS.iter().any(|token| lower.contains(token)) || LINE_ID_RE.is_match(text)
}

/// Image alt text, links, buttons and headings are never the biography.
fn is_control_line(line: &str) -> bool {
    let text = line.trim().trim_start_matches('-').trim_start();
    let role = text
        .split(|c: char| c.is_whitespace() || c == ':' || c == '"')
        .next()
        .unwrap_or("");
    matches!(
        role,
        "img" | "image" | "link" | "button" | "heading" | "textbox" | "searchbox" | "tab"
            | "menuitem"
    )
}

/// Visible text of a snapshot line without the tree decoration:
/// `  - text: "Hair by Mei"` becomes `Hair by Mei`.
fn line_text(line: &str) -> &str {
    let text = line.trim().trim_start_matches('-').trim_start();
    let text = match text.split_once(':') {
        Some((role, rest)) if is_role(role) => rest.trim(),
        _ => text,
    };
    text.trim_matches('"').trim()
}

fn is_role(word: &str) -> bool {
    matches!(word, "text" | "paragraph" | "generic" | "StaticText")
}

fn is_business_account(snapshot: &str) -> bool {
    BUSINESS_MARKERS.iter().any(|marker| snapshot.contains(marker))
}

fn extract_captions(snapshot: &str) -> Vec<String> {
    CAPTION_RE
        .captures_iter(snapshot)
        .map(|caps| caps[1].trim().to_string())
        .filter(|caption| !caption.is_empty())
        .take(MAX_CAPTIONS)
        .collect()
}

fn extract_external_url(snapshot: &str) -> Option<String> {
    EXTERNAL_URL_RE
        .captures_iter(snapshot)
        .map(|caps| caps[1].to_string())
        .find(|candidate| match Url::parse(candidate) {
            Ok(url) => url
                .host_str()
                .is_some_and(|host| !is_instagram_host(host)),
            Err(_) => false,
        })
}

fn is_instagram_host(host: &str) -> bool {
    host == "instagram.com" || host.ends_with(".instagram.com")
}

/// Username of the account that authored the post open in the current dialog.
///
/// Looks for a profile link (`/url: /<user>/` or `instagram.com/<user>`),
/// skipping Instagram's own top-level pages.
pub fn extract_post_author(snapshot: &str) -> Option<String> {
    AUTHOR_PATH_RE
        .captures_iter(snapshot)
        .chain(AUTHOR_HOST_RE.captures_iter(snapshot))
        .map(|caps| caps[1].to_string())
        .find(|name| !RESERVED_PATHS.contains(&name.to_lowercase().as_str()))
}

/// Whether the snapshot shows a logged-in session. An empty snapshot counts
/// as logged out.
pub fn is_logged_in(snapshot: &str) -> bool {
    !snapshot.trim().is_empty()
        && !LOGIN_FORM_MARKERS
            .iter()
            .any(|marker| snapshot.contains(marker))
}
