use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Profile extraction ---

/// One visit's worth of what a profile page showed. Never persisted; a new
/// value is parsed on every visit.
///
/// Counts are 0 when the snapshot text couldn't be parsed, so 0 means
/// "zero or unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedProfile {
    pub username: String,
    pub full_name: String,
    pub biography: String,
    pub followers_count: u64,
    pub follows_count: u64,
    pub posts_count: u64,
    pub is_business_account: bool,
    pub business_category: Option<String>,
    pub external_url: Option<String>,
    pub recent_post_captions: Vec<String>,
    pub raw_snapshot: String,
}

// --- Analysis ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl Confidence {
    /// Lenient parse of whatever casing the model used. Unknown values are `Low`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMethods {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl ContactMethods {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none() && self.line.is_none() && self.website.is_none()
    }
}

/// A drafted outreach message in a given tone ("friendly", "professional", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmOption {
    pub style: String,
    pub content: String,
}

/// Maximum number of drafts kept per analysis.
pub const MAX_DM_OPTIONS: usize = 3;

/// Maximum analysis score.
pub const MAX_SCORE: u8 = 10;

/// The model's verdict on one profile.
///
/// `should_skip` wins over everything else: a skipped profile is never a
/// lead, whatever its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAnalysis {
    pub is_likely_owner: bool,
    pub score: u8,
    pub confidence: Confidence,
    pub reasons: Vec<String>,
    pub contact_methods: Option<ContactMethods>,
    pub dm_options: Vec<DmOption>,
    pub should_skip: bool,
    pub skip_reason: Option<String>,
}

// --- Leads ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredLead {
    pub id: String,
    pub profile: ExtractedProfile,
    pub analysis: ProfileAnalysis,
    pub discovered_at: DateTime<Utc>,
    pub source_hashtag: String,
}

impl DiscoveredLead {
    /// The id is `<unix millis>-<username>`: unique within one run, not across
    /// processes.
    pub fn new(
        profile: ExtractedProfile,
        analysis: ProfileAnalysis,
        source_hashtag: impl Into<String>,
        discovered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{}-{}", discovered_at.timestamp_millis(), profile.username),
            profile,
            analysis,
            discovered_at,
            source_hashtag: source_hashtag.into(),
        }
    }
}

// --- Crawler state ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlerStatus {
    #[default]
    Idle,
    Starting,
    Searching,
    Browsing,
    Analyzing,
    Waiting,
    Completed,
    Error,
}

impl std::fmt::Display for CrawlerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CrawlerStatus::Idle => "idle",
            CrawlerStatus::Starting => "starting",
            CrawlerStatus::Searching => "searching",
            CrawlerStatus::Browsing => "browsing",
            CrawlerStatus::Analyzing => "analyzing",
            CrawlerStatus::Waiting => "waiting",
            CrawlerStatus::Completed => "completed",
            CrawlerStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Progress of one crawl run. Observers receive whole values; only the
/// crawler produces new ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerState {
    pub status: CrawlerStatus,
    pub hashtags_processed: u32,
    pub profiles_visited: u32,
    pub profiles_analyzed: u32,
    pub profiles_skipped: u32,
    pub leads_discovered: u32,
    pub current_hashtag: Option<String>,
    pub current_profile: Option<String>,
    pub message: String,
}

impl CrawlerState {
    /// Copy of this state with a new status and message.
    pub fn with_status(&self, status: CrawlerStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            ..self.clone()
        }
    }
}

// --- DM sending ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmStatus {
    #[default]
    Idle,
    Navigating,
    OpeningDialog,
    Typing,
    AwaitingConfirmation,
    Sending,
    Sent,
    Cancelled,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmSendingState {
    pub status: DmStatus,
    pub username: String,
    pub message: String,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn analysis() -> ProfileAnalysis {
        ProfileAnalysis {
            is_likely_owner: true,
            score: 8,
            confidence: Confidence::High,
            reasons: vec!["bio says owner".into()],
            contact_methods: None,
            dm_options: vec![],
            should_skip: false,
            skip_reason: None,
        }
    }

    #[test]
    fn test_lead_id_combines_timestamp_and_username() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let profile = ExtractedProfile {
            username: "hair_by_mei".into(),
            ..Default::default()
        };
        let lead = DiscoveredLead::new(profile, analysis(), "台北美髮", at);
        assert_eq!(lead.id, format!("{}-hair_by_mei", at.timestamp_millis()));
        assert_eq!(lead.source_hashtag, "台北美髮");
    }

    #[test]
    fn test_profile_serializes_camel_case() {
        let profile = ExtractedProfile {
            username: "salon".into(),
            followers_count: 1200,
            ..Default::default()
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["followersCount"], 1200);
        assert_eq!(json["isBusinessAccount"], false);
    }

    #[test]
    fn test_with_status_keeps_counters() {
        let state = CrawlerState {
            leads_discovered: 3,
            current_hashtag: Some("salon".into()),
            ..Default::default()
        };
        let next = state.with_status(CrawlerStatus::Completed, "done");
        assert_eq!(next.status, CrawlerStatus::Completed);
        assert_eq!(next.leads_discovered, 3);
        assert_eq!(next.current_hashtag.as_deref(), Some("salon"));
        assert_eq!(state.status, CrawlerStatus::Idle);
    }

    #[test]
    fn test_confidence_parse_is_lenient() {
        assert_eq!(Confidence::parse("HIGH"), Confidence::High);
        assert_eq!(Confidence::parse(" medium "), Confidence::Medium);
        assert_eq!(Confidence::parse("unsure"), Confidence::Low);
    }
}
