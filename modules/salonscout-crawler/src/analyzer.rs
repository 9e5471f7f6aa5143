use std::sync::Arc;

use ai_client::{extract_json_object, truncate_to_char_boundary, ChatModel};
use serde::Deserialize;
use tracing::{debug, info, warn};

use salonscout_common::{
    Confidence, ContactMethods, DmOption, ExtractedProfile, ProfileAnalysis, MAX_DM_OPTIONS,
    MAX_SCORE,
};

/// Ownership terms looked for in the biography when the model can't be used.
pub const OWNER_KEYWORDS: &[&str] = &[
    "老闆", "店長", "負責人", "創辦人", "主理人", "總監", "owner", "founder", "director", "ceo",
];

const SYSTEM_PROMPT: &str = "You are a B2B sales research assistant. You judge whether an \
Instagram account belongs to a hair salon owner or decision-maker and draft short, personal \
outreach messages. Respond with a single JSON object and nothing else.";

const MAX_BIO_BYTES: usize = 1_500;
const MAX_CAPTION_BYTES: usize = 300;

/// Who is reaching out. Substituted into the prompt and the fallback draft.
#[derive(Debug, Clone, Default)]
pub struct BusinessContext {
    pub name: String,
    pub description: String,
}

/// Scores profiles with a language model, falling back to keyword matching
/// whenever the model call or its reply is unusable.
pub struct ProfileAnalyzer {
    model: Arc<dyn ChatModel>,
    business: BusinessContext,
}

impl ProfileAnalyzer {
    pub fn new(model: Arc<dyn ChatModel>, business: BusinessContext) -> Self {
        Self { model, business }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Never fails. Model errors and unparseable replies both degrade to
    /// [`fallback_analysis`].
    pub async fn analyze(&self, profile: &ExtractedProfile) -> ProfileAnalysis {
        let prompt = build_prompt(&self.business, profile);

        let reply = match self.model.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(username = %profile.username, error = %e, "Analysis call failed, using keyword fallback");
                return fallback_analysis(profile, &self.business);
            }
        };

        match parse_verdict(&reply) {
            Some(analysis) => {
                info!(
                    username = %profile.username,
                    score = analysis.score,
                    confidence = %analysis.confidence,
                    should_skip = analysis.should_skip,
                    "Profile analyzed"
                );
                analysis
            }
            None => {
                warn!(username = %profile.username, "No usable JSON in analysis reply, using keyword fallback");
                debug!(reply = %reply, "Unparsed analysis reply");
                fallback_analysis(profile, &self.business)
            }
        }
    }
}

fn build_prompt(business: &BusinessContext, profile: &ExtractedProfile) -> String {
    let captions = if profile.recent_post_captions.is_empty() {
        "(none)".to_string()
    } else {
        profile
            .recent_post_captions
            .iter()
            .map(|c| format!("- {}", truncate_to_char_boundary(c, MAX_CAPTION_BYTES)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"We are {business_name}: {business_description}

Decide whether this Instagram account is run by a hair salon owner or decision-maker
(owner, founder, manager, director) we could pitch to, and draft outreach messages.

## Profile
Username: @{username}
Name: {full_name}
Biography: {biography}
Followers: {followers}
Following: {following}
Posts: {posts}
Business account: {is_business}
Category: {category}
Website: {website}

## Recent post captions
{captions}

## Output
Return JSON with exactly these fields:
{{
  "isLikelyOwner": boolean,
  "score": integer 0-10 (fit as a sales lead),
  "confidence": "high" | "medium" | "low",
  "reasons": [string],
  "contactMethods": {{"email": string?, "phone": string?, "line": string?, "website": string?}},
  "dmOptions": [{{"style": "friendly" | "professional" | "casual", "content": string}}] (at most 3, in the profile's language),
  "shouldSkip": boolean (true for influencers, brands, students, employees or unrelated accounts),
  "skipReason": string?
}}"#,
        business_name = or_placeholder(&business.name, "a salon services company"),
        business_description = or_placeholder(&business.description, "(no description)"),
        username = profile.username,
        full_name = profile.full_name,
        biography = or_placeholder(
            truncate_to_char_boundary(&profile.biography, MAX_BIO_BYTES),
            "(empty)"
        ),
        followers = profile.followers_count,
        following = profile.follows_count,
        posts = profile.posts_count,
        is_business = if profile.is_business_account { "yes" } else { "no" },
        category = profile.business_category.as_deref().unwrap_or("(unknown)"),
        website = profile.external_url.as_deref().unwrap_or("(none)"),
        captions = captions,
    )
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

// Lenient shape of the model's reply. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawVerdict {
    is_likely_owner: bool,
    score: f64,
    confidence: Option<String>,
    reasons: Vec<String>,
    contact_methods: Option<ContactMethods>,
    dm_options: Vec<RawDmOption>,
    should_skip: Option<bool>,
    skip_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDmOption {
    style: String,
    content: String,
}

/// Extract and normalise the verdict from a model reply. `None` when the
/// reply holds no JSON object or the object doesn't fit the verdict shape.
pub fn parse_verdict(reply: &str) -> Option<ProfileAnalysis> {
    let json = extract_json_object(reply)?;
    let raw: RawVerdict = serde_json::from_str(json).ok()?;

    let score = if raw.score.is_finite() {
        raw.score.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
    } else {
        0
    };

    let dm_options = raw
        .dm_options
        .into_iter()
        .filter(|option| !option.content.trim().is_empty())
        .map(|option| DmOption {
            style: if option.style.trim().is_empty() {
                "friendly".to_string()
            } else {
                option.style
            },
            content: option.content,
        })
        .take(MAX_DM_OPTIONS)
        .collect();

    Some(ProfileAnalysis {
        is_likely_owner: raw.is_likely_owner,
        score,
        confidence: raw
            .confidence
            .as_deref()
            .map(Confidence::parse)
            .unwrap_or_default(),
        reasons: raw.reasons,
        contact_methods: raw.contact_methods.filter(|c| !c.is_empty()),
        dm_options,
        // No explicit verdict: only likely owners go through.
        should_skip: raw.should_skip.unwrap_or(!raw.is_likely_owner),
        skip_reason: raw.skip_reason.filter(|r| !r.trim().is_empty()),
    })
}

/// Keyword verdict over the biography: low confidence, skip unless an
/// ownership term appears.
pub fn fallback_analysis(profile: &ExtractedProfile, business: &BusinessContext) -> ProfileAnalysis {
    let bio = profile.biography.to_lowercase();
    let hits: Vec<&str> = OWNER_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| bio.contains(keyword))
        .collect();
    let is_likely_owner = !hits.is_empty();

    let mut reasons = vec!["Keyword heuristic used; model analysis unavailable".to_string()];
    if is_likely_owner {
        reasons.push(format!("Biography mentions {}", hits.join(", ")));
    } else {
        reasons.push("No ownership keywords in biography".to_string());
    }

    let dm_options = if is_likely_owner {
        vec![DmOption {
            style: "friendly".to_string(),
            content: fallback_draft(profile, business),
        }]
    } else {
        Vec::new()
    };

    ProfileAnalysis {
        is_likely_owner,
        score: if is_likely_owner { 5 } else { 2 },
        confidence: Confidence::Low,
        reasons,
        contact_methods: None,
        dm_options,
        should_skip: !is_likely_owner,
        skip_reason: (!is_likely_owner)
            .then(|| "No ownership keywords found in biography".to_string()),
    }
}

fn fallback_draft(profile: &ExtractedProfile, business: &BusinessContext) -> String {
    let name = or_placeholder(&profile.full_name, &profile.username);
    let mut draft = format!("Hi {name}! I came across your salon on Instagram and really like your work.");
    if !business.name.trim().is_empty() {
        draft.push_str(&format!(" I'm reaching out from {}", business.name.trim()));
        if !business.description.trim().is_empty() {
            draft.push_str(&format!(": {}", business.description.trim()));
        }
        draft.push('.');
    }
    draft.push_str(" Would you be open to a quick chat?");
    draft
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChatModel;

    fn profile(bio: &str) -> ExtractedProfile {
        ExtractedProfile {
            username: "hair_by_mei".into(),
            full_name: "Mei Lin".into(),
            biography: bio.into(),
            followers_count: 4_200,
            ..Default::default()
        }
    }

    fn business() -> BusinessContext {
        BusinessContext {
            name: "GlowBook".into(),
            description: "booking software for salons".into(),
        }
    }

    #[tokio::test]
    async fn test_parses_json_wrapped_in_prose_and_fences() {
        let reply = "Sure! Here's my analysis:\n```json\n{\"isLikelyOwner\": true, \"score\": 8, \
                     \"confidence\": \"high\", \"reasons\": [\"bio says 主理人\"], \
                     \"dmOptions\": [{\"style\": \"friendly\", \"content\": \"嗨 Mei!\"}], \
                     \"shouldSkip\": false}\n```\nLet me know if you need more.";
        let model = Arc::new(ScriptedChatModel::new().reply(reply));
        let analyzer = ProfileAnalyzer::new(model.clone(), business());

        let analysis = analyzer.analyze(&profile("主理人")).await;

        assert!(analysis.is_likely_owner);
        assert_eq!(analysis.score, 8);
        assert_eq!(analysis.confidence, Confidence::High);
        assert_eq!(analysis.reasons, vec!["bio says 主理人"]);
        assert_eq!(analysis.dm_options.len(), 1);
        assert!(!analysis.should_skip);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_prompt_carries_business_and_profile() {
        let model = Arc::new(ScriptedChatModel::new().reply("{}"));
        let analyzer = ProfileAnalyzer::new(model.clone(), business());
        analyzer.analyze(&profile("台北髮廊 ✂")).await;

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("We are GlowBook: booking software for salons"));
        assert!(prompts[0].contains("Username: @hair_by_mei"));
        assert!(prompts[0].contains("Biography: 台北髮廊 ✂"));
        assert!(prompts[0].contains("Followers: 4200"));
    }

    #[tokio::test]
    async fn test_no_json_falls_back_and_skips_without_owner_keywords() {
        let model = Arc::new(ScriptedChatModel::new().reply("I cannot help with that."));
        let analyzer = ProfileAnalyzer::new(model, business());

        let analysis = analyzer.analyze(&profile("Just a stylist who loves color")).await;

        assert!(!analysis.is_likely_owner);
        assert!(analysis.should_skip);
        assert_eq!(analysis.score, 2);
        assert_eq!(analysis.confidence, Confidence::Low);
        assert!(analysis.skip_reason.is_some());
        assert!(analysis.dm_options.is_empty());
    }

    #[tokio::test]
    async fn test_model_error_falls_back_to_owner_keywords() {
        let model = Arc::new(ScriptedChatModel::new().fail("rate limited"));
        let analyzer = ProfileAnalyzer::new(model, business());

        let analysis = analyzer.analyze(&profile("Founder & lead stylist @ Luna Salon")).await;

        assert!(analysis.is_likely_owner);
        assert!(!analysis.should_skip);
        assert_eq!(analysis.score, 5);
        assert_eq!(analysis.confidence, Confidence::Low);
        assert_eq!(analysis.dm_options.len(), 1);
        assert!(analysis.dm_options[0].content.contains("GlowBook"));
        assert!(analysis.skip_reason.is_none());
    }

    #[test]
    fn test_verdict_is_normalised() {
        let reply = r#"{"score": 14.6, "confidence": "MEDIUM", "shouldSkip": false,
            "contactMethods": {},
            "dmOptions": [
                {"style": "friendly", "content": "one"},
                {"content": "two"},
                {"style": "casual", "content": ""},
                {"style": "professional", "content": "three"},
                {"style": "casual", "content": "four"}
            ]}"#;
        let analysis = parse_verdict(reply).unwrap();
        assert_eq!(analysis.score, MAX_SCORE);
        assert_eq!(analysis.confidence, Confidence::Medium);
        assert!(!analysis.is_likely_owner);
        assert!(analysis.contact_methods.is_none());
        let contents: Vec<_> = analysis.dm_options.iter().map(|o| o.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(analysis.dm_options[1].style, "friendly");
    }

    #[test]
    fn test_verdict_rejects_wrong_shape() {
        assert!(parse_verdict(r#"{"score": "very high"}"#).is_none());
        assert!(parse_verdict("no object").is_none());
    }

    #[test]
    fn test_missing_skip_flag_follows_ownership() {
        let not_owner =
            parse_verdict(r#"{"isLikelyOwner": false, "score": 1, "confidence": "high"}"#).unwrap();
        assert!(not_owner.should_skip);

        let owner = parse_verdict(r#"{"isLikelyOwner": true, "score": 7}"#).unwrap();
        assert!(!owner.should_skip);

        assert!(parse_verdict("{}").unwrap().should_skip);
    }

    #[test]
    fn test_negative_score_clamps_to_zero() {
        let analysis = parse_verdict(r#"{"score": -3, "shouldSkip": true}"#).unwrap();
        assert_eq!(analysis.score, 0);
        assert!(analysis.should_skip);
    }

    #[test]
    fn test_fallback_matches_chinese_and_case_folded_keywords() {
        assert!(fallback_analysis(&profile("信義區 店長 Mei"), &business()).is_likely_owner);
        assert!(fallback_analysis(&profile("CEO of Luna"), &business()).is_likely_owner);
        assert!(!fallback_analysis(&profile(""), &business()).is_likely_owner);
    }
}
