use std::env;

use tracing::info;

use crate::error::ScoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
}

impl LlmProvider {
    fn parse(value: &str) -> Result<Self, ScoutError> {
        match value.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            "openai" => Ok(LlmProvider::OpenAi),
            other => Err(ScoutError::Config(format!(
                "LLM_PROVIDER must be 'anthropic' or 'openai', got '{other}'"
            ))),
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "claude-haiku-4-5-20251001",
            LlmProvider::OpenAi => "gpt-4o-mini",
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
    /// Alternate OpenAI-compatible or Anthropic-compatible endpoint.
    pub base_url: Option<String>,
}

/// Crawl limits, pacing and the business pitched in outreach drafts.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub hashtags: Vec<String>,
    pub min_followers: u64,
    pub max_followers: u64,
    /// Stop once this many leads are recorded.
    pub max_leads: u32,
    /// Stop once this many profiles have been sent for analysis.
    pub max_profiles: u32,
    /// Post tiles opened per hashtag page.
    pub max_posts_per_hashtag: usize,
    /// Base pause after each profile visit.
    pub delay_ms: u64,
    /// Random extra pause, uniformly drawn from `0..=delay_jitter_ms`.
    pub delay_jitter_ms: u64,
    pub business_name: String,
    pub business_description: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            hashtags: Vec::new(),
            min_followers: 500,
            max_followers: 50_000,
            max_leads: 10,
            max_profiles: 50,
            max_posts_per_hashtag: 9,
            delay_ms: 3_000,
            delay_jitter_ms: 2_000,
            business_name: String::new(),
            business_description: String::new(),
        }
    }
}

/// Where the browser-control server listens.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub url: String,
    pub token: Option<String>,
}

impl BrowserConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            url: get("BROWSER_URL").unwrap_or_else(|| DEFAULT_BROWSER_URL.to_string()),
            token: get("BROWSER_TOKEN"),
        }
    }
}

const DEFAULT_BROWSER_URL: &str = "http://127.0.0.1:18791";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub browser: BrowserConfig,
    pub crawler: CrawlerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ScoutError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScoutError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("LLM_PROVIDER") {
            Some(p) => LlmProvider::parse(&p)?,
            None => LlmProvider::Anthropic,
        };
        let api_key = get(provider.key_var()).ok_or_else(|| {
            ScoutError::Config(format!("{} environment variable is required", provider.key_var()))
        })?;
        let llm = LlmConfig {
            provider,
            model: get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            api_key,
            base_url: get("LLM_BASE_URL"),
        };

        let defaults = CrawlerConfig::default();
        let crawler = CrawlerConfig {
            hashtags: get("SCOUT_HASHTAGS")
                .map(|raw| parse_hashtags(&raw))
                .unwrap_or_default(),
            min_followers: parse_num(&get, "SCOUT_MIN_FOLLOWERS", defaults.min_followers)?,
            max_followers: parse_num(&get, "SCOUT_MAX_FOLLOWERS", defaults.max_followers)?,
            max_leads: parse_num(&get, "SCOUT_MAX_LEADS", defaults.max_leads)?,
            max_profiles: parse_num(&get, "SCOUT_MAX_PROFILES", defaults.max_profiles)?,
            max_posts_per_hashtag: parse_num(
                &get,
                "SCOUT_MAX_POSTS_PER_HASHTAG",
                defaults.max_posts_per_hashtag,
            )?,
            delay_ms: parse_num(&get, "SCOUT_DELAY_MS", defaults.delay_ms)?,
            delay_jitter_ms: parse_num(&get, "SCOUT_DELAY_JITTER_MS", defaults.delay_jitter_ms)?,
            business_name: get("BUSINESS_NAME").unwrap_or_default(),
            business_description: get("BUSINESS_DESCRIPTION").unwrap_or_default(),
        };

        if crawler.min_followers > crawler.max_followers {
            return Err(ScoutError::Config(format!(
                "SCOUT_MIN_FOLLOWERS ({}) exceeds SCOUT_MAX_FOLLOWERS ({})",
                crawler.min_followers, crawler.max_followers
            )));
        }

        Ok(Self {
            llm,
            browser: BrowserConfig::from_lookup(&lookup),
            crawler,
        })
    }

    /// Log the loaded configuration without credentials.
    pub fn log_redacted(&self) {
        info!(
            provider = ?self.llm.provider,
            model = %self.llm.model,
            llm_base_url = ?self.llm.base_url,
            browser_url = %self.browser.url,
            browser_token = self.browser.token.is_some(),
            hashtags = ?self.crawler.hashtags,
            min_followers = self.crawler.min_followers,
            max_followers = self.crawler.max_followers,
            max_leads = self.crawler.max_leads,
            max_profiles = self.crawler.max_profiles,
            delay_ms = self.crawler.delay_ms,
            delay_jitter_ms = self.crawler.delay_jitter_ms,
            business = %self.crawler.business_name,
            "Configuration loaded"
        );
    }
}

/// Split a comma/whitespace separated list, dropping any leading `#`.
pub fn parse_hashtags(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|tag| tag.trim().trim_start_matches('#').to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn parse_num<T, G>(get: &G, key: &str, default: T) -> Result<T, ScoutError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ScoutError::Config(format!("{key} must be a non-negative number, got '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_anthropic_key() {
        let config = Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk-ant")])).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.llm.model, "claude-haiku-4-5-20251001");
        assert_eq!(config.crawler.min_followers, 500);
        assert!(config.crawler.hashtags.is_empty());
        assert_eq!(config.browser.url, "http://127.0.0.1:18791");
        assert!(config.browser.token.is_none());
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = Config::from_lookup(lookup(&[("LLM_PROVIDER", "openai")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_openai_with_alternate_endpoint() {
        let config = Config::from_lookup(lookup(&[
            ("LLM_PROVIDER", "OpenAI"),
            ("OPENAI_API_KEY", "sk"),
            ("LLM_BASE_URL", "http://localhost:4000/v1"),
            ("SCOUT_HASHTAGS", "#台北美髮, salon  hairstylist"),
            ("SCOUT_MIN_FOLLOWERS", "1000"),
        ]))
        .unwrap();
        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.base_url.as_deref(), Some("http://localhost:4000/v1"));
        assert_eq!(config.crawler.hashtags, vec!["台北美髮", "salon", "hairstylist"]);
        assert_eq!(config.crawler.min_followers, 1000);
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("SCOUT_DELAY_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SCOUT_DELAY_MS"));
    }

    #[test]
    fn test_inverted_follower_bounds_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("SCOUT_MIN_FOLLOWERS", "9000"),
            ("SCOUT_MAX_FOLLOWERS", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ScoutError::Config(_)));
    }
}
