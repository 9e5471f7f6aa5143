use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};
use url::Url;

use salonscout_common::{
    CrawlerConfig, CrawlerState, CrawlerStatus, DiscoveredLead, ExtractedProfile, ScoutError,
};

use crate::analyzer::ProfileAnalyzer;
use crate::observer::{CrawlerObserver, NoopObserver};
use crate::refs::{find_ref, find_refs, CLOSE_BUTTON_LABELS, POST_TILE_LABELS};
use crate::snapshot::{extract_post_author, is_logged_in, parse_profile};
use crate::traits::{Browser, Result, ScrollDirection, ScrollOptions, SnapshotOptions, WaitFor};

pub const INSTAGRAM_HOME: &str = "https://www.instagram.com/";

static TAGS_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://www.instagram.com/explore/tags/").unwrap());

/// Settle time after a page navigation.
const PAGE_SETTLE_MS: u64 = 2_000;
/// Settle time after opening a post dialog.
const POST_OPEN_MS: u64 = 1_500;
const SCROLL_PIXELS: u32 = 1_200;

/// Page URL for a hashtag, `#` prefix optional.
pub fn hashtag_url(tag: &str) -> String {
    let tag = tag.trim().trim_start_matches('#');
    let mut url = TAGS_BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(tag).push("");
    }
    url.to_string()
}

pub fn profile_url(username: &str) -> String {
    format!("{INSTAGRAM_HOME}{username}/")
}

/// Cooperative stop signal. The crawler checks it between hashtags and
/// between profiles, never mid-profile.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a profile didn't qualify on follower count, if it didn't.
pub fn follower_bounds_violation(profile: &ExtractedProfile, config: &CrawlerConfig) -> Option<String> {
    let followers = profile.followers_count;
    if followers < config.min_followers {
        Some(format!(
            "Followers {followers} below minimum {}",
            config.min_followers
        ))
    } else if followers > config.max_followers {
        Some(format!(
            "Followers {followers} above maximum {}",
            config.max_followers
        ))
    } else {
        None
    }
}

/// Walks hashtag pages, visits post authors and turns qualifying profiles
/// into leads.
///
/// The crawler owns its [`CrawlerState`]. Each change builds a new value,
/// replaces the old one and hands it to the observer.
pub struct Crawler {
    browser: Arc<dyn Browser>,
    analyzer: ProfileAnalyzer,
    config: CrawlerConfig,
    observer: Arc<dyn CrawlerObserver>,
    cancel: CancelFlag,
    state: CrawlerState,
    leads: Vec<DiscoveredLead>,
    visited: HashSet<String>,
}

impl Crawler {
    pub fn new(browser: Arc<dyn Browser>, analyzer: ProfileAnalyzer, config: CrawlerConfig) -> Self {
        Self {
            browser,
            analyzer,
            config,
            observer: Arc::new(NoopObserver),
            cancel: CancelFlag::new(),
            state: CrawlerState::default(),
            leads: Vec::new(),
            visited: HashSet::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CrawlerObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> &CrawlerState {
        &self.state
    }

    pub fn leads(&self) -> &[DiscoveredLead] {
        &self.leads
    }

    /// Run one crawl over the configured hashtags.
    ///
    /// Per-profile and per-hashtag failures become skip events and the crawl
    /// goes on. Failing the login check, or any fatal error, moves the state
    /// to `Error`, notifies `on_error` and returns the error.
    pub async fn run(&mut self) -> Result<Vec<DiscoveredLead>> {
        self.state = CrawlerState::default();
        self.leads.clear();
        self.visited.clear();

        info!(
            hashtags = ?self.config.hashtags,
            min_followers = self.config.min_followers,
            max_followers = self.config.max_followers,
            max_leads = self.config.max_leads,
            model = self.analyzer.model_name(),
            "Crawl starting"
        );

        match self.crawl().await {
            Ok(()) => {
                if let Some(reason) = self.stop_reason() {
                    info!(reason, "Crawl stopped early");
                }
                let message = format!(
                    "Found {} leads from {} profiles",
                    self.state.leads_discovered, self.state.profiles_visited
                );
                self.set_status(CrawlerStatus::Completed, message);
                info!(
                    hashtags = self.state.hashtags_processed,
                    visited = self.state.profiles_visited,
                    analyzed = self.state.profiles_analyzed,
                    skipped = self.state.profiles_skipped,
                    leads = self.state.leads_discovered,
                    "Crawl completed"
                );
                Ok(self.leads.clone())
            }
            Err(e) => {
                self.set_status(CrawlerStatus::Error, e.to_string());
                self.observer.on_error(&e);
                Err(e)
            }
        }
    }

    async fn crawl(&mut self) -> Result<()> {
        self.set_status(CrawlerStatus::Starting, "Checking Instagram login");
        self.check_login().await?;

        let hashtags = self.config.hashtags.clone();
        for tag in &hashtags {
            if self.should_stop() {
                break;
            }

            self.update(|s| {
                s.status = CrawlerStatus::Searching;
                s.current_hashtag = Some(tag.clone());
                s.current_profile = None;
                s.message = format!("Searching #{tag}");
            });

            let candidates = match self.discover_authors(tag).await {
                Ok(candidates) => candidates,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(hashtag = %tag, error = %e, "Hashtag discovery failed, moving on");
                    self.update(|s| s.hashtags_processed += 1);
                    continue;
                }
            };
            info!(hashtag = %tag, candidates = candidates.len(), "Candidates found");

            for username in candidates {
                if self.should_stop() {
                    break;
                }
                if !self.visited.insert(username.clone()) {
                    debug!(username = %username, "Already visited, skipping");
                    continue;
                }

                match self.process_profile(tag, &username).await {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(username = %username, error = %e, "Profile failed");
                        self.skip(&username, &format!("Error: {e}"));
                    }
                }

                if !self.should_stop() {
                    self.pace().await;
                }
            }

            self.update(|s| s.hashtags_processed += 1);
        }

        Ok(())
    }

    async fn check_login(&self) -> Result<()> {
        self.browser.navigate(INSTAGRAM_HOME).await?;
        self.browser.wait(WaitFor::Time(PAGE_SETTLE_MS)).await?;
        let home = self.browser.snapshot(SnapshotOptions::interactive()).await?;
        if !is_logged_in(&home) {
            return Err(ScoutError::NotLoggedIn(
                "login form shown; sign in to Instagram in the controlled browser first".into(),
            ));
        }
        Ok(())
    }

    /// Usernames of the authors of the first posts on a hashtag page, deduped
    /// in page order.
    async fn discover_authors(&self, tag: &str) -> Result<Vec<String>> {
        let url = hashtag_url(tag);
        self.browser.navigate(&url).await?;
        self.browser.wait(WaitFor::Time(PAGE_SETTLE_MS)).await?;

        let limit = self.config.max_posts_per_hashtag;
        let mut page = self.browser.snapshot(SnapshotOptions::interactive()).await?;
        let mut posts = find_refs(&page, POST_TILE_LABELS, limit);
        if posts.len() < limit {
            self.browser
                .scroll(ScrollOptions {
                    direction: ScrollDirection::Down,
                    amount: SCROLL_PIXELS,
                })
                .await?;
            page = self.browser.snapshot(SnapshotOptions::interactive()).await?;
            posts = find_refs(&page, POST_TILE_LABELS, limit);
        }
        if posts.is_empty() {
            return Err(ScoutError::ref_not_found(
                "Post tiles",
                format!("no posts found on #{tag}"),
            ));
        }

        let mut authors: Vec<String> = Vec::new();
        for post in &posts {
            match self.open_post_author(&url, post).await {
                Ok(Some(author)) if !authors.contains(&author) => authors.push(author),
                Ok(_) => {}
                Err(e) => warn!(hashtag = %tag, post = %post, error = %e, "Could not read post author"),
            }
        }
        Ok(authors)
    }

    async fn open_post_author(&self, tag_url: &str, post: &str) -> Result<Option<String>> {
        self.browser.click(post).await?;
        self.browser.wait(WaitFor::Time(POST_OPEN_MS)).await?;
        let dialog = self.browser.snapshot(SnapshotOptions::interactive()).await?;
        let author = extract_post_author(&dialog);

        match find_ref(&dialog, CLOSE_BUTTON_LABELS) {
            Some(close) => self.browser.click(&close).await?,
            None => {
                self.browser.navigate(tag_url).await?;
                self.browser.wait(WaitFor::Time(PAGE_SETTLE_MS)).await?;
                self.browser.snapshot(SnapshotOptions::interactive()).await?;
            }
        }

        Ok(author)
    }

    async fn process_profile(&mut self, tag: &str, username: &str) -> Result<()> {
        self.update(|s| {
            s.status = CrawlerStatus::Browsing;
            s.current_profile = Some(username.to_string());
            s.profiles_visited += 1;
            s.message = format!("Visiting @{username}");
        });

        self.browser.navigate(&profile_url(username)).await?;
        self.browser.wait(WaitFor::Time(PAGE_SETTLE_MS)).await?;
        let snapshot = self.browser.snapshot(SnapshotOptions::full()).await?;
        let profile = parse_profile(username, &snapshot);

        if let Some(reason) = follower_bounds_violation(&profile, &self.config) {
            self.skip(username, &reason);
            return Ok(());
        }

        self.set_status(CrawlerStatus::Analyzing, format!("Analyzing @{username}"));
        let analysis = self.analyzer.analyze(&profile).await;
        self.update(|s| s.profiles_analyzed += 1);

        if analysis.should_skip {
            let reason = analysis
                .skip_reason
                .clone()
                .unwrap_or_else(|| "Not a likely salon owner".to_string());
            self.skip(username, &reason);
            return Ok(());
        }

        let lead = DiscoveredLead::new(profile, analysis, tag, Utc::now());
        self.leads.push(lead.clone());
        self.update(|s| {
            s.leads_discovered += 1;
            s.message = format!("Lead: @{username}");
        });
        self.observer.on_lead_discovered(&lead);
        Ok(())
    }

    async fn pace(&mut self) {
        let jitter = rand::rng().random_range(0..=self.config.delay_jitter_ms);
        let delay = self.config.delay_ms.saturating_add(jitter);
        self.set_status(CrawlerStatus::Waiting, format!("Waiting {delay}ms"));
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn should_stop(&self) -> bool {
        self.stop_reason().is_some()
    }

    fn stop_reason(&self) -> Option<&'static str> {
        if self.cancel.is_cancelled() {
            Some("cancelled")
        } else if self.state.leads_discovered >= self.config.max_leads {
            Some("lead limit reached")
        } else if self.state.profiles_analyzed >= self.config.max_profiles {
            Some("profile limit reached")
        } else {
            None
        }
    }

    fn skip(&mut self, username: &str, reason: &str) {
        info!(username, reason, "Skipping profile");
        self.update(|s| s.profiles_skipped += 1);
        self.observer.on_profile_skipped(username, reason);
    }

    fn set_status(&mut self, status: CrawlerStatus, message: impl Into<String>) {
        let next = self.state.with_status(status, message);
        self.replace(next);
    }

    fn update(&mut self, change: impl FnOnce(&mut CrawlerState)) {
        let mut next = self.state.clone();
        change(&mut next);
        self.replace(next);
    }

    fn replace(&mut self, next: CrawlerState) {
        self.state = next;
        self.observer.on_state_change(&self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashtag_url_encodes_and_strips_hash() {
        assert_eq!(
            hashtag_url("#salon"),
            "https://www.instagram.com/explore/tags/salon/"
        );
        assert_eq!(
            hashtag_url("台北美髮"),
            "https://www.instagram.com/explore/tags/%E5%8F%B0%E5%8C%97%E7%BE%8E%E9%AB%AE/"
        );
    }

    #[test]
    fn test_profile_url() {
        assert_eq!(profile_url("hair_by_mei"), "https://www.instagram.com/hair_by_mei/");
    }

    #[test]
    fn test_follower_bounds() {
        let config = CrawlerConfig {
            min_followers: 1_000,
            max_followers: 10_000,
            ..Default::default()
        };
        let with = |n| ExtractedProfile {
            followers_count: n,
            ..Default::default()
        };

        let low = follower_bounds_violation(&with(500), &config).unwrap();
        assert!(low.contains("500") && low.contains("below"));
        let high = follower_bounds_violation(&with(20_000), &config).unwrap();
        assert!(high.contains("above"));
        assert!(follower_bounds_violation(&with(1_000), &config).is_none());
        assert!(follower_bounds_violation(&with(10_000), &config).is_none());
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
    }
}
