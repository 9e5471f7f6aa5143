// Test mocks for the crawler and DM sender.
//
// One mock per trait boundary:
// - MockBrowser (Browser): URL -> snapshot pages plus ref -> dialog overlays
// - ScriptedChatModel (ChatModel): queued replies, records prompts
// - RecordingObserver (CrawlerObserver + DmObserver): keeps every event
// - ScriptedGate (ConfirmationGate): queued decisions
//
// Plus snapshot fixtures shaped like real accessibility-tree output.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result as AnyResult};
use async_trait::async_trait;

use ai_client::ChatModel;
use salonscout_common::{
    CrawlerConfig, CrawlerState, DiscoveredLead, DmSendingState, ScoutError,
};

use crate::dm::{ConfirmationGate, SendDecision};
use crate::observer::{CrawlEvent, CrawlerObserver, DmObserver};
use crate::traits::{Browser, Result, ScrollOptions, SnapshotOptions, WaitFor};

// ---------------------------------------------------------------------------
// MockBrowser
// ---------------------------------------------------------------------------

/// Every call made against a [`MockBrowser`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCall {
    Navigate(String),
    Snapshot { interactive: bool },
    Click(String),
    Type { element: String, text: String },
    Scroll,
    Wait(WaitFor),
    Screenshot,
}

#[derive(Default)]
struct Tab {
    url: Option<String>,
    overlay: Option<String>,
    calls: Vec<BrowserCall>,
}

/// Single fake tab. Navigating shows the page registered for the URL;
/// clicking a ref registered with `.on_click()` overlays its snapshot (a
/// post or DM dialog) until the next navigation or unregistered click.
/// Builder pattern: `.on_page()`, `.on_click()`, `.fail_navigation()`.
pub struct MockBrowser {
    pages: HashMap<String, String>,
    overlays: HashMap<String, String>,
    failing: HashSet<String>,
    screenshot: String,
    tab: Mutex<Tab>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBrowser {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            overlays: HashMap::new(),
            failing: HashSet::new(),
            screenshot: "iVBORw0KGgo=".to_string(),
            tab: Mutex::new(Tab::default()),
        }
    }

    pub fn on_page(mut self, url: &str, snapshot: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), snapshot.into());
        self
    }

    pub fn on_click(mut self, element: &str, snapshot: impl Into<String>) -> Self {
        self.overlays.insert(element.to_string(), snapshot.into());
        self
    }

    pub fn fail_navigation(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<BrowserCall> {
        self.tab.lock().unwrap().calls.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BrowserCall::Navigate(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BrowserCall::Click(element) => Some(element),
                _ => None,
            })
            .collect()
    }

    pub fn typed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BrowserCall::Type { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BrowserCall) {
        self.tab.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(BrowserCall::Navigate(url.to_string()));
        if self.failing.contains(url) {
            return Err(ScoutError::Browser(format!(
                "MockBrowser: navigation to {url} failed"
            )));
        }
        let mut tab = self.tab.lock().unwrap();
        tab.url = Some(url.to_string());
        tab.overlay = None;
        Ok(())
    }

    async fn snapshot(&self, options: SnapshotOptions) -> Result<String> {
        self.record(BrowserCall::Snapshot {
            interactive: options.interactive,
        });
        let tab = self.tab.lock().unwrap();
        if let Some(overlay) = &tab.overlay {
            return Ok(overlay.clone());
        }
        let url = tab.url.clone().unwrap_or_default();
        self.pages
            .get(&url)
            .cloned()
            .ok_or_else(|| ScoutError::Browser(format!("MockBrowser: no page registered for {url}")))
    }

    async fn click(&self, element: &str) -> Result<()> {
        self.record(BrowserCall::Click(element.to_string()));
        self.tab.lock().unwrap().overlay = self.overlays.get(element).cloned();
        Ok(())
    }

    async fn type_text(&self, element: &str, text: &str) -> Result<()> {
        self.record(BrowserCall::Type {
            element: element.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn scroll(&self, _options: ScrollOptions) -> Result<()> {
        self.record(BrowserCall::Scroll);
        Ok(())
    }

    async fn wait(&self, until: WaitFor) -> Result<()> {
        self.record(BrowserCall::Wait(until));
        Ok(())
    }

    async fn screenshot(&self) -> Result<String> {
        self.record(BrowserCall::Screenshot);
        Ok(self.screenshot.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedChatModel
// ---------------------------------------------------------------------------

/// Replies in queue order. Once the queue is empty it repeats the `always`
/// reply if one is set, else errors.
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    always: Option<String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl Default for ScriptedChatModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            always: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Same reply to every call.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            always: Some(reply.into()),
            ..Self::new()
        }
    }

    pub fn reply(self, reply: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, _system: &str, user: &str) -> AnyResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(user.to_string());

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => self
                .always
                .clone()
                .ok_or_else(|| anyhow!("ScriptedChatModel: no reply scripted")),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// RecordingObserver
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<CrawlEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<CrawlerState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CrawlEvent::StateChanged(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn leads(&self) -> Vec<DiscoveredLead> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CrawlEvent::LeadDiscovered(lead) => Some(*lead),
                _ => None,
            })
            .collect()
    }

    /// `(username, reason)` pairs.
    pub fn skips(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CrawlEvent::ProfileSkipped { username, reason } => Some((username, reason)),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CrawlEvent::Error { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn dm_states(&self) -> Vec<DmSendingState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CrawlEvent::DmState(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: CrawlEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl CrawlerObserver for RecordingObserver {
    fn on_state_change(&self, state: &CrawlerState) {
        self.push(CrawlEvent::StateChanged(state.clone()));
    }

    fn on_lead_discovered(&self, lead: &DiscoveredLead) {
        self.push(CrawlEvent::LeadDiscovered(Box::new(lead.clone())));
    }

    fn on_profile_skipped(&self, username: &str, reason: &str) {
        self.push(CrawlEvent::ProfileSkipped {
            username: username.to_string(),
            reason: reason.to_string(),
        });
    }

    fn on_error(&self, err: &ScoutError) {
        self.push(CrawlEvent::Error {
            message: err.to_string(),
        });
    }
}

impl DmObserver for RecordingObserver {
    fn on_dm_state(&self, state: &DmSendingState) {
        self.push(CrawlEvent::DmState(state.clone()));
    }
}

// ---------------------------------------------------------------------------
// ScriptedGate
// ---------------------------------------------------------------------------

/// Answers confirmations in queue order, then cancels.
pub struct ScriptedGate {
    decisions: Mutex<VecDeque<SendDecision>>,
    seen: Mutex<Vec<(String, String)>>,
}

impl ScriptedGate {
    pub fn new(decisions: Vec<SendDecision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// `(draft, screenshot)` pairs the gate was shown.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmationGate for ScriptedGate {
    async fn confirm(&self, _username: &str, draft: &str, screenshot: &str) -> SendDecision {
        self.seen
            .lock()
            .unwrap()
            .push((draft.to_string(), screenshot.to_string()));
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SendDecision::Cancel)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// No delays, generous limits, followers between 1,000 and 100,000.
pub fn crawler_config(hashtags: &[&str]) -> CrawlerConfig {
    CrawlerConfig {
        hashtags: hashtags.iter().map(|t| t.to_string()).collect(),
        min_followers: 1_000,
        max_followers: 100_000,
        max_leads: 10,
        max_profiles: 50,
        max_posts_per_hashtag: 9,
        delay_ms: 0,
        delay_jitter_ms: 0,
        business_name: "GlowBook".to_string(),
        business_description: "booking software for salons".to_string(),
    }
}

pub fn home_page() -> String {
    "\
- navigation:
  - link \"Home\" [ref=e1]
  - link \"Search\" [ref=e2]
  - link \"Messages\" [ref=e3]
  - link \"Profile\" [ref=e4]"
        .to_string()
}

pub fn login_page() -> String {
    "\
- textbox \"Phone number, username, or email\" [ref=e1]
- textbox \"Password\" [ref=e2]
- button \"Log in\" [ref=e3]"
        .to_string()
}

/// Hashtag grid with one tile per ref.
pub fn hashtag_page(post_refs: &[&str]) -> String {
    let mut page = String::from("- heading \"#hashtag\" [level=1]\n");
    for (i, element) in post_refs.iter().enumerate() {
        page.push_str(&format!(
            "- link \"Photo by stylist {i}. May be an image of hair\" [ref={element}]\n"
        ));
    }
    page
}

/// Open post dialog authored by `author`, with a close button.
pub fn post_dialog(author: &str) -> String {
    format!(
        "\
- dialog:
  - link \"{author}\" [ref=p1]:
    - /url: /{author}/
  - text: \"caption: New color work\"
  - button \"Close\" [ref=x1]"
    )
}

pub fn profile_page(username: &str, followers: &str, bio: &str) -> String {
    format!(
        "\
- main:
  - heading \"{username}\" [level=2]
  - button \"Message\" [ref=m1]
  - text: 120 posts
  - text: {followers} followers
  - text: 300 following
  - text: \"biography: {bio}\"
  - button \"Contact\" [ref=c1]"
    )
}

/// DM conversation with an input and a send button.
pub fn dm_dialog() -> String {
    "\
- dialog:
  - textbox \"Message...\" [ref=t1]
  - button \"Send\" [ref=s1]"
        .to_string()
}

/// A verdict the analyzer accepts as a lead.
pub fn lead_verdict(score: u8) -> String {
    format!(
        r#"```json
{{"isLikelyOwner": true, "score": {score}, "confidence": "high",
 "reasons": ["owner in bio"],
 "dmOptions": [{{"style": "friendly", "content": "Hi! Love your work."}}],
 "shouldSkip": false}}
```"#
    )
}

/// A verdict the analyzer marks as skipped.
pub fn skip_verdict(reason: &str) -> String {
    format!(
        r#"{{"isLikelyOwner": false, "score": 3, "confidence": "medium", "shouldSkip": true, "skipReason": "{reason}"}}"#
    )
}
