use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use salonscout_common::{CrawlerState, DiscoveredLead, DmSendingState, DmStatus, ScoutError};

/// Receives crawl progress. Every method defaults to a no-op.
///
/// Called inline from the crawl loop, so implementations must return quickly.
pub trait CrawlerObserver: Send + Sync {
    fn on_state_change(&self, _state: &CrawlerState) {}

    fn on_lead_discovered(&self, _lead: &DiscoveredLead) {}

    fn on_profile_skipped(&self, _username: &str, _reason: &str) {}

    fn on_error(&self, _error: &ScoutError) {}
}

/// Receives each step of a DM send.
pub trait DmObserver: Send + Sync {
    fn on_dm_state(&self, _state: &DmSendingState) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl CrawlerObserver for NoopObserver {}
impl DmObserver for NoopObserver {}

/// Logs every event through `tracing`.
pub struct LogObserver;

impl CrawlerObserver for LogObserver {
    fn on_state_change(&self, state: &CrawlerState) {
        debug!(
            status = %state.status,
            hashtag = state.current_hashtag.as_deref().unwrap_or(""),
            profile = state.current_profile.as_deref().unwrap_or(""),
            message = %state.message,
            "Crawler state"
        );
    }

    fn on_lead_discovered(&self, lead: &DiscoveredLead) {
        info!(
            username = %lead.profile.username,
            score = lead.analysis.score,
            followers = lead.profile.followers_count,
            hashtag = %lead.source_hashtag,
            "Lead discovered"
        );
    }

    fn on_profile_skipped(&self, username: &str, reason: &str) {
        info!(username, reason, "Profile skipped");
    }

    fn on_error(&self, err: &ScoutError) {
        error!(error = %err, "Crawl failed");
    }
}

impl DmObserver for LogObserver {
    fn on_dm_state(&self, state: &DmSendingState) {
        match state.status {
            DmStatus::Error => error!(
                username = %state.username,
                error = state.error.as_deref().unwrap_or(""),
                "DM failed"
            ),
            status => info!(username = %state.username, ?status, "DM step"),
        }
    }
}

/// Crawl events as values, for consumers on another task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CrawlEvent {
    StateChanged(CrawlerState),
    LeadDiscovered(Box<DiscoveredLead>),
    #[serde(rename_all = "camelCase")]
    ProfileSkipped { username: String, reason: String },
    Error { message: String },
    DmState(DmSendingState),
}

/// Forwards every event over an unbounded channel. Events sent after the
/// receiver is dropped are discarded.
#[derive(Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<CrawlEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CrawlEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: CrawlEvent) {
        let _ = self.tx.send(event);
    }
}

impl CrawlerObserver for ChannelObserver {
    fn on_state_change(&self, state: &CrawlerState) {
        self.emit(CrawlEvent::StateChanged(state.clone()));
    }

    fn on_lead_discovered(&self, lead: &DiscoveredLead) {
        self.emit(CrawlEvent::LeadDiscovered(Box::new(lead.clone())));
    }

    fn on_profile_skipped(&self, username: &str, reason: &str) {
        self.emit(CrawlEvent::ProfileSkipped {
            username: username.to_string(),
            reason: reason.to_string(),
        });
    }

    fn on_error(&self, err: &ScoutError) {
        self.emit(CrawlEvent::Error {
            message: err.to_string(),
        });
    }
}

impl DmObserver for ChannelObserver {
    fn on_dm_state(&self, state: &DmSendingState) {
        self.emit(CrawlEvent::DmState(state.clone()));
    }
}

/// Fans every event out to several observers, in registration order.
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn CrawlerObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn CrawlerObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl CrawlerObserver for ObserverSet {
    fn on_state_change(&self, state: &CrawlerState) {
        self.observers.iter().for_each(|o| o.on_state_change(state));
    }

    fn on_lead_discovered(&self, lead: &DiscoveredLead) {
        self.observers.iter().for_each(|o| o.on_lead_discovered(lead));
    }

    fn on_profile_skipped(&self, username: &str, reason: &str) {
        self.observers
            .iter()
            .for_each(|o| o.on_profile_skipped(username, reason));
    }

    fn on_error(&self, err: &ScoutError) {
        self.observers.iter().for_each(|o| o.on_error(err));
    }
}
