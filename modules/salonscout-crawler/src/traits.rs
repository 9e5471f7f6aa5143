// Trait abstraction for the browser session the crawler and DM sender drive.
//
// Browser replaces a direct BrowserClient dependency. The one implementation
// talks HTTP to a browser-control server; tests use MockBrowser instead, so
// no browser and no network are needed.

use async_trait::async_trait;

use browser_client::{Action, BrowserClient, BrowserError};
use salonscout_common::ScoutError;

pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotOptions {
    /// Only interactive elements (buttons, links, inputs).
    pub interactive: bool,
    pub max_chars: Option<usize>,
}

impl SnapshotOptions {
    /// Full page text, used for profile parsing.
    pub fn full() -> Self {
        Self {
            interactive: false,
            max_chars: Some(50_000),
        }
    }

    /// Interactive elements only, used for finding controls.
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            max_chars: Some(20_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOptions {
    pub direction: ScrollDirection,
    /// Pixels.
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitFor {
    Time(u64),
    Text(String),
}

/// One browser tab. Calls mutate the tab's state, so each must be awaited
/// before the next is issued.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn snapshot(&self, options: SnapshotOptions) -> Result<String>;

    async fn click(&self, element: &str) -> Result<()>;

    async fn type_text(&self, element: &str, text: &str) -> Result<()>;

    async fn scroll(&self, options: ScrollOptions) -> Result<()>;

    async fn wait(&self, until: WaitFor) -> Result<()>;

    /// Base64-encoded PNG of the viewport.
    async fn screenshot(&self) -> Result<String>;
}

fn browser_err(e: BrowserError) -> ScoutError {
    ScoutError::Browser(e.to_string())
}

#[async_trait]
impl Browser for BrowserClient {
    async fn navigate(&self, url: &str) -> Result<()> {
        BrowserClient::navigate(self, url).await.map_err(browser_err)
    }

    async fn snapshot(&self, options: SnapshotOptions) -> Result<String> {
        BrowserClient::snapshot(self, options.interactive, options.max_chars)
            .await
            .map_err(browser_err)
    }

    async fn click(&self, element: &str) -> Result<()> {
        self.act(&Action::Click {
            element: element.to_string(),
        })
        .await
        .map_err(browser_err)
    }

    async fn type_text(&self, element: &str, text: &str) -> Result<()> {
        self.act(&Action::Type {
            element: element.to_string(),
            text: text.to_string(),
        })
        .await
        .map_err(browser_err)
    }

    async fn scroll(&self, options: ScrollOptions) -> Result<()> {
        let direction = match options.direction {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        };
        self.act(&Action::Scroll {
            direction: direction.to_string(),
            amount: options.amount,
        })
        .await
        .map_err(browser_err)
    }

    async fn wait(&self, until: WaitFor) -> Result<()> {
        let action = match until {
            WaitFor::Time(ms) => Action::Wait {
                time_ms: Some(ms),
                text: None,
            },
            WaitFor::Text(text) => Action::Wait {
                time_ms: None,
                text: Some(text),
            },
        };
        self.act(&action).await.map_err(browser_err)
    }

    async fn screenshot(&self) -> Result<String> {
        BrowserClient::screenshot(self).await.map_err(browser_err)
    }
}
