pub mod analyzer;
pub mod counts;
pub mod crawler;
pub mod dm;
pub mod observer;
pub mod refs;
pub mod snapshot;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use analyzer::{BusinessContext, ProfileAnalyzer};
pub use crawler::{CancelFlag, Crawler};
pub use dm::{ConfirmationGate, DmOutcome, DmSender, SendDecision};
pub use observer::{ChannelObserver, CrawlEvent, CrawlerObserver, DmObserver, LogObserver};
pub use traits::Browser;
