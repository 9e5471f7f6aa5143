pub mod config;
pub mod error;
pub mod types;

pub use config::{parse_hashtags, BrowserConfig, Config, CrawlerConfig, LlmConfig, LlmProvider};
pub use error::ScoutError;
pub use types::*;
