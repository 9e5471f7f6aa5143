use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::{ChatModel, Claude, OpenAi};
use browser_client::BrowserClient;
use salonscout_common::{parse_hashtags, BrowserConfig, Config, LlmConfig, LlmProvider};
use salonscout_crawler::observer::ObserverSet;
use salonscout_crawler::snapshot::parse_profile;
use salonscout_crawler::{
    BusinessContext, ChannelObserver, ConfirmationGate, CrawlEvent, Crawler, DmOutcome,
    DmSender, LogObserver, ProfileAnalyzer, SendDecision,
};

#[derive(Parser)]
#[command(name = "salonscout", about = "Find salon owners on Instagram and draft outreach")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl hashtags and print each lead as a JSON line
    Crawl {
        /// Hashtag to search, repeatable. Overrides SCOUT_HASHTAGS.
        #[arg(long = "hashtag")]
        hashtags: Vec<String>,
        #[arg(long)]
        max_leads: Option<u32>,
        #[arg(long)]
        max_profiles: Option<u32>,
        /// Print every crawl event, not just leads
        #[arg(long)]
        events: bool,
    },
    /// Type a DM to one account and send it after confirmation on stdin
    Send {
        #[arg(long)]
        username: String,
        #[arg(long)]
        draft: String,
        /// Save the pre-send screenshot here
        #[arg(long)]
        screenshot: Option<PathBuf>,
    },
    /// Parse a saved profile snapshot and print the extracted profile
    Parse {
        file: PathBuf,
        /// Defaults to the file name without extension
        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries JSON output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("salonscout=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Crawl {
            hashtags,
            max_leads,
            max_profiles,
            events,
        } => crawl(hashtags, max_leads, max_profiles, events).await,
        Command::Send {
            username,
            draft,
            screenshot,
        } => send(username, draft, screenshot).await,
        Command::Parse { file, username } => parse(file, username),
    }
}

async fn crawl(
    hashtags: Vec<String>,
    max_leads: Option<u32>,
    max_profiles: Option<u32>,
    all_events: bool,
) -> Result<()> {
    let config = Config::from_env()?;
    config.log_redacted();

    let mut crawler_config = config.crawler.clone();
    if !hashtags.is_empty() {
        crawler_config.hashtags = hashtags.iter().flat_map(|h| parse_hashtags(h)).collect();
    }
    if let Some(n) = max_leads {
        crawler_config.max_leads = n;
    }
    if let Some(n) = max_profiles {
        crawler_config.max_profiles = n;
    }
    if crawler_config.hashtags.is_empty() {
        bail!("No hashtags to crawl: pass --hashtag or set SCOUT_HASHTAGS");
    }

    let browser = Arc::new(BrowserClient::new(
        &config.browser.url,
        config.browser.token.as_deref(),
    )?);
    let analyzer = ProfileAnalyzer::new(
        chat_model(&config.llm),
        BusinessContext {
            name: crawler_config.business_name.clone(),
            description: crawler_config.business_description.clone(),
        },
    );

    let (channel, mut events) = ChannelObserver::new();
    let observers = ObserverSet::new()
        .with(Arc::new(LogObserver))
        .with(Arc::new(channel));
    let mut crawler =
        Crawler::new(browser, analyzer, crawler_config).with_observer(Arc::new(observers));

    let cancel = crawler.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current profile");
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let line = match &event {
                CrawlEvent::LeadDiscovered(lead) => serde_json::to_string(lead)?,
                _ if all_events => serde_json::to_string(&event)?,
                _ => continue,
            };
            println!("{line}");
        }
        anyhow::Ok(())
    });

    let result = crawler.run().await;
    // Dropping the crawler closes the event channel and ends the printer.
    drop(crawler);
    printer.await??;

    let leads = result?;
    info!(leads = leads.len(), "Crawl finished");
    Ok(())
}

fn chat_model(llm: &LlmConfig) -> Arc<dyn ChatModel> {
    match llm.provider {
        LlmProvider::Anthropic => {
            let mut model = Claude::new(&llm.api_key, &llm.model);
            if let Some(url) = &llm.base_url {
                model = model.with_base_url(url);
            }
            Arc::new(model)
        }
        LlmProvider::OpenAi => {
            let mut model = OpenAi::new(&llm.api_key, &llm.model);
            if let Some(url) = &llm.base_url {
                model = model.with_base_url(url);
            }
            Arc::new(model)
        }
    }
}

async fn send(username: String, draft: String, screenshot: Option<PathBuf>) -> Result<()> {
    let browser_config = BrowserConfig::from_env();
    let browser = Arc::new(BrowserClient::new(
        &browser_config.url,
        browser_config.token.as_deref(),
    )?);

    let sender = DmSender::new(browser).with_observer(Arc::new(LogObserver));
    let gate = StdinGate {
        screenshot_path: screenshot,
    };

    match sender.send(&username, &draft, &gate).await? {
        DmOutcome::Sent => println!("sent"),
        DmOutcome::Cancelled => println!("cancelled"),
    }
    Ok(())
}

fn parse(file: PathBuf, username: Option<String>) -> Result<()> {
    let snapshot = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let username = username.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let profile = parse_profile(&username, &snapshot);
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

/// Asks on the terminal before a DM goes out.
struct StdinGate {
    screenshot_path: Option<PathBuf>,
}

impl StdinGate {
    async fn save_screenshot(&self, data: &str) {
        let Some(path) = &self.screenshot_path else {
            return;
        };
        let bytes = match base64::engine::general_purpose::STANDARD.decode(data) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Screenshot is not valid base64");
                return;
            }
        };
        match tokio::fs::write(path, bytes).await {
            Ok(()) => eprintln!("Screenshot saved to {}", path.display()),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to save screenshot"),
        }
    }
}

async fn prompt(question: String) -> Option<String> {
    tokio::task::spawn_blocking(move || {
        eprint!("{question}");
        std::io::stderr().flush().ok()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).ok()?;
        Some(line.trim().to_string())
    })
    .await
    .ok()
    .flatten()
}

#[async_trait]
impl ConfirmationGate for StdinGate {
    async fn confirm(&self, username: &str, draft: &str, screenshot: &str) -> SendDecision {
        self.save_screenshot(screenshot).await;
        eprintln!("\nTo @{username}:\n{draft}\n");

        let Some(answer) = prompt("Send? [y]es / [n]o / [e]dit: ".to_string()).await else {
            return SendDecision::Cancel;
        };
        match answer.to_lowercase().as_str() {
            "y" | "yes" => SendDecision::Confirm,
            "e" | "edit" => match prompt("New message: ".to_string()).await {
                Some(text) if !text.is_empty() => SendDecision::Edit(text),
                _ => SendDecision::Cancel,
            },
            _ => SendDecision::Cancel,
        }
    }
}
