//! Sending one outreach DM with a human confirming before the send click.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use salonscout_common::{DmSendingState, DmStatus, ScoutError};

use crate::crawler::profile_url;
use crate::observer::{DmObserver, NoopObserver};
use crate::refs::{find_ref, MESSAGE_BUTTON_LABELS, MESSAGE_INPUT_LABELS, SEND_BUTTON_LABELS};
use crate::traits::{Browser, Result, SnapshotOptions, WaitFor};

const PAGE_SETTLE_MS: u64 = 2_000;
const DIALOG_OPEN_MS: u64 = 2_000;
const AFTER_SEND_MS: u64 = 1_000;

/// The human's answer after seeing the typed draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendDecision {
    Confirm,
    Cancel,
    /// Replace the typed text and ask again.
    Edit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmOutcome {
    Sent,
    Cancelled,
}

/// Decides whether a typed message goes out.
///
/// `screenshot` is the base64 PNG of the open conversation with the draft
/// typed in. Nothing is clicked until this returns.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, username: &str, draft: &str, screenshot: &str) -> SendDecision;
}

pub struct DmSender {
    browser: Arc<dyn Browser>,
    observer: Arc<dyn DmObserver>,
}

impl DmSender {
    pub fn new(browser: Arc<dyn Browser>) -> Self {
        Self {
            browser,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DmObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Open a conversation with `username`, type `draft`, and send it if the
    /// gate confirms. A missing control aborts with `RefNotFound`; the
    /// observer sees an `Error` state either way.
    pub async fn send(
        &self,
        username: &str,
        draft: &str,
        gate: &dyn ConfirmationGate,
    ) -> Result<DmOutcome> {
        let mut state = DmSendingState {
            status: DmStatus::Idle,
            username: username.to_string(),
            message: draft.to_string(),
            error: None,
        };

        match self.run_steps(&mut state, gate).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(username, error = %e, "DM not sent");
                let failed = DmSendingState {
                    status: DmStatus::Error,
                    error: Some(e.to_string()),
                    ..state.clone()
                };
                self.publish(&mut state, failed);
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        state: &mut DmSendingState,
        gate: &dyn ConfirmationGate,
    ) -> Result<DmOutcome> {
        let username = state.username.clone();

        self.set_status(state, DmStatus::Navigating);
        self.browser.navigate(&profile_url(&username)).await?;
        self.browser.wait(WaitFor::Time(PAGE_SETTLE_MS)).await?;

        self.set_status(state, DmStatus::OpeningDialog);
        let profile = self.browser.snapshot(SnapshotOptions::interactive()).await?;
        let button = find_ref(&profile, MESSAGE_BUTTON_LABELS).ok_or_else(|| {
            ScoutError::ref_not_found(
                "Message button",
                "account may be private or unsupported language",
            )
        })?;
        self.browser.click(&button).await?;
        self.browser.wait(WaitFor::Time(DIALOG_OPEN_MS)).await?;

        let dialog = self.browser.snapshot(SnapshotOptions::interactive()).await?;
        let input = find_ref(&dialog, MESSAGE_INPUT_LABELS).ok_or_else(|| {
            ScoutError::ref_not_found("Message input", "conversation did not open")
        })?;

        let mut text = state.message.clone();
        loop {
            self.set_status(state, DmStatus::Typing);
            self.browser.type_text(&input, &text).await?;

            self.set_status(state, DmStatus::AwaitingConfirmation);
            let screenshot = self.browser.screenshot().await?;
            match gate.confirm(&username, &text, &screenshot).await {
                SendDecision::Confirm => break,
                SendDecision::Cancel => {
                    info!(username = %username, "DM cancelled");
                    self.set_status(state, DmStatus::Cancelled);
                    return Ok(DmOutcome::Cancelled);
                }
                SendDecision::Edit(edited) => {
                    text = edited;
                    let next = DmSendingState {
                        message: text.clone(),
                        ..state.clone()
                    };
                    self.publish(state, next);
                }
            }
        }

        self.set_status(state, DmStatus::Sending);
        let typed = self.browser.snapshot(SnapshotOptions::interactive()).await?;
        let send = find_ref(&typed, SEND_BUTTON_LABELS)
            .ok_or_else(|| ScoutError::ref_not_found("Send button", "message box is empty or closed"))?;
        self.browser.click(&send).await?;
        self.browser.wait(WaitFor::Time(AFTER_SEND_MS)).await?;

        info!(username = %username, chars = text.chars().count(), "DM sent");
        self.set_status(state, DmStatus::Sent);
        Ok(DmOutcome::Sent)
    }

    fn set_status(&self, state: &mut DmSendingState, status: DmStatus) {
        let next = DmSendingState {
            status,
            ..state.clone()
        };
        self.publish(state, next);
    }

    fn publish(&self, state: &mut DmSendingState, next: DmSendingState) {
        *state = next;
        self.observer.on_dm_state(state);
    }
}
