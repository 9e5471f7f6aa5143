//! DM send flow against MockBrowser with a scripted confirmation gate.

use std::sync::Arc;

use salonscout_common::{DmStatus, ScoutError};
use salonscout_crawler::crawler::profile_url;
use salonscout_crawler::testing::{
    dm_dialog, profile_page, MockBrowser, RecordingObserver, ScriptedGate,
};
use salonscout_crawler::{DmOutcome, DmSender, SendDecision};

const DRAFT: &str = "Hi Mei! Love your balayage work.";

fn salon_browser() -> MockBrowser {
    MockBrowser::new()
        .on_page(&profile_url("hair_by_mei"), profile_page("hair_by_mei", "4,200", "主理人"))
        .on_click("m1", dm_dialog())
}

fn sender(browser: &Arc<MockBrowser>, observer: &Arc<RecordingObserver>) -> DmSender {
    DmSender::new(browser.clone()).with_observer(observer.clone())
}

#[tokio::test]
async fn confirmed_message_is_typed_then_sent() {
    let browser = Arc::new(salon_browser());
    let observer = Arc::new(RecordingObserver::new());
    let gate = ScriptedGate::new(vec![SendDecision::Confirm]);

    let outcome = sender(&browser, &observer)
        .send("hair_by_mei", DRAFT, &gate)
        .await
        .unwrap();

    assert_eq!(outcome, DmOutcome::Sent);
    assert_eq!(browser.typed(), vec![DRAFT.to_string()]);
    assert_eq!(browser.clicks(), vec!["m1".to_string(), "s1".to_string()]);

    let seen = gate.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, DRAFT);
    assert!(!seen[0].1.is_empty());

    let statuses: Vec<DmStatus> = observer.dm_states().iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            DmStatus::Navigating,
            DmStatus::OpeningDialog,
            DmStatus::Typing,
            DmStatus::AwaitingConfirmation,
            DmStatus::Sending,
            DmStatus::Sent,
        ]
    );
}

#[tokio::test]
async fn cancelled_message_is_never_sent() {
    let browser = Arc::new(salon_browser());
    let observer = Arc::new(RecordingObserver::new());
    let gate = ScriptedGate::new(vec![SendDecision::Cancel]);

    let outcome = sender(&browser, &observer)
        .send("hair_by_mei", DRAFT, &gate)
        .await
        .unwrap();

    assert_eq!(outcome, DmOutcome::Cancelled);
    assert!(!browser.clicks().contains(&"s1".to_string()));
    let last = observer.dm_states().last().cloned().unwrap();
    assert_eq!(last.status, DmStatus::Cancelled);
}

#[tokio::test]
async fn edited_message_is_retyped_before_sending() {
    let browser = Arc::new(salon_browser());
    let observer = Arc::new(RecordingObserver::new());
    let edited = "嗨 Mei！想跟你聊聊預約系統。";
    let gate = ScriptedGate::new(vec![
        SendDecision::Edit(edited.to_string()),
        SendDecision::Confirm,
    ]);

    let outcome = sender(&browser, &observer)
        .send("hair_by_mei", DRAFT, &gate)
        .await
        .unwrap();

    assert_eq!(outcome, DmOutcome::Sent);
    assert_eq!(browser.typed(), vec![DRAFT.to_string(), edited.to_string()]);
    assert_eq!(gate.seen()[1].0, edited);
    let last = observer.dm_states().last().cloned().unwrap();
    assert_eq!(last.status, DmStatus::Sent);
    assert_eq!(last.message, edited);
}

#[tokio::test]
async fn missing_message_button_reports_private_account() {
    let browser = Arc::new(
        MockBrowser::new().on_page(&profile_url("private_salon"), "- heading \"private_salon\""),
    );
    let observer = Arc::new(RecordingObserver::new());
    let gate = ScriptedGate::new(vec![SendDecision::Confirm]);

    let err = sender(&browser, &observer)
        .send("private_salon", DRAFT, &gate)
        .await
        .unwrap_err();

    assert!(matches!(err, ScoutError::RefNotFound { .. }));
    assert!(err.to_string().contains("private"));
    assert!(gate.seen().is_empty());
    assert!(browser.typed().is_empty());

    let last = observer.dm_states().last().cloned().unwrap();
    assert_eq!(last.status, DmStatus::Error);
    assert!(last.error.unwrap().contains("Message button"));
}
