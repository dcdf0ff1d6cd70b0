//! Tests for the watcher cycle — dedup, streak reporting, and recovery.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use hwwatch::practicum::{ApiError, HomeworkApi, PollResponse};
use hwwatch::status::NO_ACTIVE_HOMEWORK;
use hwwatch::telegram::{Notifier, NotifyError};
use hwwatch::watcher::{LoopState, Watcher};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Replays a scripted sequence of poll results and records every
/// `from_date` it was asked for.
struct ScriptedApi {
    script: Mutex<VecDeque<Result<PollResponse, ApiError>>>,
    observed_from_dates: Mutex<Vec<i64>>,
}

impl ScriptedApi {
    fn new(script: Vec<Result<PollResponse, ApiError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            observed_from_dates: Mutex::new(Vec::new()),
        })
    }

    fn observed(&self) -> Vec<i64> {
        self.observed_from_dates.lock().expect("lock").clone()
    }
}

#[async_trait]
impl HomeworkApi for ScriptedApi {
    async fn fetch_updates(&self, from_date: i64) -> Result<PollResponse, ApiError> {
        self.observed_from_dates.lock().expect("lock").push(from_date);
        self.script
            .lock()
            .expect("lock")
            .pop_front()
            .expect("test script exhausted")
    }
}

/// Records delivered messages; can be told to fail the next N sends.
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    failures_remaining: AtomicUsize,
}

impl RecordingNotifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(0),
        })
    }

    fn failing_first(count: usize) -> Arc<Self> {
        let notifier = Self::new();
        notifier.failures_remaining.store(count, Ordering::SeqCst);
        notifier
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining
                .store(remaining.saturating_sub(1), Ordering::SeqCst);
            return Err(NotifyError::Api("scripted failure".to_owned()));
        }
        self.sent.lock().expect("lock").push(text.to_owned());
        Ok(())
    }
}

fn page(homeworks: serde_json::Value, current_date: i64) -> PollResponse {
    serde_json::from_value(serde_json::json!({
        "homeworks": homeworks,
        "current_date": current_date,
    }))
    .expect("fixture should deserialize")
}

fn approved_page(name: &str, current_date: i64) -> PollResponse {
    page(
        serde_json::json!([{"homework_name": name, "status": "approved"}]),
        current_date,
    )
}

fn unavailable() -> Result<PollResponse, ApiError> {
    Err(ApiError::Status {
        code: reqwest::StatusCode::SERVICE_UNAVAILABLE,
    })
}

fn watcher(api: &Arc<ScriptedApi>, notifier: &Arc<RecordingNotifier>) -> Watcher {
    Watcher::new(
        Arc::clone(api) as Arc<dyn HomeworkApi>,
        Arc::clone(notifier) as Arc<dyn Notifier>,
        Duration::from_secs(600),
    )
}

// ---------------------------------------------------------------------------
// Success path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_change_is_delivered_and_window_advances() {
    let api = ScriptedApi::new(vec![Ok(approved_page("hw1", 1000))]);
    let notifier = RecordingNotifier::new();
    let mut state = LoopState::starting_at(0);

    watcher(&api, &notifier).run_cycle(&mut state).await;

    assert_eq!(
        notifier.sent(),
        vec![
            "Изменился статус проверки работы \"hw1\". Работа проверена: ревьюеру всё понравилось. Ура!"
                .to_owned()
        ]
    );
    // The next poll starts where the server said this one ended.
    assert_eq!(state.from_date, 1000);
}

#[tokio::test]
async fn identical_status_is_notified_exactly_once() {
    let api = ScriptedApi::new(vec![
        Ok(approved_page("hw1", 1000)),
        Ok(approved_page("hw1", 2000)),
    ]);
    let notifier = RecordingNotifier::new();
    let mut state = LoopState::starting_at(0);
    let watcher = watcher(&api, &notifier);

    watcher.run_cycle(&mut state).await;
    watcher.run_cycle(&mut state).await;

    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(api.observed(), vec![0, 1000]);
    assert_eq!(state.from_date, 2000);
}

#[tokio::test]
async fn empty_feed_notifies_no_active_homework_once() {
    let api = ScriptedApi::new(vec![
        Ok(page(serde_json::json!([]), 1100)),
        Ok(page(serde_json::json!([]), 1200)),
    ]);
    let notifier = RecordingNotifier::new();
    let mut state = LoopState::starting_at(0);
    let watcher = watcher(&api, &notifier);

    watcher.run_cycle(&mut state).await;
    watcher.run_cycle(&mut state).await;

    // First empty cycle announces the idle state; the repeat is deduped.
    assert_eq!(notifier.sent(), vec![NO_ACTIVE_HOMEWORK.to_owned()]);
    assert_eq!(state.from_date, 1200);
}

#[tokio::test]
async fn status_transitions_each_get_a_notification() {
    let reviewing = page(
        serde_json::json!([{"homework_name": "hw1", "status": "reviewing"}]),
        1000,
    );
    let api = ScriptedApi::new(vec![Ok(reviewing), Ok(approved_page("hw1", 2000))]);
    let notifier = RecordingNotifier::new();
    let mut state = LoopState::starting_at(0);
    let watcher = watcher(&api, &notifier);

    watcher.run_cycle(&mut state).await;
    watcher.run_cycle(&mut state).await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("взята на проверку"));
    assert!(sent[1].contains("Ура!"));
}

// ---------------------------------------------------------------------------
// Error streaks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_error_is_reported_once_per_streak() {
    let api = ScriptedApi::new(vec![unavailable(), unavailable(), unavailable()]);
    let notifier = RecordingNotifier::new();
    let mut state = LoopState::starting_at(0);
    let watcher = watcher(&api, &notifier);

    watcher.run_cycle(&mut state).await;
    watcher.run_cycle(&mut state).await;
    watcher.run_cycle(&mut state).await;

    assert_eq!(
        notifier.sent(),
        vec!["No response from the review API".to_owned()]
    );
    // Errors never advance the poll window.
    assert_eq!(api.observed(), vec![0, 0, 0]);
}

#[tokio::test]
async fn recovery_resets_error_accounting() {
    let api = ScriptedApi::new(vec![
        unavailable(),
        Ok(approved_page("hw1", 1000)),
        unavailable(),
    ]);
    let notifier = RecordingNotifier::new();
    let mut state = LoopState::starting_at(0);
    let watcher = watcher(&api, &notifier);

    watcher.run_cycle(&mut state).await;
    watcher.run_cycle(&mut state).await;
    watcher.run_cycle(&mut state).await;

    let sent = notifier.sent();
    // Diagnostic, status line, then the same diagnostic again; the good
    // cycle in between cleared the streak flag.
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], "No response from the review API");
    assert_eq!(sent[2], "No response from the review API");
}

#[tokio::test]
async fn unrenderable_record_is_reported_without_placeholder() {
    let bad = page(
        serde_json::json!([{"homework_name": "hw1", "status": "resubmitted"}]),
        1000,
    );
    let api = ScriptedApi::new(vec![Ok(bad)]);
    let notifier = RecordingNotifier::new();
    let mut state = LoopState::starting_at(0);

    watcher(&api, &notifier).run_cycle(&mut state).await;

    assert_eq!(
        notifier.sent(),
        vec!["The latest homework entry cannot be rendered".to_owned()]
    );
    // The raw status never leaks into the chat as a fake verdict.
    assert!(notifier.sent().iter().all(|m| !m.contains("resubmitted")));
}

#[tokio::test]
async fn distinct_error_kinds_are_flagged_independently() {
    let api = ScriptedApi::new(vec![
        unavailable(),
        Ok(page(serde_json::json!(["not a record"]), 1000)),
        unavailable(),
    ]);
    let notifier = RecordingNotifier::new();
    let mut state = LoopState::starting_at(0);
    let watcher = watcher(&api, &notifier);

    watcher.run_cycle(&mut state).await;
    watcher.run_cycle(&mut state).await;
    watcher.run_cycle(&mut state).await;

    // Two kinds, two diagnostics; the second NoResponse stays suppressed
    // because no good cycle intervened.
    assert_eq!(
        notifier.sent(),
        vec![
            "No response from the review API".to_owned(),
            "The latest homework entry cannot be rendered".to_owned(),
        ]
    );
}

// ---------------------------------------------------------------------------
// Delivery failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn undelivered_change_is_retried_next_cycle() {
    let api = ScriptedApi::new(vec![
        Ok(approved_page("hw1", 1000)),
        Ok(approved_page("hw1", 2000)),
    ]);
    let notifier = RecordingNotifier::failing_first(1);
    let mut state = LoopState::starting_at(0);
    let watcher = watcher(&api, &notifier);

    watcher.run_cycle(&mut state).await;
    assert!(state.last_notified.is_none(), "failed send must not latch");

    watcher.run_cycle(&mut state).await;
    assert_eq!(notifier.sent().len(), 1);
    assert!(state.last_notified.is_some());
}

#[tokio::test]
async fn delivery_failure_never_stops_the_window_advancing() {
    let api = ScriptedApi::new(vec![Ok(approved_page("hw1", 1000))]);
    let notifier = RecordingNotifier::failing_first(1);
    let mut state = LoopState::starting_at(0);

    watcher(&api, &notifier).run_cycle(&mut state).await;

    assert_eq!(state.from_date, 1000);
}
