use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;

use services::{
    AppServices, CalendarReminder, ClassifierError, ClassifierInput, Clock, PROGRESS_KEY,
    ProgressService, ProgressSnapshot, ReviewStatus, WordSetClassifier,
};
use speedread_core::model::round::GRID_SIZE;
use speedread_core::time::fixed_now;
use speedread_core::{AllProgress, Level, Stage, WordSets};
use storage::repository::{KeyValueStore, Storage};

/// Returns fixed word sets for any non-empty input.
struct StubClassifier;

#[async_trait]
impl WordSetClassifier for StubClassifier {
    async fn classify(&self, input: &ClassifierInput) -> Result<WordSets, ClassifierError> {
        if input.is_empty() {
            return Err(ClassifierError::EmptyInput);
        }
        Ok(WordSets::new(["學校", "老師"], ["圖書館"], ["興高采烈"])?)
    }
}

#[tokio::test]
async fn classify_play_and_schedule_reminder() {
    let storage = Storage::in_memory();
    let services =
        AppServices::with_classifier(&storage, Clock::fixed(fixed_now()), Arc::new(StubClassifier));

    let sets = services
        .classifier()
        .classify(&ClassifierInput::text("我今天去學校"))
        .await
        .unwrap();

    let rounds = services.rounds();
    let mut rng = StdRng::seed_from_u64(42);
    let mut round = rounds.start_round_with_rng(Level::A, &sets, &mut rng);
    round.start(fixed_now() - Duration::seconds(12)).unwrap();
    for i in 0..GRID_SIZE {
        round.defuse(i, fixed_now()).unwrap();
    }
    let outcome = rounds.finish(&round).await.unwrap();
    assert_eq!(outcome.stage, Stage::new(1));
    assert_eq!(outcome.elapsed_display(), "12.0");

    let progress = services.progress().load().await;
    let snapshot = ProgressSnapshot::build(progress.get(Level::A), fixed_now());
    assert_eq!(snapshot.status, ReviewStatus::Upcoming { hours: 1, minutes: 0 });

    let reminder = CalendarReminder::new(Level::A, snapshot.stage, fixed_now());
    assert_eq!(reminder.starts_at, fixed_now() + Duration::hours(1));
    assert_eq!(reminder.file_name(), "review_reminder_A_1小時.ics");
}

#[tokio::test]
async fn classifier_failure_records_nothing() {
    let storage = Storage::in_memory();
    let services =
        AppServices::with_classifier(&storage, Clock::fixed(fixed_now()), Arc::new(StubClassifier));

    let err = services
        .classifier()
        .classify(&ClassifierInput::default())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "請輸入文字或上載圖片。");
    assert_eq!(storage.kv.get(PROGRESS_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_progress_survives_reconnect() {
    let url = "sqlite:file:memdb_progress_flow?mode=memory&cache=shared";
    let storage = Storage::sqlite(url).await.expect("storage");
    let mut clock = Clock::fixed(fixed_now());

    let svc = ProgressService::new(clock, Arc::clone(&storage.kv));
    svc.record_session_now(Level::B).await.unwrap();
    clock.advance(Duration::minutes(10));
    let svc = ProgressService::new(clock, Arc::clone(&storage.kv));
    let expected = svc.record_session_now(Level::B).await.unwrap();
    assert_eq!(expected.get(Level::B).stage().value(), 2);

    let reopened = Storage::sqlite(url).await.expect("reopen");
    let reloaded = ProgressService::new(clock, Arc::clone(&reopened.kv)).load().await;
    assert_eq!(reloaded, expected);
    assert_eq!(reloaded.get(Level::B).history().len(), 2);

    svc.reset().await.unwrap();
    assert_eq!(svc.load().await, AllProgress::default());
}

#[tokio::test]
async fn persisted_blob_uses_flat_json_layout() {
    let storage = Storage::in_memory();
    let svc = ProgressService::new(Clock::fixed(fixed_now()), Arc::clone(&storage.kv));
    svc.record_session_now(Level::C).await.unwrap();

    let raw = storage.kv.get(PROGRESS_KEY).await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["C"]["stage"], 1);
    assert_eq!(value["C"]["lastPlayed"], fixed_now().timestamp_millis());
    assert_eq!(value["A"]["history"], serde_json::json!([]));
}
